/// Shared application state handed to every handler through `web::Data`
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::PostCache;
use crate::db::{
    FollowRepository, MemoryStore, NotificationRepository, PgFollowRepository,
    PgNotificationRepository, PgPostRepository, PgUserRepository, PostRepository, UserRepository,
};
use crate::services::{FollowService, MediaStore, NotificationService, PostService, UserService};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub cache: Option<Arc<PostCache>>,
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn postgres(pool: PgPool, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            follows: Arc::new(PgFollowRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
            cache: None,
            media: Arc::new(MediaStore::new(upload_dir)),
        }
    }

    /// Every repository backed by one shared `MemoryStore`
    pub fn in_memory(upload_dir: impl Into<PathBuf>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            follows: store.clone(),
            notifications: store,
            cache: None,
            media: Arc::new(MediaStore::new(upload_dir)),
        }
    }

    pub fn with_cache(mut self, cache: PostCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(self.notifications.clone())
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            self.posts.clone(),
            self.follows.clone(),
            self.notification_service(),
            self.media.clone(),
        )
        .with_cache(self.cache.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.users.clone(), self.follows.clone())
    }

    pub fn follow_service(&self) -> FollowService {
        FollowService::new(
            self.users.clone(),
            self.follows.clone(),
            self.notification_service(),
        )
    }
}
