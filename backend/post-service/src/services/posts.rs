/// Post service - post CRUD, engagement toggles, comments and listings
use std::sync::Arc;
use uuid::Uuid;

use super::media::{ImageUpload, MediaStore, MAX_IMAGES_PER_POST};
use super::notifications::NotificationService;
use crate::cache::{CacheLookup, PostCache};
use crate::db::{FollowRepository, PostRepository};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::{check_comment_deletion, check_post_ownership, AuthUser};
use crate::models::{
    Comment, ImageAppend, NewPost, NotificationKind, Page, Pagination, Post, PostFilter,
    PostUpdate, ToggleOutcome,
};

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    follows: Arc<dyn FollowRepository>,
    notifications: NotificationService,
    media: Arc<MediaStore>,
    cache: Option<Arc<PostCache>>,
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

fn image_limit_exceeded() -> AppError {
    AppError::Validation(format!("A post can carry at most {} images", MAX_IMAGES_PER_POST))
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        follows: Arc<dyn FollowRepository>,
        notifications: NotificationService,
        media: Arc<MediaStore>,
    ) -> Self {
        Self {
            posts,
            follows,
            notifications,
            media,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<PostCache>>) -> Self {
        self.cache = cache;
        self
    }

    fn cache(&self) -> Option<&Arc<PostCache>> {
        self.cache.as_ref()
    }

    async fn invalidate(&self, post_id: Uuid) {
        if let Some(cache) = self.cache() {
            if let Err(err) = cache.invalidate_post(post_id).await {
                tracing::warn!(%post_id, "post cache invalidation failed: {}", err);
            }
        }
    }

    async fn load(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or_else(post_not_found)
    }

    async fn list(&self, filter: PostFilter, pagination: Pagination) -> Result<Page<Post>> {
        let (items, total) = self
            .posts
            .list_posts(&filter, pagination.limit, pagination.offset())
            .await?;
        Ok(Page::new(items, pagination, total))
    }

    /// All posts, newest first
    pub async fn list_posts(&self, pagination: Pagination) -> Result<Page<Post>> {
        self.list(PostFilter::All, pagination).await
    }

    pub async fn user_posts(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Post>> {
        self.list(PostFilter::Author(user_id), pagination).await
    }

    /// Posts by the users `user_id` follows plus their own
    pub async fn feed(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Post>> {
        let mut authors = self.follows.following_ids(user_id).await?;
        authors.push(user_id);
        self.list(PostFilter::Authors(authors), pagination).await
    }

    pub async fn saved_posts(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Post>> {
        self.list(PostFilter::SavedBy(user_id), pagination).await
    }

    pub async fn liked_posts(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Post>> {
        self.list(PostFilter::LikedBy(user_id), pagination).await
    }

    pub async fn create_post(
        &self,
        user_id: Uuid,
        title: Option<String>,
        text: String,
    ) -> Result<Post> {
        let post = self
            .posts
            .create_post(NewPost {
                user_id,
                title,
                text,
            })
            .await?;

        tracing::info!(post_id = %post.id, %user_id, "post created");
        Ok(post)
    }

    /// Get a post by ID, reading through the cache when one is configured
    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        let mut generation = None;
        if let Some(cache) = self.cache() {
            match cache.get_post(post_id).await {
                Ok(CacheLookup::Hit(cached)) => return Ok(cached),
                Ok(CacheLookup::Miss { generation: g }) => generation = Some(g),
                Err(err) => tracing::debug!(%post_id, "post cache read failed: {}", err),
            }
        }

        let post = self.load(post_id).await?;

        // refill only under the generation observed before the load
        if let (Some(cache), Some(generation)) = (self.cache(), generation) {
            if let Err(err) = cache.cache_post(&post, generation).await {
                tracing::debug!(%post_id, "post cache set failed: {}", err);
            }
        }

        Ok(post)
    }

    pub async fn update_post(
        &self,
        user: &AuthUser,
        post_id: Uuid,
        update: PostUpdate,
    ) -> Result<Post> {
        let post = self.load(post_id).await?;
        check_post_ownership(user, &post)?;

        let updated = self
            .posts
            .update_post(post_id, update)
            .await?
            .ok_or_else(post_not_found)?;
        self.invalidate(post_id).await;

        tracing::info!(%post_id, user_id = %user.id, "post updated");
        Ok(updated)
    }

    /// Remove the post, its engagement and its stored images
    pub async fn delete_post(&self, user: &AuthUser, post_id: Uuid) -> Result<()> {
        let post = self.load(post_id).await?;
        check_post_ownership(user, &post)?;

        if !self.posts.delete_post(post_id).await? {
            return Err(post_not_found());
        }
        self.invalidate(post_id).await;

        if let Err(err) = self.media.remove_post_media(post_id).await {
            tracing::warn!(%post_id, "failed to remove post media: {}", err);
        }

        tracing::info!(%post_id, user_id = %user.id, "post deleted");
        Ok(())
    }

    /// Store uploaded images and append their paths to the post
    ///
    /// The store re-checks the per-post limit when appending. Files written
    /// for an upload that is not appended are removed.
    pub async fn add_images(
        &self,
        user: &AuthUser,
        post_id: Uuid,
        uploads: Vec<ImageUpload>,
    ) -> Result<Post> {
        if uploads.is_empty() {
            return Err(AppError::Validation("No images provided".to_string()));
        }

        let post = self.load(post_id).await?;
        check_post_ownership(user, &post)?;

        if post.images.len() + uploads.len() > MAX_IMAGES_PER_POST {
            return Err(image_limit_exceeded());
        }
        for upload in &uploads {
            MediaStore::validate(upload)?;
        }

        let mut paths = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match self.media.save_image(post_id, upload).await {
                Ok(path) => paths.push(path),
                Err(err) => {
                    self.media.remove_images(post_id, &paths).await;
                    return Err(err);
                }
            }
        }

        let appended = self
            .posts
            .append_images(post_id, &paths, MAX_IMAGES_PER_POST)
            .await;
        let updated = match appended {
            Ok(ImageAppend::Appended(post)) => post,
            other => {
                self.media.remove_images(post_id, &paths).await;
                return Err(match other {
                    Ok(ImageAppend::LimitExceeded) => image_limit_exceeded(),
                    Err(err) => err,
                    _ => post_not_found(),
                });
            }
        };
        self.invalidate(post_id).await;

        tracing::info!(%post_id, count = paths.len(), "images attached");
        Ok(updated)
    }

    /// Flip the caller's like; the owner is notified when a like is added
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<ToggleOutcome> {
        let post = self.load(post_id).await?;
        let outcome = self
            .posts
            .toggle_like(post_id, user_id)
            .await?
            .ok_or_else(post_not_found)?;
        self.invalidate(post_id).await;
        metrics::record_toggle("like", outcome.active);

        if outcome.active {
            self.notifications
                .notify(post.user_id, user_id, NotificationKind::Like, Some(post_id))
                .await;
        }

        Ok(outcome)
    }

    pub async fn toggle_save(&self, user_id: Uuid, post_id: Uuid) -> Result<ToggleOutcome> {
        let outcome = self
            .posts
            .toggle_save(post_id, user_id)
            .await?
            .ok_or_else(post_not_found)?;
        self.invalidate(post_id).await;
        metrics::record_toggle("save", outcome.active);

        Ok(outcome)
    }

    /// Returns every comment on the post after the insert, oldest first
    pub async fn add_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        text: String,
    ) -> Result<Vec<Comment>> {
        let post = self.load(post_id).await?;
        let comments = self
            .posts
            .add_comment(post_id, user_id, text)
            .await?
            .ok_or_else(post_not_found)?;
        self.invalidate(post_id).await;

        self.notifications
            .notify(
                post.user_id,
                user_id,
                NotificationKind::Comment,
                Some(post_id),
            )
            .await;

        Ok(comments)
    }

    pub async fn delete_comment(
        &self,
        user: &AuthUser,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Vec<Comment>> {
        let post = self.load(post_id).await?;
        let comment = self
            .posts
            .find_comment(post_id, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        check_comment_deletion(user, &post, &comment)?;

        let comments = self.posts.delete_comment(post_id, comment_id).await?;
        self.invalidate(post_id).await;

        tracing::info!(%post_id, %comment_id, user_id = %user.id, "comment deleted");
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NotificationRepository};
    use crate::models::Role;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PostService,
        upload_dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let service = PostService::new(
            store.clone(),
            store.clone(),
            NotificationService::new(store.clone()),
            Arc::new(MediaStore::new(dir.path())),
        );
        Fixture {
            store,
            service,
            upload_dir: dir,
        }
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[tokio::test]
    async fn test_like_notifies_owner_once() {
        let f = fixture();
        let owner = caller(Role::User);
        let fan = caller(Role::User);
        let post = f
            .service
            .create_post(owner.id, None, "hello".to_string())
            .await
            .unwrap();

        let liked = f.service.toggle_like(fan.id, post.id).await.unwrap();
        assert!(liked.active);
        let unliked = f.service.toggle_like(fan.id, post.id).await.unwrap();
        assert!(!unliked.active);

        assert_eq!(f.store.unread_count(owner.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_own_like_is_not_notified() {
        let f = fixture();
        let owner = caller(Role::User);
        let post = f
            .service
            .create_post(owner.id, None, "hello".to_string())
            .await
            .unwrap();

        f.service.toggle_like(owner.id, post.id).await.unwrap();
        assert_eq!(f.store.unread_count(owner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_requires_owner_or_root() {
        let f = fixture();
        let owner = caller(Role::User);
        let post = f
            .service
            .create_post(owner.id, None, "hello".to_string())
            .await
            .unwrap();
        let update = PostUpdate {
            title: None,
            text: Some("edited".to_string()),
        };

        let err = f
            .service
            .update_post(&caller(Role::User), post.id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let updated = f
            .service
            .update_post(&caller(Role::Root), post.id, update)
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
    }

    #[tokio::test]
    async fn test_feed_includes_followed_and_own_posts() {
        let f = fixture();
        let me = caller(Role::User);
        let friend = caller(Role::User);
        let stranger = caller(Role::User);

        f.store.toggle_follow(me.id, friend.id).await.unwrap();
        for (author, text) in [(me.id, "mine"), (friend.id, "friend"), (stranger.id, "stranger")] {
            f.service
                .create_post(author, None, text.to_string())
                .await
                .unwrap();
        }

        let page = f.service.feed(me.id, Pagination::default()).await.unwrap();
        let texts: Vec<&str> = page.items.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["friend", "mine"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_image_limit_per_post() {
        let f = fixture();
        let owner = caller(Role::User);
        let post = f
            .service
            .create_post(owner.id, None, "gallery".to_string())
            .await
            .unwrap();
        let upload = ImageUpload {
            content_type: "image/png".to_string(),
            data: vec![1u8; 8],
        };

        let post = f
            .service
            .add_images(&owner, post.id, vec![upload.clone(); MAX_IMAGES_PER_POST])
            .await
            .unwrap();
        assert_eq!(post.images.len(), MAX_IMAGES_PER_POST);

        let err = f
            .service
            .add_images(&owner, post.id, vec![upload])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_respect_image_limit() {
        let f = fixture();
        let owner = caller(Role::User);
        let post = f
            .service
            .create_post(owner.id, None, "gallery".to_string())
            .await
            .unwrap();
        let upload = ImageUpload {
            content_type: "image/png".to_string(),
            data: vec![1u8; 8],
        };

        let (first, second) = tokio::join!(
            f.service.add_images(&owner, post.id, vec![upload.clone(); 6]),
            f.service.add_images(&owner, post.id, vec![upload.clone(); 6]),
        );
        assert_eq!(
            [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        let rejected = first.err().or(second.err()).unwrap();
        assert!(matches!(rejected, AppError::Validation(_)));

        let stored = f.service.get_post(post.id).await.unwrap();
        assert_eq!(stored.images.len(), 6);

        // the rejected upload leaves no files behind
        let files = std::fs::read_dir(f.upload_dir.path().join(post.id.to_string()))
            .unwrap()
            .count();
        assert_eq!(files, 6);
    }
}
