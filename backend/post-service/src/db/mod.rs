/// Storage layer
///
/// Handlers and services only see the repository traits below. Two
/// implementations exist:
/// - PostgreSQL (`pg_*` modules) over a shared `PgPool`
/// - `MemoryStore`, a single-process store used by the test suite and by
///   `STORAGE_BACKEND=memory`
pub mod memory;
pub mod pg_follows;
pub mod pg_notifications;
pub mod pg_posts;
pub mod pg_users;

pub use memory::MemoryStore;
pub use pg_follows::PgFollowRepository;
pub use pg_notifications::PgNotificationRepository;
pub use pg_posts::PgPostRepository;
pub use pg_users::PgUserRepository;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, ImageAppend, NewNotification, NewPost, NewUser, Notification, Post, PostFilter,
    PostUpdate, ToggleOutcome, User,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, new_post: NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Returns `None` when the post does not exist
    async fn update_post(&self, post_id: Uuid, update: PostUpdate) -> Result<Option<Post>>;

    /// Appends `images` only if the post then carries at most `max_images`;
    /// the check and the write are one store operation
    async fn append_images(
        &self,
        post_id: Uuid,
        images: &[String],
        max_images: usize,
    ) -> Result<ImageAppend>;

    /// Removes the post with its likes, saves and comments
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;

    /// Newest first. Returns the page and the total number of matches.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)>;

    /// Adds or removes `user_id` from the post's likes in one store operation
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>>;

    async fn toggle_save(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>>;

    /// Returns all comments of the post after the insert, oldest first
    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Vec<Comment>>>;

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Returns the remaining comments of the post, oldest first
    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Vec<Comment>>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Returns true when the call created the follow, false when it removed it
    async fn toggle_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Every user `user_id` follows, unpaginated (feed fan-in)
    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Users `user_id` follows, most recent first
    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)>;

    /// Users following `user_id`, most recent first
    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)>;

    /// (followers, following)
    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification>;

    /// Newest first
    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn unread_count(&self, recipient_id: Uuid) -> Result<i64>;

    /// Only the recipient can mark a notification read
    async fn mark_read(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Notification>>;

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64>;

    async fn delete_notification(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<bool>;
}
