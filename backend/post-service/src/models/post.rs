use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post together with its engagement
///
/// `likes` and `saves` hold each user id at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub text: String,
    /// Public paths of uploaded images, in upload order
    pub images: Vec<String>,
    pub likes: Vec<Uuid>,
    pub saves: Vec<Uuid>,
    /// Oldest first
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment entity - a comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub text: String,
}

/// Partial update; `None` leaves the field untouched
///
/// `title: Some(None)` clears the title.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<Option<String>>,
    pub text: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.text.is_none()
    }
}

/// Result of appending images under the per-post limit
#[derive(Debug, Clone)]
pub enum ImageAppend {
    Appended(Post),
    /// The post would exceed the limit; nothing was appended
    LimitExceeded,
    PostNotFound,
}

/// Which posts a listing should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Author(Uuid),
    Authors(Vec<Uuid>),
    SavedBy(Uuid),
    LikedBy(Uuid),
}

/// Result of a like/save toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub post_id: Uuid,
    /// Whether the caller is in the set after the toggle
    pub active: bool,
    pub users: Vec<Uuid>,
}
