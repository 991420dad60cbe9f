/// Data models for post-service
///
/// - `user`: accounts and roles
/// - `post`: posts with their likes, saves and comments
/// - `follow`: follow edges between users
/// - `notification`: like/comment/follow notifications
/// - `pagination`: offset pagination parameters and pages
pub mod follow;
pub mod notification;
pub mod pagination;
pub mod post;
pub mod user;

pub use follow::{Follow, FollowToggle};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use pagination::{Page, Pagination, PaginationParams};
pub use post::{Comment, ImageAppend, NewPost, Post, PostFilter, PostUpdate, ToggleOutcome};
pub use user::{NewUser, Role, User, UserProfile};
