/// Business logic layer
///
/// Services hold `Arc`s to the repository traits and are cheap to build
/// per request from [`crate::state::AppState`].
pub mod follows;
pub mod media;
pub mod notifications;
pub mod posts;
pub mod users;

pub use follows::FollowService;
pub use media::{ImageUpload, MediaStore};
pub use notifications::NotificationService;
pub use posts::PostService;
pub use users::{AuthResponse, UserService};
