use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow edge: `follower_id` follows `following_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Response of a follow toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowToggle {
    pub user_id: Uuid,
    pub following: bool,
}
