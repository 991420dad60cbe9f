/// Follow service - toggles follow edges and lists them
use std::sync::Arc;
use uuid::Uuid;

use super::notifications::NotificationService;
use crate::db::{FollowRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{FollowToggle, NotificationKind, Page, Pagination};

pub struct FollowService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    notifications: NotificationService,
}

impl FollowService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            users,
            follows,
            notifications,
        }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        match self.users.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    /// Follow `target_id` if not yet followed, unfollow otherwise
    pub async fn toggle_follow(&self, follower_id: Uuid, target_id: Uuid) -> Result<FollowToggle> {
        if follower_id == target_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }
        self.ensure_user(target_id).await?;

        let following = self.follows.toggle_follow(follower_id, target_id).await?;
        tracing::info!(%follower_id, %target_id, following, "follow toggled");

        if following {
            self.notifications
                .notify(target_id, follower_id, NotificationKind::Follow, None)
                .await;
        }

        Ok(FollowToggle {
            user_id: target_id,
            following,
        })
    }

    pub async fn following(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Uuid>> {
        self.ensure_user(user_id).await?;
        let (items, total) = self
            .follows
            .list_following(user_id, pagination.limit, pagination.offset())
            .await?;
        Ok(Page::new(items, pagination, total))
    }

    pub async fn followers(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Uuid>> {
        self.ensure_user(user_id).await?;
        let (items, total) = self
            .follows
            .list_followers(user_id, pagination.limit, pagination.offset())
            .await?;
        Ok(Page::new(items, pagination, total))
    }
}
