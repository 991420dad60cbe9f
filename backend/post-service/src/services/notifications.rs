/// Notification service - records like/comment/follow notifications and
/// serves them back to their recipient
use std::sync::Arc;
use uuid::Uuid;

use crate::db::NotificationRepository;
use crate::error::{AppError, Result};
use crate::metrics::NOTIFICATIONS_TOTAL;
use crate::models::{NewNotification, Notification, NotificationKind, Page, Pagination};

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Record a notification for `recipient_id`.
    ///
    /// Never fails: actions on one's own content are skipped and store
    /// errors are logged, so the action that triggered it always succeeds.
    pub async fn notify(
        &self,
        recipient_id: Uuid,
        sender_id: Uuid,
        kind: NotificationKind,
        post_id: Option<Uuid>,
    ) {
        if recipient_id == sender_id {
            NOTIFICATIONS_TOTAL
                .with_label_values(&[kind.as_str(), "skipped"])
                .inc();
            return;
        }

        let new = NewNotification {
            recipient_id,
            sender_id,
            kind,
            post_id,
        };

        match self.repo.create_notification(new).await {
            Ok(notification) => {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "created"])
                    .inc();
                tracing::debug!(
                    notification_id = %notification.id,
                    %recipient_id,
                    %kind,
                    "notification created"
                );
            }
            Err(err) => {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                tracing::warn!(
                    %recipient_id,
                    %sender_id,
                    %kind,
                    "failed to create notification: {}",
                    err
                );
            }
        }
    }

    /// A page of the caller's notifications (newest first) and their unread count
    pub async fn list(
        &self,
        recipient_id: Uuid,
        pagination: Pagination,
    ) -> Result<(Page<Notification>, i64)> {
        let (items, total) = self
            .repo
            .list_notifications(recipient_id, pagination.limit, pagination.offset())
            .await?;
        let unread = self.repo.unread_count(recipient_id).await?;

        Ok((Page::new(items, pagination, total), unread))
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Notification> {
        self.repo
            .mark_read(notification_id, recipient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        self.repo.mark_all_read(recipient_id).await
    }

    pub async fn delete(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<()> {
        if self
            .repo
            .delete_notification(notification_id, recipient_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_self_notification_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone());
        let user = Uuid::new_v4();

        service
            .notify(user, user, NotificationKind::Like, Some(Uuid::new_v4()))
            .await;

        assert_eq!(store.unread_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_reports_unread() {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store);
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        service.notify(alice, bob, NotificationKind::Follow, None).await;
        service
            .notify(alice, bob, NotificationKind::Like, Some(Uuid::new_v4()))
            .await;

        let (page, unread) = service.list(alice, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(unread, 2);
        assert_eq!(page.items[0].kind, NotificationKind::Like);

        service.mark_read(page.items[0].id, alice).await.unwrap();
        let (_, unread) = service.list(alice, Pagination::default()).await.unwrap();
        assert_eq!(unread, 1);

        assert!(matches!(
            service.delete(page.items[1].id, bob).await,
            Err(AppError::NotFound(_))
        ));
    }
}
