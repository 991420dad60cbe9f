use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::NotificationRepository;
use crate::error::{AppError, Result};
use crate::models::{NewNotification, Notification, NotificationKind};

/// Repository for stored notifications
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: String,
    post_id: Option<Uuid>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        let kind: NotificationKind = row.kind.parse().map_err(AppError::Internal)?;
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            sender_id: row.sender_id,
            kind,
            post_id: row.post_id,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, recipient_id, sender_id, kind, post_id, read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.recipient_id)
        .bind(new.sender_id)
        .bind(new.kind.as_str())
        .bind(new.post_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Notification>, i64)> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, sender_id, kind, post_id, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
                .bind(recipient_id)
                .fetch_one(&self.pool)
                .await?;

        let notifications = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((notifications, total))
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE recipient_id = $1 AND read = FALSE
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING id, recipient_id, sender_id, kind, post_id, read, created_at
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE recipient_id = $1 AND read = FALSE
            "#,
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE id = $1 AND recipient_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
