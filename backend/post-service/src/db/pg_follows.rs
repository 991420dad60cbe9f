use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::FollowRepository;
use crate::error::Result;

/// Repository for the follow graph
#[derive(Clone)]
pub struct PgFollowRepository {
    pool: PgPool,
}

impl PgFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for PgFollowRepository {
    async fn toggle_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND following_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let following = if removed > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO follows (follower_id, following_id)
                VALUES ($1, $2)
                ON CONFLICT (follower_id, following_id) DO NOTHING
                "#,
            )
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await?;
            true
        };

        tx.commit().await?;
        Ok(following)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE follower_id = $1 AND following_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT following_id FROM follows
            WHERE follower_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT following_id FROM follows
            WHERE follower_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((ids, total))
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT follower_id FROM follows
            WHERE following_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((ids, total))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = $1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
