use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::PostRepository;
use crate::error::Result;
use crate::models::{Comment, ImageAppend, NewPost, Post, PostFilter, PostUpdate, ToggleOutcome};

const POST_COLUMNS: &str = "p.id, p.user_id, p.title, p.text, p.images, p.created_at, p.updated_at";

/// Repository for posts and their likes, saves and comments
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    title: Option<String>,
    text: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Engagement table backing a toggle
#[derive(Debug, Clone, Copy)]
enum Membership {
    Likes,
    Saves,
}

impl Membership {
    fn table(self) -> &'static str {
        match self {
            Membership::Likes => "post_likes",
            Membership::Saves => "post_saves",
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    match filter {
        PostFilter::All => {
            qb.push(" TRUE");
        }
        PostFilter::Author(user_id) => {
            qb.push(" p.user_id = ").push_bind(*user_id);
        }
        PostFilter::Authors(user_ids) => {
            qb.push(" p.user_id = ANY(")
                .push_bind(user_ids.clone())
                .push(")");
        }
        PostFilter::SavedBy(user_id) => {
            qb.push(" EXISTS (SELECT 1 FROM post_saves s WHERE s.post_id = p.id AND s.user_id = ")
                .push_bind(*user_id)
                .push(")");
        }
        PostFilter::LikedBy(user_id) => {
            qb.push(" EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ")
                .push_bind(*user_id)
                .push(")");
        }
    }
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach likes, saves and comments to a batch of post rows
    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let likes: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT post_id, user_id FROM post_likes
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let saves: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT post_id, user_id FROM post_saves
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, text, created_at
            FROM comments
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, user_id) in likes {
            likes_by_post.entry(post_id).or_default().push(user_id);
        }
        let mut saves_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, user_id) in saves {
            saves_by_post.entry(post_id).or_default().push(user_id);
        }
        let mut comments_by_post: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for comment in comments {
            comments_by_post
                .entry(comment.post_id)
                .or_default()
                .push(comment);
        }

        Ok(rows
            .into_iter()
            .map(|row| Post {
                likes: likes_by_post.remove(&row.id).unwrap_or_default(),
                saves: saves_by_post.remove(&row.id).unwrap_or_default(),
                comments: comments_by_post.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user_id: row.user_id,
                title: row.title,
                text: row.text,
                images: row.images,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<PostRow>) -> Result<Option<Post>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, text, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Flip `user_id` in or out of an engagement table.
    ///
    /// The post row is locked for the duration of the transaction, so two
    /// concurrent toggles on the same post are applied one after the other.
    async fn toggle_membership(
        &self,
        membership: Membership,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ToggleOutcome>> {
        let table = membership.table();
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE post_id = $1 AND user_id = $2",
            table
        ))
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let active = removed == 0;
        if active {
            sqlx::query(&format!(
                "INSERT INTO {} (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                table
            ))
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let users: Vec<Uuid> = sqlx::query_scalar(&format!(
            "SELECT user_id FROM {} WHERE post_id = $1 ORDER BY created_at ASC",
            table
        ))
        .bind(post_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ToggleOutcome {
            post_id,
            active,
            users,
        }))
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create_post(&self, new_post: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (id, user_id, title, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, text, images, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_post.user_id)
        .bind(&new_post.title)
        .bind(&new_post.text)
        .fetch_one(&self.pool)
        .await?;

        Ok(Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            text: row.text,
            images: row.images,
            likes: Vec::new(),
            saves: Vec::new(),
            comments: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts p WHERE p.id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn update_post(&self, post_id: Uuid, update: PostUpdate) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET title = CASE WHEN $2 THEN $3 ELSE title END,
                text = COALESCE($4, text),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, title, text, images, created_at, updated_at
            "#,
        )
        .bind(post_id)
        .bind(update.title.is_some())
        .bind(update.title.as_ref().and_then(|t| t.as_deref()))
        .bind(&update.text)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn append_images(
        &self,
        post_id: Uuid,
        images: &[String],
        max_images: usize,
    ) -> Result<ImageAppend> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET images = images || $2::text[],
                updated_at = NOW()
            WHERE id = $1
              AND cardinality(images) + cardinality($2::text[]) <= $3
            RETURNING id, user_id, title, text, images, created_at, updated_at
            "#,
        )
        .bind(post_id)
        .bind(images)
        .bind(max_images as i32)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(post) = self.hydrate_one(row).await? {
            return Ok(ImageAppend::Appended(post));
        }

        // no row updated: either the post is gone or the limit held it back
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            ImageAppend::LimitExceeded
        } else {
            ImageAppend::PostNotFound
        })
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        // likes, saves and comments go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM posts p WHERE",
            POST_COLUMNS
        ));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<PostRow>().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((self.hydrate(rows).await?, total))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>> {
        self.toggle_membership(Membership::Likes, post_id, user_id)
            .await
    }

    async fn toggle_save(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>> {
        self.toggle_membership(Membership::Saves, post_id, user_id)
            .await
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Vec<Comment>>> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO comments (id, post_id, user_id, text)
            SELECT $1, p.id, $3, $4 FROM posts p WHERE p.id = $2
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(&text)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_none() {
            return Ok(None);
        }

        Ok(Some(self.post_comments(post_id).await?))
    }

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, text, created_at
            FROM comments
            WHERE id = $1 AND post_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Vec<Comment>> {
        sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2")
            .bind(comment_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        self.post_comments(post_id).await
    }
}
