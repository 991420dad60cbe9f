use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::POST_CACHE_EVENTS;
use crate::models::Post;

/// Read-through cache for single posts
///
/// Entries are stored under a per-post generation. Invalidation bumps the
/// generation instead of deleting the entry, so a reader that loaded a post
/// before a write can only repopulate the generation that write retired.
#[derive(Clone)]
pub struct PostCache {
    redis: ConnectionManager,
    default_ttl: Duration,
}

/// Outcome of a cache read
#[derive(Debug)]
pub enum CacheLookup {
    Hit(Post),
    /// Store a freshly loaded post under this generation
    Miss { generation: u64 },
}

impl PostCache {
    pub fn new(redis: ConnectionManager, default_ttl_secs: u64) -> Self {
        Self {
            redis,
            default_ttl: Duration::from_secs(default_ttl_secs),
        }
    }

    /// Connect to `url` and wrap the connection in a manager that reconnects
    pub async fn connect(url: &str, default_ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager, default_ttl_secs))
    }

    fn generation_key(post_id: Uuid) -> String {
        format!("post:v1:{}:gen", post_id)
    }

    fn post_key(post_id: Uuid, generation: u64) -> String {
        format!("post:v1:{}:g{}", post_id, generation)
    }

    /// TTL plus up to 10% jitter so entries written together don't expire together
    fn ttl_with_jitter(ttl: Duration) -> Duration {
        let jitter = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter_secs = (ttl.as_secs_f64() * jitter).round() as u64;
        ttl + Duration::from_secs(jitter_secs)
    }

    /// Outlives every entry written under an older generation, so a reset
    /// counter never resurrects one
    fn generation_ttl(ttl: Duration) -> Duration {
        ttl * 2
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<CacheLookup> {
        let mut conn = self.redis.clone();
        let generation: u64 = conn
            .get::<_, Option<u64>>(Self::generation_key(post_id))
            .await
            .map_err(|e| {
                POST_CACHE_EVENTS.with_label_values(&["error"]).inc();
                AppError::from(e)
            })?
            .unwrap_or(0);
        let key = Self::post_key(post_id, generation);

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(data)) => {
                debug!(post_id = %post_id, generation, "post cache HIT");
                POST_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                serde_json::from_str::<Post>(&data)
                    .map(CacheLookup::Hit)
                    .map_err(|e| {
                        POST_CACHE_EVENTS.with_label_values(&["error"]).inc();
                        AppError::Cache(format!("Cache deserialization error: {}", e))
                    })
            }
            Ok(None) => {
                debug!(post_id = %post_id, generation, "post cache MISS");
                POST_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(CacheLookup::Miss { generation })
            }
            Err(e) => {
                warn!("Redis read error for post cache: {}", e);
                POST_CACHE_EVENTS.with_label_values(&["error"]).inc();
                Err(AppError::Cache(e.to_string()))
            }
        }
    }

    /// Store `post` under the generation returned by the `get_post` miss
    pub async fn cache_post(&self, post: &Post, generation: u64) -> Result<()> {
        let key = Self::post_key(post.id, generation);
        let data = serde_json::to_string(post)?;
        let ttl = Self::ttl_with_jitter(self.default_ttl);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, data, ttl.as_secs()).await?;

        debug!(post_id = %post.id, generation, ttl_secs = ttl.as_secs(), "post cache WRITE");
        Ok(())
    }

    /// Retire the current generation; its entry is never read again
    pub async fn invalidate_post(&self, post_id: Uuid) -> Result<()> {
        let key = Self::generation_key(post_id);
        let ttl = Self::generation_ttl(self.default_ttl);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(&key, 1u64)
            .ignore()
            .expire(&key, ttl.as_secs() as i64)
            .ignore();
        pipe.query_async::<_, ()>(&mut self.redis.clone()).await?;

        POST_CACHE_EVENTS.with_label_values(&["invalidate"]).inc();
        debug!(post_id = %post_id, "post cache INVALIDATE");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::Cache(format!("unexpected PING response: {}", pong)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let id = Uuid::parse_str("6f1c2b9e-1d3a-4c5e-9f7a-0b1c2d3e4f50").unwrap();
        assert_eq!(
            PostCache::post_key(id, 3),
            "post:v1:6f1c2b9e-1d3a-4c5e-9f7a-0b1c2d3e4f50:g3"
        );
        assert_eq!(
            PostCache::generation_key(id),
            "post:v1:6f1c2b9e-1d3a-4c5e-9f7a-0b1c2d3e4f50:gen"
        );
    }

    #[test]
    fn test_generations_use_distinct_keys() {
        let id = Uuid::new_v4();
        assert_ne!(PostCache::post_key(id, 0), PostCache::post_key(id, 1));
        assert_ne!(PostCache::post_key(id, 0), PostCache::generation_key(id));
    }

    #[test]
    fn test_generation_outlives_entries() {
        let ttl = Duration::from_secs(300);
        let longest_entry = Duration::from_secs(327);
        assert!(PostCache::generation_ttl(ttl) > longest_entry);
    }

    #[test]
    fn test_ttl_jitter_bounds() {
        let ttl = Duration::from_secs(300);
        for _ in 0..100 {
            let jittered = PostCache::ttl_with_jitter(ttl);
            assert!(jittered >= ttl);
            assert!(jittered <= Duration::from_secs(327));
        }
    }
}
