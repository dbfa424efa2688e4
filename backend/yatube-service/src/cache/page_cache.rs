use super::{CacheResult, PageCache};
use crate::metrics::PAGE_CACHE_EVENTS;
use moka::future::Cache;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{debug, warn};

/// Redis-backed page cache
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl: Duration::from_secs(ttl_secs.max(1)),
        }
    }

    pub async fn connect(redis_url: &str, ttl_secs: u64) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager, ttl_secs))
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(body)) => {
                debug!(key = %key, "Page cache HIT");
                PAGE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                Ok(Some(body))
            }
            Ok(None) => {
                debug!(key = %key, "Page cache MISS");
                PAGE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, "Redis read error for page cache: {}", e);
                PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                Err(e.into())
            }
        }
    }

    async fn set(&self, key: &str, body: &str) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, body, self.ttl.as_secs())
            .await
            .map_err(|e| {
                warn!(key = %key, "Failed to write page cache: {}", e);
                PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                e
            })?;
        debug!(key = %key, ttl = ?self.ttl, "Page cache WRITE");
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(super::CacheError::InvalidData(format!(
                "unexpected PING response: {}",
                pong
            )))
        }
    }
}

/// In-process page cache; entries expire `ttl` after insertion
#[derive(Clone)]
pub struct MemoryPageCache {
    cache: Cache<String, String>,
}

impl MemoryPageCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self::new(Duration::from_secs(ttl_secs))
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let hit = self.cache.get(key).await;
        let event = if hit.is_some() { "hit" } else { "miss" };
        PAGE_CACHE_EVENTS.with_label_values(&[event]).inc();
        Ok(hit)
    }

    async fn set(&self, key: &str, body: &str) -> CacheResult<()> {
        self.cache.insert(key.to_string(), body.to_string()).await;
        Ok(())
    }

}
