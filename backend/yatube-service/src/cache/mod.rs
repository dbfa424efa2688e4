/// Rendered-page caching
///
/// The index view is cached as a whole HTML document for a short window.
/// Two backends share the `PageCache` trait:
/// - `RedisPageCache`: shared across workers and instances
/// - `MemoryPageCache`: moka-backed, per process (tests, single-node dev)
pub mod page_cache;

pub use page_cache::{MemoryPageCache, RedisPageCache};

use thiserror::Error;

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Default lifetime of a cached page
pub const DEFAULT_PAGE_TTL_SECS: u64 = 20;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid cache data: {0}")]
    InvalidData(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Full-page cache entry for a request path + query string
    /// Format: v1:page:{path}
    pub fn page(path_and_query: &str) -> String {
        format!("v{}:page:{}", CACHE_VERSION, path_and_query)
    }
}

#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, body: &str) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }
}
