//! Expiring cache of streaming sources keyed by watchlist item id
//!
//! Every backend follows the same rules: entries older than the TTL are
//! treated as absent and evicted the first time they are read, and empty
//! source lists are never stored so a later pass can retry the provider.

use chrono::Duration;
use std::fmt::Display;
use std::sync::Arc;

use crate::{
    config::{CacheBackend, Config},
    error::AppResult,
    models::{CacheEntry, StreamingSource},
};

pub mod file;
pub mod memory;
pub mod redis;

pub use self::file::FileCache;
pub use self::memory::MemoryCache;
pub use self::redis::{CacheWriterHandle, RedisCache};

/// How long fetched streaming sources stay valid
pub fn source_cache_ttl() -> Duration {
    Duration::hours(24)
}

/// Cache key for one watchlist item's streaming sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(pub i64);

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sources:{}", self.0)
    }
}

#[async_trait::async_trait]
pub trait SourceCache: Send + Sync {
    /// Returns a valid entry, evicting it first if it has expired
    async fn get(&self, key: &CacheKey) -> AppResult<Option<CacheEntry>>;

    /// Stores an entry as-is, including its timestamp
    async fn put_entry(&self, key: &CacheKey, entry: CacheEntry) -> AppResult<()>;

    /// Removes an entry if present
    async fn evict(&self, key: &CacheKey) -> AppResult<()>;

    /// Stores freshly fetched sources; an empty list is a no-op
    async fn set(&self, key: &CacheKey, sources: &[StreamingSource]) -> AppResult<()> {
        if sources.is_empty() {
            return Ok(());
        }
        self.put_entry(key, CacheEntry::new(sources.to_vec())).await
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Builds the cache backend selected in configuration
///
/// The returned handle is only present for Redis and must be shut down to
/// flush pending writes.
pub async fn build_cache(
    config: &Config,
) -> anyhow::Result<(Arc<dyn SourceCache>, Option<CacheWriterHandle>)> {
    let ttl = source_cache_ttl();

    match config.cache_backend {
        CacheBackend::Memory => Ok((Arc::new(MemoryCache::new(ttl)), None)),
        CacheBackend::File => {
            let cache = FileCache::open(&config.cache_path, ttl).await?;
            Ok((Arc::new(cache), None))
        }
        CacheBackend::Redis => {
            let client = ::redis::Client::open(config.redis_url.as_str())?;
            let (cache, handle) = RedisCache::new(client, ttl);
            Ok((Arc::new(cache), Some(handle)))
        }
    }
}
