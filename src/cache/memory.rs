use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CacheKey, SourceCache};
use crate::{error::AppResult, models::CacheEntry};

/// Process-local cache, used in tests and when nothing should touch disk
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SourceCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<CacheEntry>> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_valid(Utc::now(), self.ttl) => Ok(Some(entry.clone())),
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key = %key, "Evicted expired cache entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_entry(&self, key: &CacheKey, entry: CacheEntry) -> AppResult<()> {
        self.entries.write().await.insert(*key, entry);
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
