use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{CacheKey, SourceCache};
use crate::{error::AppResult, models::CacheEntry};

/// Cache persisted as a single JSON document on local disk
///
/// The whole mapping lives in memory and the file is rewritten after every
/// change, so entries survive restarts. Concurrent processes sharing the file
/// get last-writer-wins semantics.
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<i64, CacheEntry>>,
    ttl: Duration,
}

impl FileCache {
    /// Opens the cache file, starting empty if it is missing or unreadable
    pub async fn open(path: impl AsRef<Path>, ttl: Duration) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load(&path).await?;

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "Loaded streaming source cache"
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            ttl,
        })
    }

    async fn load(path: &Path) -> AppResult<HashMap<i64, CacheEntry>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cache file is corrupted, starting with an empty cache"
                );
                Ok(HashMap::new())
            }
        }
    }

    /// Rewrites the backing file; write to a temp file then rename
    async fn persist(&self, entries: &HashMap<i64, CacheEntry>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec(entries)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!(entries = entries.len(), "Persisted streaming source cache");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SourceCache for FileCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<CacheEntry>> {
        let mut entries = self.entries.lock().await;

        let valid = match entries.get(&key.0) {
            Some(entry) => entry.is_valid(Utc::now(), self.ttl),
            None => return Ok(None),
        };

        if valid {
            return Ok(entries.get(&key.0).cloned());
        }

        entries.remove(&key.0);
        tracing::debug!(key = %key, "Evicted expired cache entry");
        self.persist(&entries).await?;
        Ok(None)
    }

    async fn put_entry(&self, key: &CacheKey, entry: CacheEntry) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.0, entry);
        self.persist(&entries).await
    }

    async fn evict(&self, key: &CacheKey) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(&key.0).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
