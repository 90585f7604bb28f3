use chrono::{Duration, Utc};
use redis::AsyncCommands;
use redis::Client;
use tokio::sync::mpsc;

use super::{CacheKey, SourceCache};
use crate::{error::AppResult, models::CacheEntry};

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Streaming-source cache stored in Redis
///
/// Reads go straight to Redis; writes are queued to a background task so a
/// slow Redis never delays an enrichment pass. Redis expires keys on its own,
/// but `cached_at` is still checked on read so every backend agrees on
/// validity.
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
    ttl: Duration,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Sends a shutdown signal; the writer flushes queued writes before exiting
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl RedisCache {
    /// Creates the cache and spawns its background writer task
    pub fn new(redis_client: Client, ttl: Duration) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
            ttl,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Seconds left before an entry written now should expire in Redis
    fn remaining_ttl_secs(&self, entry: &CacheEntry) -> u64 {
        let age = Utc::now() - entry.cached_at;
        (self.ttl - age).num_seconds().max(1) as u64
    }
}

#[async_trait::async_trait]
impl SourceCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<CacheEntry>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        let Some(json) = cached else {
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_str(&json)?;
        if entry.is_valid(Utc::now(), self.ttl) {
            return Ok(Some(entry));
        }

        let _: () = conn.del(key.to_string()).await?;
        tracing::debug!(key = %key, "Evicted expired cache entry");
        Ok(None)
    }

    async fn put_entry(&self, key: &CacheKey, entry: CacheEntry) -> AppResult<()> {
        let ttl = self.remaining_ttl_secs(&entry);
        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: serde_json::to_string(&entry)?,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
