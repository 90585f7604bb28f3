//! Watchlist streaming enrichment
//!
//! Items are processed in consecutive batches: everything inside a batch runs
//! concurrently, batches run one after another with a fixed pause in between
//! to stay under the provider's per-second limit. The batch size shrinks when
//! the provider reports few remaining requests, reserving two requests per
//! item (one lookup, one sources fetch).

use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::{build_cache, CacheKey, CacheWriterHandle, SourceCache},
    config::{Config, BATCH_SIZE_CEILING},
    error::{AppError, AppResult},
    models::{EnrichedItem, RateLimitInfo, StreamingSource, WatchlistItem},
    services::{
        providers::{StreamingProvider, WatchmodeProvider},
        retry::RetryPolicy,
    },
};

/// Banner text shown when some, but not all, items failed
pub const PARTIAL_FAILURE_MESSAGE: &str =
    "Some movies failed to load streaming information. Please try again later.";

/// One title lookup plus one sources fetch
const REQUESTS_PER_ITEM: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct EnrichmentSettings {
    /// Ceiling on items per batch, itself capped at `BATCH_SIZE_CEILING`
    pub max_batch_size: usize,
    /// Query the provider's counters up front and shrink batches to fit
    pub adaptive_batching: bool,
    pub quota_safety_margin: u32,
    pub inter_batch_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            max_batch_size: BATCH_SIZE_CEILING,
            adaptive_batching: true,
            quota_safety_margin: 5,
            inter_batch_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

impl EnrichmentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            quota_safety_margin: config.quota_safety_margin,
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay_ms),
            retry: RetryPolicy::from_config(config),
            ..Self::default()
        }
    }

    /// Items per batch given the provider's remaining budget
    pub fn batch_size(&self, status: Option<&RateLimitInfo>) -> usize {
        let max = self.max_batch_size.clamp(1, BATCH_SIZE_CEILING);

        let Some(left) = status.and_then(RateLimitInfo::requests_left) else {
            return max;
        };

        let safe_remaining = left.saturating_sub(self.quota_safety_margin).max(1);
        ((safe_remaining / REQUESTS_PER_ITEM) as usize).clamp(1, max)
    }
}

/// Result of one enrichment pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    /// Watchlist order is preserved
    pub items: Vec<EnrichedItem>,
    /// Set when at least one item failed for a reason other than missing data
    pub partial_failure: Option<String>,
}

/// Terminal state of a single item
#[derive(Debug)]
pub enum ItemOutcome {
    /// Valid cache entry, no provider calls made
    Cached(Vec<StreamingSource>),
    Fetched(Vec<StreamingSource>),
    /// Provider has no title or no qualifying offers
    Empty,
    Failed(AppError),
}

#[derive(Clone)]
pub struct StreamingEnricher {
    provider: Arc<dyn StreamingProvider>,
    cache: Arc<dyn SourceCache>,
    settings: EnrichmentSettings,
}

impl StreamingEnricher {
    pub fn new(
        provider: Arc<dyn StreamingProvider>,
        cache: Arc<dyn SourceCache>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            provider,
            cache,
            settings,
        }
    }

    /// Wires the Watchmode provider and the configured cache backend
    pub async fn from_config(
        config: &Config,
    ) -> anyhow::Result<(Self, Option<CacheWriterHandle>)> {
        let provider = Arc::new(WatchmodeProvider::from_config(config));
        let (cache, handle) = build_cache(config).await?;

        tracing::info!(
            provider = provider.name(),
            cache = cache.name(),
            max_batch_size = config.max_batch_size,
            "Streaming enricher configured"
        );

        let enricher = Self::new(provider, cache, EnrichmentSettings::from_config(config));
        Ok((enricher, handle))
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Annotates every watchlist item with its streaming sources
    ///
    /// Per-item failures never fail the pass: the item comes back with no
    /// sources and `partial_failure` is set. Only an exhausted daily quota or
    /// a crashed item task aborts with an error.
    pub async fn enrich(&self, watchlist: &[WatchlistItem]) -> AppResult<EnrichmentReport> {
        if watchlist.is_empty() {
            return Ok(EnrichmentReport::default());
        }

        let batch_size = self.plan_batch_size().await?;
        let batch_count = watchlist.len().div_ceil(batch_size);

        tracing::info!(
            items = watchlist.len(),
            batch_size,
            batches = batch_count,
            "Enriching watchlist"
        );

        let mut items = Vec::with_capacity(watchlist.len());
        let mut failed = 0usize;

        for (index, batch) in watchlist.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }

            let tasks: Vec<_> = batch
                .iter()
                .cloned()
                .map(|item| {
                    let enricher = self.clone();
                    tokio::spawn(async move { enricher.resolve_item(&item).await })
                })
                .collect();

            let mut fatal: Option<AppError> = None;

            for (item, task) in batch.iter().zip(tasks) {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(item_id = item.id, error = %e, "Item task join error");
                        fatal.get_or_insert(AppError::Internal(e.to_string()));
                        continue;
                    }
                };

                match outcome {
                    ItemOutcome::Cached(sources) | ItemOutcome::Fetched(sources) => {
                        items.push(EnrichedItem::new(item.clone(), sources));
                    }
                    ItemOutcome::Empty => items.push(EnrichedItem::unavailable(item.clone())),
                    ItemOutcome::Failed(e) if e.is_quota_exhausted() => {
                        if !matches!(fatal, Some(AppError::QuotaExhausted(_))) {
                            fatal = Some(e.classify());
                        }
                    }
                    ItemOutcome::Failed(_) => {
                        failed += 1;
                        items.push(EnrichedItem::unavailable(item.clone()));
                    }
                }
            }

            if let Some(e) = fatal {
                tracing::error!(
                    batch = index + 1,
                    batches = batch_count,
                    error = %e,
                    "Aborting enrichment pass"
                );
                return Err(e);
            }
        }

        if failed > 0 {
            tracing::warn!(
                failed,
                total = watchlist.len(),
                "Some items failed to load streaming information"
            );
        }

        tracing::info!(items = items.len(), failed, "Watchlist enrichment completed");

        Ok(EnrichmentReport {
            items,
            partial_failure: (failed > 0).then(|| PARTIAL_FAILURE_MESSAGE.to_string()),
        })
    }

    /// Picks the batch size, failing fast when the daily quota is gone
    async fn plan_batch_size(&self) -> AppResult<usize> {
        if !self.settings.adaptive_batching {
            return Ok(self.settings.batch_size(None));
        }

        match self.provider.rate_limit_status().await {
            Ok(status) if status.quota_exhausted() => Err(AppError::QuotaExhausted(status)),
            Ok(status) => Ok(self.settings.batch_size(Some(&status))),
            Err(e) if e.is_quota_exhausted() => Err(e.classify()),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Rate limit status unavailable, using maximum batch size"
                );
                Ok(self.settings.batch_size(None))
            }
        }
    }

    /// Cache first, provider second; never returns an error
    pub async fn resolve_item(&self, item: &WatchlistItem) -> ItemOutcome {
        let key = CacheKey(item.id);

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                tracing::debug!(item_id = item.id, "Cache hit");
                return ItemOutcome::Cached(entry.sources);
            }
            Ok(None) => tracing::debug!(item_id = item.id, "Cache miss"),
            Err(e) => tracing::warn!(
                item_id = item.id,
                cache = self.cache.name(),
                error = %e,
                "Cache read failed, fetching from provider"
            ),
        }

        match self.fetch_item(item).await {
            Ok(sources) if sources.is_empty() => {
                tracing::debug!(item_id = item.id, "No streaming sources found");
                ItemOutcome::Empty
            }
            Ok(sources) => {
                if let Err(e) = self.cache.set(&key, &sources).await {
                    tracing::warn!(
                        item_id = item.id,
                        cache = self.cache.name(),
                        error = %e,
                        "Cache write failed"
                    );
                }
                ItemOutcome::Fetched(sources)
            }
            Err(e) => {
                if !e.is_quota_exhausted() {
                    tracing::warn!(
                        item_id = item.id,
                        title = %item.title,
                        provider = self.provider.name(),
                        error = %e,
                        "Failed to fetch streaming sources"
                    );
                }
                ItemOutcome::Failed(e)
            }
        }
    }

    async fn fetch_item(&self, item: &WatchlistItem) -> AppResult<Vec<StreamingSource>> {
        let retry = &self.settings.retry;

        let title_id = match retry.run(|| self.provider.lookup_title(item)).await? {
            Some(title_id) => Some(title_id),
            None => retry.run(|| self.provider.search_title(item)).await?,
        };

        let Some(title_id) = title_id else {
            tracing::debug!(item_id = item.id, "Title not known to provider");
            return Ok(Vec::new());
        };

        retry.run(|| self.provider.fetch_sources(title_id)).await
    }
}
