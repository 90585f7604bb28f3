//! Streaming availability provider abstraction
//!
//! A provider resolves a watchlist item to its own title id, lists where that
//! title streams, and reports how much of its request budget is left.
use crate::{
    error::AppResult,
    models::{RateLimitInfo, StreamingSource, WatchlistItem},
};

pub mod watchmode;

pub use watchmode::WatchmodeProvider;

/// Trait for streaming data providers
///
/// Rate-limited responses must surface as `AppError::RateLimited` carrying the
/// provider's counters so callers can tell a transient limit from an
/// exhausted daily quota.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Current quota and rate-limit counters
    async fn rate_limit_status(&self) -> AppResult<RateLimitInfo>;

    /// Resolves a watchlist item to the provider's title id
    ///
    /// `Ok(None)` means the provider does not know the title.
    async fn lookup_title(&self, item: &WatchlistItem) -> AppResult<Option<u64>>;

    /// Fallback lookup by title and year, tried when `lookup_title` finds nothing
    async fn search_title(&self, _item: &WatchlistItem) -> AppResult<Option<u64>> {
        Ok(None)
    }

    /// Subscription and free offers for a provider title id, in provider order
    async fn fetch_sources(&self, title_id: u64) -> AppResult<Vec<StreamingSource>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
