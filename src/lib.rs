//! Streaming availability for a movie watchlist
//!
//! [`StreamingEnricher`] annotates watchlist items with the subscription and
//! free services they stream on, throttled to the provider's request budget
//! and backed by a 24 hour cache. [`group_by_service`] turns the result into
//! per-service sections, and [`WatchlistStreaming`] recomputes both when the
//! watchlist changes.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{EnrichedItem, StreamingSource, WatchlistItem};
pub use services::{
    group_by_service, EnrichmentReport, ServiceGrouping, StreamingEnricher, WatchlistStreaming,
    WatchlistView,
};
