pub mod enrichment;
pub mod grouping;
pub mod providers;
pub mod retry;
pub mod watchlist;

pub use enrichment::{EnrichmentReport, EnrichmentSettings, StreamingEnricher};
pub use grouping::{group_by_service, ServiceGrouping, NOT_AVAILABLE};
pub use watchlist::{WatchlistStreaming, WatchlistView};
