use crate::{
    models::WatchlistItem,
    services::{
        enrichment::StreamingEnricher,
        grouping::{group_by_service, ServiceGrouping},
    },
};

/// Shown when there is nothing on the watchlist
pub const EMPTY_WATCHLIST_MESSAGE: &str =
    "Your watchlist is empty. Add movies to see where they are streaming.";

/// What the watchlist screen should render
#[derive(Debug, Clone, PartialEq)]
pub enum WatchlistView {
    /// Empty-state message
    Empty,
    /// Grouped sections, with a non-blocking banner when some items failed
    Ready {
        grouping: ServiceGrouping,
        banner: Option<String>,
    },
    /// Blocking error panel with retry guidance
    Failed { message: String },
}

impl WatchlistView {
    pub fn message(&self) -> Option<&str> {
        match self {
            WatchlistView::Empty => Some(EMPTY_WATCHLIST_MESSAGE),
            WatchlistView::Ready { banner, .. } => banner.as_deref(),
            WatchlistView::Failed { message } => Some(message),
        }
    }
}

/// Recomputes the watchlist view whenever the watchlist changes
///
/// The caller owns the watchlist and calls `refresh` with its current
/// contents; enrichment only runs when the ordered item ids differ from the
/// last computed pass.
pub struct WatchlistStreaming {
    enricher: StreamingEnricher,
    last_ids: Option<Vec<i64>>,
    view: WatchlistView,
}

impl WatchlistStreaming {
    pub fn new(enricher: StreamingEnricher) -> Self {
        Self {
            enricher,
            last_ids: None,
            view: WatchlistView::Empty,
        }
    }

    pub fn view(&self) -> &WatchlistView {
        &self.view
    }

    /// Forces the next `refresh` to recompute, e.g. after a failed pass
    pub fn invalidate(&mut self) {
        self.last_ids = None;
    }

    pub async fn refresh(&mut self, watchlist: &[WatchlistItem]) -> &WatchlistView {
        let ids: Vec<i64> = watchlist.iter().map(|item| item.id).collect();

        if self.last_ids.as_ref() == Some(&ids) {
            tracing::debug!(items = ids.len(), "Watchlist unchanged, reusing view");
            return &self.view;
        }

        self.view = self.compute(watchlist).await;
        self.last_ids = match self.view {
            WatchlistView::Failed { .. } => None,
            _ => Some(ids),
        };

        &self.view
    }

    async fn compute(&self, watchlist: &[WatchlistItem]) -> WatchlistView {
        if watchlist.is_empty() {
            return WatchlistView::Empty;
        }

        match self.enricher.enrich(watchlist).await {
            Ok(report) => WatchlistView::Ready {
                grouping: group_by_service(&report.items),
                banner: report.partial_failure,
            },
            Err(e) => {
                tracing::error!(error = %e, "Error fetching streaming info");
                WatchlistView::Failed {
                    message: e.user_message(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::AppError;
    use crate::models::{AccessType, RateLimitInfo, StreamingSource};
    use crate::services::enrichment::{EnrichmentSettings, PARTIAL_FAILURE_MESSAGE};
    use crate::services::grouping::NOT_AVAILABLE;
    use crate::services::providers::MockStreamingProvider;
    use crate::services::retry::RetryPolicy;
    use std::sync::Arc;

    fn netflix() -> StreamingSource {
        StreamingSource {
            source_id: 203,
            name: "Netflix".to_string(),
            access_type: AccessType::Subscription,
            region: "US".to_string(),
            web_url: String::new(),
            ios_url: None,
            android_url: None,
            format: None,
        }
    }

    fn streaming(mock: MockStreamingProvider) -> WatchlistStreaming {
        let enricher = StreamingEnricher::new(
            Arc::new(mock),
            Arc::new(MemoryCache::new(chrono::Duration::hours(24))),
            EnrichmentSettings {
                adaptive_batching: false,
                retry: RetryPolicy::default().without_jitter(),
                ..EnrichmentSettings::default()
            },
        );
        WatchlistStreaming::new(enricher)
    }

    fn item(id: i64) -> WatchlistItem {
        WatchlistItem::new(id, format!("Movie {}", id), None)
    }

    #[tokio::test]
    async fn test_empty_watchlist_view() {
        let mut streaming = streaming(MockStreamingProvider::new());
        let view = streaming.refresh(&[]).await;

        assert_eq!(*view, WatchlistView::Empty);
        assert_eq!(view.message(), Some(EMPTY_WATCHLIST_MESSAGE));
    }

    #[tokio::test]
    async fn test_unchanged_watchlist_not_recomputed() {
        let mut mock = MockStreamingProvider::new();
        mock.expect_lookup_title()
            .times(1)
            .returning(|_| Ok(Some(1)));
        mock.expect_fetch_sources()
            .times(1)
            .returning(|_| Ok(vec![netflix()]));

        let mut streaming = streaming(mock);
        let watchlist = vec![item(1)];
        streaming.refresh(&watchlist).await;
        let view = streaming.refresh(&watchlist).await;

        match view {
            WatchlistView::Ready { grouping, banner } => {
                assert_eq!(grouping.service_names(), vec!["Netflix"]);
                assert_eq!(*banner, None);
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_changed_watchlist_recomputed() {
        let mut mock = MockStreamingProvider::new();
        mock.expect_lookup_title()
            .withf(|item| item.id == 1)
            .times(1)
            .returning(|_| Ok(Some(1)));
        mock.expect_fetch_sources()
            .times(1)
            .returning(|_| Ok(vec![netflix()]));
        mock.expect_lookup_title()
            .withf(|item| item.id == 2)
            .times(1)
            .returning(|_| Ok(None));
        mock.expect_search_title()
            .withf(|item| item.id == 2)
            .times(1)
            .returning(|_| Ok(None));
        mock.expect_name().return_const("mock");

        let mut streaming = streaming(mock);
        streaming.refresh(&[item(1)]).await;

        // item 1 comes from the cache, only item 2 reaches the provider
        let view = streaming.refresh(&[item(1), item(2)]).await;

        match view {
            WatchlistView::Ready { grouping, .. } => {
                assert_eq!(grouping.service_names(), vec!["Netflix", NOT_AVAILABLE]);
                assert_eq!(grouping.get(NOT_AVAILABLE).unwrap()[0].id(), 2);
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_sets_banner() {
        let mut mock = MockStreamingProvider::new();
        mock.expect_lookup_title()
            .returning(|_| Err(AppError::ExternalApi("502".to_string())));
        mock.expect_name().return_const("mock");

        let mut streaming = streaming(mock);
        let view = streaming.refresh(&[item(1)]).await;

        assert_eq!(view.message(), Some(PARTIAL_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_quota_failure_blocks_and_allows_retry() {
        let mut mock = MockStreamingProvider::new();
        mock.expect_lookup_title().times(2).returning(|_| {
            Err(AppError::RateLimited(RateLimitInfo {
                quota_total: Some(1000),
                quota_used: Some(1000),
                ..Default::default()
            }))
        });

        let mut streaming = streaming(mock);
        let watchlist = vec![item(1)];

        let view = streaming.refresh(&watchlist).await;
        assert_eq!(
            view.message(),
            Some("Daily API quota exceeded. Please try again tomorrow.")
        );

        // failed passes are not memoized
        streaming.refresh(&watchlist).await;
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let mut mock = MockStreamingProvider::new();
        mock.expect_lookup_title().times(2).returning(|_| Ok(None));
        mock.expect_search_title().times(2).returning(|_| Ok(None));

        let mut streaming = streaming(mock);
        let watchlist = vec![item(1)];
        streaming.refresh(&watchlist).await;
        streaming.invalidate();
        streaming.refresh(&watchlist).await;
    }
}
