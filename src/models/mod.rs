use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod streaming_source;
pub mod watchlist_item;

pub use streaming_source::{AccessType, StreamingSource};
pub use watchlist_item::WatchlistItem;

/// A watchlist item annotated with the places it can be streamed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: WatchlistItem,
    pub streaming_sources: Vec<StreamingSource>,
}

impl EnrichedItem {
    pub fn new(item: WatchlistItem, streaming_sources: Vec<StreamingSource>) -> Self {
        Self {
            item,
            streaming_sources,
        }
    }

    /// An item with no known streaming sources
    pub fn unavailable(item: WatchlistItem) -> Self {
        Self::new(item, Vec::new())
    }

    pub fn id(&self) -> i64 {
        self.item.id
    }
}

/// Cached streaming sources for one watchlist item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Provider order is preserved
    pub sources: Vec<StreamingSource>,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(sources: Vec<StreamingSource>) -> Self {
        Self {
            sources,
            cached_at: Utc::now(),
        }
    }

    /// An entry is usable while it is younger than `ttl` and not empty
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.sources.is_empty() && now - self.cached_at < ttl
    }
}

/// Rate-limit and quota counters reported by the streaming provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Requests allowed per window (`x-ratelimit-limit`)
    pub limit: Option<u32>,
    /// Requests left in the current window (`x-ratelimit-remaining`)
    pub remaining: Option<u32>,
    /// Seconds to wait before retrying (`retry-after`)
    pub retry_after: Option<u64>,
    /// Daily account quota (`x-account-quota`)
    pub quota_total: Option<u32>,
    /// Requests used today (`x-account-quota-used`)
    pub quota_used: Option<u32>,
}

impl RateLimitInfo {
    pub fn quota_exhausted(&self) -> bool {
        match (self.quota_used, self.quota_total) {
            (Some(used), Some(total)) => used >= total,
            _ => false,
        }
    }

    /// Requests still available, preferring the daily quota over the window counter
    pub fn requests_left(&self) -> Option<u32> {
        match (self.quota_used, self.quota_total) {
            (Some(used), Some(total)) => {
                let quota_left = total.saturating_sub(used);
                Some(self.remaining.map_or(quota_left, |r| r.min(quota_left)))
            }
            _ => self.remaining,
        }
    }

    /// Fills in fields missing here from `other`
    pub fn merge(self, other: RateLimitInfo) -> Self {
        Self {
            limit: self.limit.or(other.limit),
            remaining: self.remaining.or(other.remaining),
            retry_after: self.retry_after.or(other.retry_after),
            quota_total: self.quota_total.or(other.quota_total),
            quota_used: self.quota_used.or(other.quota_used),
        }
    }
}

// ============================================================================
// Watchmode API Types
// ============================================================================

/// Watchmode `/search/` response
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSearchResponse {
    #[serde(default)]
    pub title_results: Vec<WatchmodeTitle>,
}

/// Watchmode search result
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitle {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub title_type: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
}

/// Watchmode `/title/{id}/sources/` entry
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSource {
    pub source_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub ios_url: Option<String>,
    #[serde(default)]
    pub android_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl WatchmodeSource {
    /// Converts to a `StreamingSource`, dropping offers we never show
    pub fn into_streaming_source(self, default_region: &str) -> Option<StreamingSource> {
        let access_type = AccessType::from_provider(&self.source_type);
        if !access_type.is_retained() {
            return None;
        }

        Some(StreamingSource {
            source_id: self.source_id,
            name: self.name,
            access_type,
            region: self.region.unwrap_or_else(|| default_region.to_string()),
            web_url: self.web_url.unwrap_or_default(),
            ios_url: self.ios_url,
            android_url: self.android_url,
            format: self.format,
        })
    }
}

/// Watchmode `/status/` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchmodeStatus {
    pub quota: u32,
    pub quota_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netflix() -> StreamingSource {
        StreamingSource {
            source_id: 203,
            name: "Netflix".to_string(),
            access_type: AccessType::Subscription,
            region: "US".to_string(),
            web_url: "https://www.netflix.com/title/70131314".to_string(),
            ios_url: None,
            android_url: None,
            format: Some("4K".to_string()),
        }
    }

    #[test]
    fn test_cache_entry_valid_when_fresh() {
        let entry = CacheEntry::new(vec![netflix()]);
        assert!(entry.is_valid(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn test_cache_entry_expired_after_ttl() {
        let entry = CacheEntry {
            sources: vec![netflix()],
            cached_at: Utc::now() - Duration::hours(25),
        };
        assert!(!entry.is_valid(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn test_cache_entry_expires_exactly_at_ttl() {
        let now = Utc::now();
        let entry = CacheEntry {
            sources: vec![netflix()],
            cached_at: now - Duration::hours(24),
        };
        assert!(!entry.is_valid(now, Duration::hours(24)));
    }

    #[test]
    fn test_empty_cache_entry_is_never_valid() {
        let entry = CacheEntry::new(Vec::new());
        assert!(!entry.is_valid(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn test_quota_exhausted() {
        let info = RateLimitInfo {
            quota_total: Some(1000),
            quota_used: Some(1000),
            ..Default::default()
        };
        assert!(info.quota_exhausted());
        assert!(!RateLimitInfo::default().quota_exhausted());
    }

    #[test]
    fn test_requests_left_prefers_smaller_budget() {
        let info = RateLimitInfo {
            remaining: Some(40),
            quota_total: Some(1000),
            quota_used: Some(990),
            ..Default::default()
        };
        assert_eq!(info.requests_left(), Some(10));
    }

    #[test]
    fn test_merge_keeps_existing_fields() {
        let headers = RateLimitInfo {
            remaining: Some(3),
            ..Default::default()
        };
        let body = RateLimitInfo {
            remaining: Some(99),
            quota_total: Some(1000),
            quota_used: Some(5),
            ..Default::default()
        };
        let merged = headers.merge(body);
        assert_eq!(merged.remaining, Some(3));
        assert_eq!(merged.quota_total, Some(1000));
    }

    #[test]
    fn test_enriched_item_serializes_flat() {
        let item = EnrichedItem::new(
            WatchlistItem::new(27205, "Inception", Some(2010)),
            vec![netflix()],
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], 27205);
        assert_eq!(json["title"], "Inception");
        assert_eq!(json["streaming_sources"][0]["name"], "Netflix");
    }

    #[test]
    fn test_watchmode_source_deserialization() {
        let json = r#"{
            "source_id": 203,
            "name": "Netflix",
            "type": "sub",
            "region": "US",
            "ios_url": "nflx://www.netflix.com/title/70131314",
            "android_url": null,
            "web_url": "https://www.netflix.com/title/70131314",
            "format": "4K",
            "price": null,
            "seasons": null,
            "episodes": null
        }"#;

        let source: WatchmodeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.source_id, 203);
        assert_eq!(source.source_type, "sub");
        assert_eq!(source.android_url, None);

        let converted = source.into_streaming_source("US").unwrap();
        assert_eq!(converted, StreamingSource {
            ios_url: Some("nflx://www.netflix.com/title/70131314".to_string()),
            ..netflix()
        });
    }

    #[test]
    fn test_watchmode_rent_offer_dropped() {
        let source = WatchmodeSource {
            source_id: 349,
            name: "iTunes".to_string(),
            source_type: "rent".to_string(),
            region: None,
            web_url: None,
            ios_url: None,
            android_url: None,
            format: Some("HD".to_string()),
        };
        assert!(source.into_streaming_source("US").is_none());
    }

    #[test]
    fn test_watchmode_source_defaults_region() {
        let source = WatchmodeSource {
            source_id: 157,
            name: "Hulu".to_string(),
            source_type: "free".to_string(),
            region: None,
            web_url: None,
            ios_url: None,
            android_url: None,
            format: None,
        };
        let converted = source.into_streaming_source("CA").unwrap();
        assert_eq!(converted.region, "CA");
        assert_eq!(converted.web_url, "");
    }

    #[test]
    fn test_watchmode_status_deserialization() {
        let status: WatchmodeStatus =
            serde_json::from_str(r#"{"quota": 1000, "quotaUsed": 250}"#).unwrap();
        assert_eq!(status.quota, 1000);
        assert_eq!(status.quota_used, 250);
    }

    #[test]
    fn test_watchmode_search_deserialization() {
        let json = r#"{
            "title_results": [
                {"resultType": "title", "id": 1182444, "name": "Inception", "type": "movie", "year": 2010, "imdb_id": "tt1375666", "tmdb_id": 27205, "tmdb_type": "movie"}
            ],
            "people_results": []
        }"#;
        let response: WatchmodeSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.title_results.len(), 1);
        assert_eq!(response.title_results[0].id, 1182444);
        assert_eq!(response.title_results[0].tmdb_id, Some(27205));
    }
}
