//! Watchmode API provider
//!
//! API Flow:
//! 1. Lookup: /v1/search/ by TMDB movie id → Watchmode title id,
//!    or by "title year" when Watchmode has no TMDB mapping
//! 2. Sources: /v1/title/{watchmode_id}/sources/ → streaming offers
//!
//! Quota and rate-limit counters come from /v1/status/ and from response
//! headers on every call.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        RateLimitInfo, StreamingSource, WatchlistItem, WatchmodeSearchResponse, WatchmodeSource,
        WatchmodeStatus,
    },
    services::providers::StreamingProvider,
};
use reqwest::{header::HeaderMap, Client as HttpClient, Response, StatusCode};

const PROVIDER_NAME: &str = "watchmode";

#[derive(Clone)]
pub struct WatchmodeProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    region: String,
    /// Service names to keep; empty keeps all
    allowed_services: Vec<String>,
}

impl WatchmodeProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        region: String,
        allowed_services: Vec<String>,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            region,
            allowed_services,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.watchmode_api_key.clone(),
            config.watchmode_api_url.clone(),
            config.streaming_region.clone(),
            config.allowed_services.clone(),
        )
    }

    /// Reads rate-limit and account quota headers
    fn parse_rate_limit_headers(headers: &HeaderMap) -> RateLimitInfo {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        RateLimitInfo {
            limit: header(headers, "x-ratelimit-limit"),
            remaining: header(headers, "x-ratelimit-remaining"),
            retry_after: header(headers, "retry-after"),
            quota_total: header(headers, "x-account-quota"),
            quota_used: header(headers, "x-account-quota-used"),
        }
    }

    /// Maps 429 to `RateLimited` and any other failure status to `ExternalApi`
    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let info = Self::parse_rate_limit_headers(response.headers());
            tracing::warn!(
                remaining = ?info.remaining,
                retry_after = ?info.retry_after,
                quota_used = ?info.quota_used,
                quota_total = ?info.quota_total,
                provider = PROVIDER_NAME,
                "Rate limited"
            );
            return Err(AppError::RateLimited(info));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Watchmode API returned status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }

    fn is_allowed(&self, service_name: &str) -> bool {
        self.allowed_services.is_empty()
            || self
                .allowed_services
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(service_name))
    }

    /// Keeps subscription/free offers on allowed services, in provider order
    fn convert_sources(&self, sources: Vec<WatchmodeSource>) -> Vec<StreamingSource> {
        sources
            .into_iter()
            .filter_map(|source| source.into_streaming_source(&self.region))
            .filter(|source| self.is_allowed(&source.name))
            .collect()
    }

    /// First Watchmode title id matching a search
    async fn search(&self, search_field: &str, search_value: &str) -> AppResult<Option<u64>> {
        let url = format!("{}/v1/search/", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("search_field", search_field),
                ("search_value", search_value),
                ("types", "movie"),
            ])
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let search_response: WatchmodeSearchResponse = response.json().await?;

        Ok(search_response.title_results.first().map(|r| r.id))
    }
}

#[async_trait::async_trait]
impl StreamingProvider for WatchmodeProvider {
    async fn rate_limit_status(&self) -> AppResult<RateLimitInfo> {
        let url = format!("{}/v1/status/", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let headers = Self::parse_rate_limit_headers(response.headers());
        let status: WatchmodeStatus = response.json().await?;

        let info = headers.merge(RateLimitInfo {
            quota_total: Some(status.quota),
            quota_used: Some(status.quota_used),
            ..Default::default()
        });

        tracing::debug!(
            quota_used = status.quota_used,
            quota_total = status.quota,
            remaining = ?info.remaining,
            provider = PROVIDER_NAME,
            "Fetched rate limit status"
        );

        Ok(info)
    }

    async fn lookup_title(&self, item: &WatchlistItem) -> AppResult<Option<u64>> {
        self.search("tmdb_movie_id", &item.id.to_string()).await
    }

    async fn search_title(&self, item: &WatchlistItem) -> AppResult<Option<u64>> {
        tracing::debug!(
            item_id = item.id,
            title = %item.title,
            provider = PROVIDER_NAME,
            "No TMDB mapping, falling back to name search"
        );

        self.search("name", &item.search_query()).await
    }

    async fn fetch_sources(&self, title_id: u64) -> AppResult<Vec<StreamingSource>> {
        let url = format!("{}/v1/title/{}/sources/", self.api_url, title_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.region.as_str()),
            ])
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        let response_text = response.text().await?;
        let raw: Vec<WatchmodeSource> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize Watchmode response"
            );
            AppError::ExternalApi(format!("Failed to parse Watchmode response: {}", e))
        })?;

        let offers = raw.len();
        let sources = self.convert_sources(raw);

        tracing::info!(
            title_id,
            offers,
            sources = sources.len(),
            provider = PROVIDER_NAME,
            "Streaming sources fetched"
        );

        Ok(sources)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
