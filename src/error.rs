use crate::models::RateLimitInfo;

/// Fallback wait advertised to the user when the provider sends no `retry-after`
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External API error: {0}")]
    ExternalApi(String),

    /// HTTP 429 from the streaming provider
    #[error("Rate limited by streaming provider (retry after {retry_after:?}s)", retry_after = .0.retry_after)]
    RateLimited(RateLimitInfo),

    /// The provider's daily request allowance is used up
    #[error("Daily API quota exceeded ({used:?}/{total:?} requests used)", used = .0.quota_used, total = .0.quota_total)]
    QuotaExhausted(RateLimitInfo),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Normalizes a 429 carrying an exhausted quota into `QuotaExhausted`
    pub fn classify(self) -> Self {
        match self {
            AppError::RateLimited(info) if info.quota_exhausted() => AppError::QuotaExhausted(info),
            other => other,
        }
    }

    /// True for a 429 that may succeed if retried later today
    pub fn is_transient_rate_limit(&self) -> bool {
        matches!(self, AppError::RateLimited(info) if !info.quota_exhausted())
    }

    /// True when no further provider call can succeed today
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            AppError::QuotaExhausted(_) => true,
            AppError::RateLimited(info) => info.quota_exhausted(),
            _ => false,
        }
    }

    /// Message suitable for a blocking error panel
    pub fn user_message(&self) -> String {
        if self.is_quota_exhausted() {
            return "Daily API quota exceeded. Please try again tomorrow.".to_string();
        }

        match self {
            AppError::RateLimited(info) => format!(
                "Rate limit exceeded. Please try again in {} seconds.",
                info.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            ),
            _ => "Failed to fetch streaming information".to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
