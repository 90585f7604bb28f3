use serde::Deserialize;
use std::path::PathBuf;

/// Most items ever enriched concurrently
pub const BATCH_SIZE_CEILING: usize = 3;

/// Where cached streaming sources are persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local only, lost on exit
    Memory,
    /// JSON document on local disk
    File,
    /// Shared Redis instance
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Watchmode API key
    pub watchmode_api_key: String,

    /// Watchmode API base URL
    #[serde(default = "default_watchmode_api_url")]
    pub watchmode_api_url: String,

    /// Region passed to the sources endpoint
    #[serde(default = "default_streaming_region")]
    pub streaming_region: String,

    /// Service names to keep; empty keeps every subscription/free service
    #[serde(default = "default_allowed_services")]
    pub allowed_services: Vec<String>,

    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// File backing the streaming-source cache
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Upper bound on items enriched concurrently
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Requests held back from the remaining budget when sizing batches
    #[serde(default = "default_quota_safety_margin")]
    pub quota_safety_margin: u32,

    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_jitter_ms")]
    pub retry_max_jitter_ms: u64,
}

fn default_watchmode_api_url() -> String {
    "https://api.watchmode.com".to_string()
}

fn default_streaming_region() -> String {
    "US".to_string()
}

fn default_allowed_services() -> Vec<String> {
    ["Netflix", "Hulu", "Max", "Prime Video", "Disney+", "Apple TV+"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("streaming-cache.json")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_max_batch_size() -> usize {
    BATCH_SIZE_CEILING
}

fn default_quota_safety_margin() -> u32 {
    5
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_retry_max_jitter_ms() -> u64 {
    250
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if !(1..=BATCH_SIZE_CEILING).contains(&config.max_batch_size) {
            anyhow::bail!(
                "MAX_BATCH_SIZE must be between 1 and {}",
                BATCH_SIZE_CEILING
            );
        }
        if config.retry_max_attempts == 0 {
            anyhow::bail!("RETRY_MAX_ATTEMPTS must be at least 1");
        }

        Ok(config)
    }
}
