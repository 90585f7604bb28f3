use serde::{Deserialize, Serialize};

/// How an offer grants access to a title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Subscription,
    Free,
    /// Rent, buy, TV-everywhere and anything the provider adds later
    Other,
}

impl AccessType {
    /// Maps the provider's offer type onto our access types
    pub fn from_provider(source_type: &str) -> Self {
        match source_type.to_lowercase().as_str() {
            "sub" | "subscription" => AccessType::Subscription,
            "free" => AccessType::Free,
            _ => AccessType::Other,
        }
    }

    /// Only subscription and free offers are shown on the watchlist
    pub fn is_retained(self) -> bool {
        matches!(self, AccessType::Subscription | AccessType::Free)
    }
}

/// An offer indicating where a title can be watched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingSource {
    pub source_id: u64,
    /// Service name (e.g., "Netflix")
    pub name: String,
    pub access_type: AccessType,
    pub region: String,
    pub web_url: String,
    #[serde(default)]
    pub ios_url: Option<String>,
    #[serde(default)]
    pub android_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}
