use serde::{Deserialize, Serialize};

/// A movie the user saved for later viewing
///
/// The id is the movie-metadata provider's (TMDB) id; it doubles as the cache
/// key for streaming sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

impl WatchlistItem {
    /// Creates a watchlist item without display metadata
    pub fn new(id: i64, title: impl Into<String>, release_year: Option<i32>) -> Self {
        Self {
            id,
            title: title.into(),
            release_year,
            poster_path: None,
            vote_average: None,
        }
    }

    /// Free-text query used when the provider has no id mapping for this title
    pub fn search_query(&self) -> String {
        match self.release_year {
            Some(year) => format!("{} {}", self.title, year),
            None => self.title.clone(),
        }
    }
}
