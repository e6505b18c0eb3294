use serde::{Deserialize, Serialize};
use url::Url;

/// Identity of the person issuing requests, as assigned by the chat platform.
pub type UserId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Display name, whitespace-collapsed and capped at 100 characters.
    pub name: String,
    pub url: Url,
    /// Link text exactly as it appeared in the page, trimmed.
    pub raw_label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_search_count: usize,
    pub cached_download_count: usize,
}

/// Search results plus whether they were served from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub from_cache: bool,
}

// HTTP surface types

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub user_id: UserId,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub from_cache: bool,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub app_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub app_url: String,
    pub download_url: Option<String>,
    /// Suggested file name for the transport, e.g. `sample-app.apk`.
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub cached_searches: usize,
    pub cached_downloads: usize,
    pub active_users: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
