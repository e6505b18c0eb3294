use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::query::normalize_query;
use crate::types::{CacheStats, SearchResult};

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    /// An entry stored after `now` (written mid-sweep) counts as zero age.
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Short-lived memo of search results and resolved download links.
#[derive(Debug)]
pub struct ResultCache {
    searches: DashMap<String, CacheEntry<Vec<SearchResult>>>,
    downloads: DashMap<String, CacheEntry<Url>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            searches: DashMap::new(),
            downloads: DashMap::new(),
            ttl,
        }
    }

    pub fn get_search(&self, query: &str) -> Option<Vec<SearchResult>> {
        let key = search_key(query)?;
        let entry = self.searches.get(&key)?;
        if entry.is_fresh(Instant::now(), self.ttl) {
            debug!("search cache hit for {}", &key[..12]);
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Queries that do not survive normalization are not stored.
    pub fn put_search(&self, query: &str, results: Vec<SearchResult>) {
        if let Some(key) = search_key(query) {
            self.searches.insert(key, CacheEntry::new(results));
        }
    }

    pub fn get_download(&self, app_url: &str) -> Option<Url> {
        let entry = self.downloads.get(app_url)?;
        if entry.is_fresh(Instant::now(), self.ttl) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put_download(&self, app_url: &str, link: Url) {
        self.downloads
            .insert(app_url.to_string(), CacheEntry::new(link));
    }

    /// Removes stale entries from both maps and returns how many went away.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.searches.len() + self.downloads.len();
        self.searches.retain(|_, e| e.is_fresh(now, ttl));
        self.downloads.retain(|_, e| e.is_fresh(now, ttl));
        before.saturating_sub(self.searches.len() + self.downloads.len())
    }

    /// Entry counts, including expired entries that have not been swept yet.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_search_count: self.searches.len(),
            cached_download_count: self.downloads.len(),
        }
    }
}

fn search_key(query: &str) -> Option<String> {
    let normalized = normalize_query(query).ok()?;
    let digest = Sha256::digest(normalized.as_bytes());
    Some(format!("{:x}", digest))
}
