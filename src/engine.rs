use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::download::DownloadResolver;
use crate::error::{EngineError, Result};
use crate::fetch::{Fetch, HttpFetcher};
use crate::query::normalize_query;
use crate::rate_limit::RateLimiter;
use crate::search::SearchResolver;
use crate::types::{CacheStats, SearchOutcome, SearchResult, UserId};

/// The resolution engine: rate limiting, caching and both resolvers.
///
/// Safe to share as `Arc<Engine>` between tasks. The engine never schedules
/// work on its own; callers drive [`Engine::sweep_expired`] from a timer.
pub struct Engine {
    limiter: RateLimiter,
    cache: ResultCache,
    searcher: SearchResolver,
    downloader: DownloadResolver,
}

impl Engine {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            limiter: RateLimiter::new(config.max_requests_per_minute, config.rate_window),
            cache: ResultCache::new(config.cache_ttl),
            searcher: SearchResolver::new(fetcher.clone(), &config),
            downloader: DownloadResolver::new(fetcher, &config),
        }
    }

    /// Engine backed by a real HTTP client with rotating browser identities.
    pub fn with_http(config: EngineConfig) -> reqwest::Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub async fn search(&self, user: UserId, query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.search_cached(user, query).await?.results)
    }

    /// Like [`Engine::search`], also reporting whether the cache answered.
    pub async fn search_cached(&self, user: UserId, query: &str) -> Result<SearchOutcome> {
        if !self.limiter.allow(user) {
            warn!("Rate limit exceeded for user {}", user);
            return Err(EngineError::RateLimited);
        }
        let normalized = normalize_query(query)?;

        if let Some(results) = self.cache.get_search(&normalized) {
            debug!("search cache hit for '{}'", normalized);
            return Ok(SearchOutcome {
                results,
                from_cache: true,
            });
        }

        let results = self.searcher.search(&normalized).await?;
        // Empty pages are often transient layout or load issues; ask again next time.
        if !results.is_empty() {
            self.cache.put_search(&normalized, results.clone());
        }
        Ok(SearchOutcome {
            results,
            from_cache: false,
        })
    }

    pub async fn resolve_download(&self, app_url: &str) -> Result<Option<Url>> {
        let page = self.downloader.download_page(app_url)?;
        let key = page.as_str();

        if let Some(link) = self.cache.get_download(key) {
            debug!("download cache hit for {}", key);
            return Ok(Some(link));
        }

        let link = self.downloader.resolve_page(&page).await?;
        if let Some(found) = &link {
            self.cache.put_download(key, found.clone());
        }
        Ok(link)
    }

    /// Time until `user` may search again, when currently throttled.
    pub fn retry_after(&self, user: UserId) -> Option<std::time::Duration> {
        self.limiter.retry_after(user)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn active_user_count(&self) -> usize {
        self.limiter.active_user_count()
    }

    /// Drops expired cache entries and idle rate windows. Returns the number
    /// of cache entries removed.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.cache.sweep();
        let idle = self.limiter.prune_idle();
        info!("Sweep removed {} cache entries and {} idle users", removed, idle);
        removed
    }
}
