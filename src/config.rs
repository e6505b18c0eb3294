use std::env;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Catalog hostnames the engine is allowed to talk to and return links for.
pub const ALLOWED_HOSTS: &[&str] = &["example-catalog.tld", "www.example-catalog.tld"];

pub const DEFAULT_BASE_URL: &str = "https://www.example-catalog.tld";
pub const MAX_SEARCH_RESULTS: usize = 8;
pub const MAX_REQUESTS_PER_MINUTE: usize = 10;
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
pub const CACHE_TTL: Duration = Duration::from_secs(300);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the catalog site; search lives at `{base_url}/search`.
    pub base_url: Url,
    pub allowed_hosts: Vec<String>,
    pub search_timeout: Duration,
    pub download_timeout: Duration,
    pub max_results: usize,
    pub max_requests_per_minute: usize,
    pub rate_window: Duration,
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            allowed_hosts: ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
            search_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(15),
            max_results: MAX_SEARCH_RESULTS,
            max_requests_per_minute: MAX_REQUESTS_PER_MINUTE,
            rate_window: RATE_WINDOW,
            cache_ttl: CACHE_TTL,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `CATALOG_BASE_URL`, `SEARCH_TIMEOUT_SECS`,
    /// `DOWNLOAD_TIMEOUT_SECS`, `MAX_REQUESTS_PER_MINUTE` and `CACHE_TTL_SECS`.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("CATALOG_BASE_URL") {
            match Url::parse(&raw) {
                Ok(url) => config.base_url = catalog_root(url),
                Err(e) => warn!("Ignoring CATALOG_BASE_URL '{}': {}", raw, e),
            }
        }
        if let Some(secs) = env_u64("SEARCH_TIMEOUT_SECS") {
            config.search_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("DOWNLOAD_TIMEOUT_SECS") {
            config.download_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = env_u64("MAX_REQUESTS_PER_MINUTE") {
            config.max_requests_per_minute = limit as usize;
        }
        if let Some(secs) = env_u64("CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }

        config
    }
}

/// Reads an integer environment variable, warning when it is set but invalid.
pub fn env_u64(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}='{}': not a non-negative integer", key, raw);
            None
        }
    }
}

/// Forces a trailing `/` so relative joins keep the last path segment:
/// `https://host/es` joins `search` as `https://host/es/search`.
pub fn catalog_root(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.base_url.host_str(), Some("www.example-catalog.tld"));
        assert_eq!(config.max_results, 8);
        assert_eq!(config.max_requests_per_minute, 10);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.rate_window, Duration::from_secs(60));
        assert!(config.allowed_hosts.contains(&"example-catalog.tld".to_string()));
    }

    #[test]
    fn test_catalog_root_keeps_path_prefix() {
        let root = catalog_root(Url::parse("https://www.example-catalog.tld/es").unwrap());
        assert_eq!(root.path(), "/es/");
        assert_eq!(root.join("search").unwrap().path(), "/es/search");

        let bare = catalog_root(Url::parse("https://www.example-catalog.tld").unwrap());
        assert_eq!(bare.path(), "/");
        let slashed = catalog_root(Url::parse("https://www.example-catalog.tld/es/").unwrap());
        assert_eq!(slashed.path(), "/es/");
    }

    #[test]
    fn test_env_u64_rejects_garbage() {
        env::set_var("APP_LOCATOR_TEST_GARBAGE", "ten");
        assert_eq!(env_u64("APP_LOCATOR_TEST_GARBAGE"), None);
        env::set_var("APP_LOCATOR_TEST_NUMBER", " 42 ");
        assert_eq!(env_u64("APP_LOCATOR_TEST_NUMBER"), Some(42));
        assert_eq!(env_u64("APP_LOCATOR_TEST_UNSET"), None);
    }
}
