use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::{catalog_root, EngineConfig};
use crate::domain::DomainValidator;
use crate::error::{EngineError, Result};
use crate::extract::{self, Candidate, SEARCH_STRATEGIES};
use crate::fetch::Fetch;
use crate::query::normalize_query;
use crate::types::SearchResult;

pub const MAX_NAME_CHARS: usize = 100;
pub const MIN_NAME_CHARS: usize = 2;

/// Turns a query into a list of app pages on the catalog site.
#[derive(Clone)]
pub struct SearchResolver {
    fetcher: Arc<dyn Fetch>,
    validator: DomainValidator,
    base_url: Url,
    timeout: Duration,
    max_results: usize,
}

impl SearchResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, config: &EngineConfig) -> Self {
        Self {
            fetcher,
            validator: DomainValidator::new(&config.allowed_hosts, true),
            base_url: catalog_root(config.base_url.clone()),
            timeout: config.search_timeout,
            max_results: config.max_results,
        }
    }

    pub async fn search(&self, raw_query: &str) -> Result<Vec<SearchResult>> {
        let query = normalize_query(raw_query)?;
        info!("Searching catalog for: {}", query);

        let url = self.search_url(&query)?;
        debug!("Search URL: {}", url);
        let response = self.fetcher.get(&url, self.timeout).await?;

        let document = extract::parse_document(&url, &response.body)?;
        let results = self.extract_results(&document, &url);
        info!("Catalog returned {} results for '{}'", results.len(), query);
        Ok(results)
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| EngineError::validation(format!("bad catalog base URL: {}", e)))?;
        url.query_pairs_mut().clear().append_pair("q", query);
        Ok(url)
    }

    /// Runs the strategies in priority order; the first one producing a valid
    /// result wins. Falls back to every link that looks like an app page.
    pub fn extract_results(&self, document: &Html, page_url: &Url) -> Vec<SearchResult> {
        for strategy in SEARCH_STRATEGIES {
            let results = self.accept(strategy.candidates(document, self.max_results), page_url);
            if !results.is_empty() {
                debug!("strategy '{}' matched {} results", strategy.name, results.len());
                return results;
            }
        }

        let fallback: Vec<Candidate> = extract::all_links(document)
            .into_iter()
            .filter(|c| page_url.join(&c.href).map(|u| extract::is_app_page(&u)).unwrap_or(false))
            .collect();
        let results = self.accept(fallback, page_url);
        debug!("fallback pass matched {} results", results.len());
        results
    }

    fn accept(&self, candidates: Vec<Candidate>, page_url: &Url) -> Vec<SearchResult> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for c in candidates {
            if results.len() >= self.max_results {
                break;
            }
            let Ok(mut url) = page_url.join(&c.href) else {
                continue;
            };
            url.set_fragment(None);
            if !self.validator.is_allowed_url(&url) {
                continue;
            }
            let name: String = c.name.chars().take(MAX_NAME_CHARS).collect();
            if name.chars().count() < MIN_NAME_CHARS {
                continue;
            }
            if seen.insert(url.to_string()) {
                results.push(SearchResult {
                    name,
                    url,
                    raw_label: c.label,
                });
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticPage {
        body: String,
        requested: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl Fetch for StaticPage {
        async fn get(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse> {
            self.requested.lock().unwrap().push(url.clone());
            Ok(FetchResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    fn resolver_for(body: &str) -> (SearchResolver, Arc<StaticPage>) {
        let page = Arc::new(StaticPage {
            body: body.to_string(),
            requested: Mutex::new(Vec::new()),
        });
        (SearchResolver::new(page.clone(), &EngineConfig::default()), page)
    }

    fn page(body: &str) -> String {
        format!("<html><body>{}</body></html>", body)
    }

    #[tokio::test]
    async fn test_fallback_pass_finds_app_link() {
        let (resolver, _) = resolver_for(&page(
            r#"<nav><a href="/about">About us</a></nav><a href="/android/sample-app">Sample App</a>"#,
        ));
        let results = resolver.search("sample").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Sample App");
        assert_eq!(
            results[0].url.as_str(),
            "https://www.example-catalog.tld/android/sample-app"
        );
    }

    #[tokio::test]
    async fn test_query_is_encoded_into_search_url() {
        let (resolver, fetcher) = resolver_for(&page(""));
        let results = resolver.search("  Cámara Pro! ").await.unwrap();
        assert!(results.is_empty());
        let requested = fetcher.requested.lock().unwrap();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].path(), "/search");
        let q: Vec<(String, String)> = requested[0].query_pairs().into_owned().collect();
        assert_eq!(q, vec![("q".to_string(), "cámara pro".to_string())]);
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let page = Arc::new(StaticPage {
            body: String::new(),
            requested: Mutex::new(Vec::new()),
        });
        let config = EngineConfig {
            base_url: Url::parse("https://www.example-catalog.tld/es").unwrap(),
            ..EngineConfig::default()
        };
        let resolver = SearchResolver::new(page.clone(), &config);
        resolver.search("vlc").await.unwrap();
        assert_eq!(page.requested.lock().unwrap()[0].path(), "/es/search");
    }

    #[tokio::test]
    async fn test_invalid_query_never_fetches() {
        let (resolver, fetcher) = resolver_for(&page(""));
        assert!(matches!(resolver.search("w").await, Err(EngineError::Validation(_))));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_first_strategy_wins_without_merging() {
        let (resolver, _) = resolver_for("");
        let html = Html::parse_document(&page(
            r#"<div class="name"><a href="/android/vlc">VLC</a></div>
               <article><a href="/android/mpv">MPV</a></article>"#,
        ));
        let base = Url::parse("https://www.example-catalog.tld/search?q=player").unwrap();
        let results = resolver.extract_results(&html, &base);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "VLC");
    }

    #[test]
    fn test_falls_through_when_strategy_has_no_valid_candidates() {
        let (resolver, _) = resolver_for("");
        let html = Html::parse_document(&page(
            r#"<div class="name"><a href="https://evil.tld/android/vlc">VLC</a></div>
               <div class="name"><a href="/android/x">X</a></div>
               <article><a href="/android/mpv">MPV</a></article>"#,
        ));
        let base = Url::parse("https://www.example-catalog.tld/search?q=player").unwrap();
        let results = resolver.extract_results(&html, &base);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "MPV");
    }

    #[test]
    fn test_results_are_capped_deduplicated_and_truncated() {
        let (resolver, _) = resolver_for("");
        let long_name = "N".repeat(150);
        let mut body = format!(r#"<article><a href="/android/long">{}</a></article>"#, long_name);
        body.push_str(r#"<article><a href="/android/long#reviews">Again</a></article>"#);
        for i in 0..10 {
            body.push_str(&format!(r#"<article><a href="/android/app-{i}">App {i}</a></article>"#));
        }
        let html = Html::parse_document(&page(&body));
        let base = Url::parse("https://www.example-catalog.tld/search?q=app").unwrap();
        let results = resolver.extract_results(&html, &base);

        // Only the first eight nodes are scanned; one is a duplicate.
        assert_eq!(results.len(), 7);
        assert_eq!(results[0].name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(results[0].raw_label.len(), 150);
        assert_eq!(results[1].name, "App 0");
    }
}
