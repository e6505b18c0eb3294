use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::EngineConfig;
use crate::domain::DomainValidator;
use crate::error::{EngineError, Result};
use crate::extract::{self, DOWNLOAD_STRATEGIES};
use crate::fetch::Fetch;

/// Finds the direct download link on an app's download sub-page.
#[derive(Clone)]
pub struct DownloadResolver {
    fetcher: Arc<dyn Fetch>,
    validator: DomainValidator,
    timeout: Duration,
}

impl DownloadResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, config: &EngineConfig) -> Self {
        Self {
            fetcher,
            validator: DomainValidator::new(&config.allowed_hosts, true),
            timeout: config.download_timeout,
        }
    }

    /// Validates `app_url` and maps it to its `/download` sub-page.
    pub fn download_page(&self, app_url: &str) -> Result<Url> {
        let parsed = Url::parse(app_url.trim())
            .map_err(|_| EngineError::validation("invalid app URL"))?;
        if !self.validator.is_allowed_url(&parsed) {
            return Err(EngineError::validation("URL is not a catalog app page"));
        }
        Ok(to_download_page(parsed))
    }

    /// `Ok(None)` means the page was fetched but carried no acceptable link.
    pub async fn resolve(&self, app_url: &str) -> Result<Option<Url>> {
        let page = self.download_page(app_url)?;
        self.resolve_page(&page).await
    }

    pub async fn resolve_page(&self, page: &Url) -> Result<Option<Url>> {
        info!("Resolving download link from: {}", page);
        let response = self.fetcher.get(page, self.timeout).await?;
        let document = extract::parse_document(page, &response.body)?;
        let link = self.extract_link(&document, page);
        match &link {
            Some(url) => info!("Download link found: {}", url),
            None => info!("No download link on {}", page),
        }
        Ok(link)
    }

    /// Links back to the fetched page or its app page are navigation, not
    /// downloads, and are skipped.
    pub fn extract_link(&self, document: &Html, page: &Url) -> Option<Url> {
        let page_path = page.path().trim_end_matches('/');
        let app_path = page_path.trim_end_matches("/download");
        for strategy in DOWNLOAD_STRATEGIES {
            for href in strategy.candidates(document) {
                let Ok(mut url) = page.join(&href) else {
                    continue;
                };
                url.set_fragment(None);
                let path = url.path().trim_end_matches('/');
                if url.host_str() == page.host_str() && (path == page_path || path == app_path) {
                    debug!("strategy '{}' skipped self link {}", strategy.name, url);
                    continue;
                }
                if self.validator.is_allowed_url(&url) {
                    debug!("strategy '{}' produced {}", strategy.name, url);
                    return Some(url);
                }
                debug!("strategy '{}' candidate rejected: {}", strategy.name, url);
            }
        }
        None
    }
}

fn to_download_page(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path().trim_end_matches('/').to_string();
    if path.ends_with("/download") {
        url.set_path(&path);
    } else {
        url.set_path(&format!("{}/download", path));
    }
    url
}

/// File name a transport can offer for the link, e.g. `sample-app.apk`.
pub fn suggested_file_name(app_url: &str) -> Option<String> {
    let url = Url::parse(app_url).ok()?;
    let slug = url
        .path_segments()?
        .filter(|s| !s.is_empty() && *s != "download")
        .last()?;
    Some(format!("{}.apk", slug))
}
