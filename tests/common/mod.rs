//! Test helpers shared by the integration suites

use app_locator::error::{EngineError, Result};
use app_locator::fetch::{Fetch, FetchResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// In-memory catalog: serves canned bodies by path, 404 for anything else.
#[derive(Default)]
pub struct FakeCatalog {
    pages: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, path: &str, body: &str) -> Self {
        self.set_page(path, body);
        self
    }

    pub fn set_page(&self, path: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(path.to_string(), body.to_string());
    }

    pub fn remove_page(&self, path: &str) {
        self.pages.lock().unwrap().remove(path);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for FakeCatalog {
    async fn get(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().unwrap().get(url.path()) {
            Some(body) => Ok(FetchResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Err(EngineError::network(url, Some(404), "HTTP 404")),
        }
    }
}

/// Wraps body markup in a minimal HTML document.
#[allow(dead_code)]
pub fn create_test_html(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Catalog</title></head>
<body>
{}
</body>
</html>"#,
        body
    )
}

#[allow(dead_code)]
pub fn search_page() -> String {
    create_test_html(
        r#"<div class="name"><a href="/android/vlc">VLC for Android</a></div>
           <div class="name"><a href="/android/vlc-remote">VLC Remote</a></div>
           <div class="name"><a href="https://evil.tld/android/vlc">Fake VLC</a></div>"#,
    )
}

#[allow(dead_code)]
pub fn download_page() -> String {
    create_test_html(
        r#"<h1>VLC for Android</h1>
           <button id="detail-download-button" data-url="/dwn/vlc-3-5-4">Download</button>"#,
    )
}
