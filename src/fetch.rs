use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{EngineError, Result};

/// User agents for rotation
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANG: &str = "en-US,en;q=0.5";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Single outbound GET. Implementations never retry.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse>;
}

/// Which User-Agent to present on each request.
#[derive(Debug, Clone)]
pub enum Identity {
    /// Random pick from [`USER_AGENTS`] per request.
    Rotating,
    Fixed(String),
}

impl Identity {
    fn user_agent(&self) -> &str {
        match self {
            Identity::Rotating => {
                let index = rand::thread_rng().gen_range(0..USER_AGENTS.len());
                USER_AGENTS[index]
            }
            Identity::Fixed(ua) => ua.as_str(),
        }
    }
}

/// reqwest-backed fetcher presenting browser-like headers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    identity: Identity,
}

impl HttpFetcher {
    pub fn new() -> reqwest::Result<Self> {
        Self::with_identity(Identity::Rotating)
    }

    pub fn with_identity(identity: Identity) -> reqwest::Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, identity })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse> {
        let user_agent = self.identity.user_agent();
        debug!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANG)
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                EngineError::network(url, e.status().map(|s| s.as_u16()), describe(&e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered with status {}", url, status);
            return Err(EngineError::network(
                url,
                Some(status.as_u16()),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EngineError::network(url, Some(status.as_u16()), describe(&e)))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_identity_is_stable() {
        let identity = Identity::Fixed("test-agent/1.0".to_string());
        assert_eq!(identity.user_agent(), "test-agent/1.0");
        assert_eq!(identity.user_agent(), "test-agent/1.0");
    }

    #[test]
    fn test_rotating_identity_draws_from_pool() {
        let identity = Identity::Rotating;
        for _ in 0..20 {
            let ua = identity.user_agent();
            assert!(USER_AGENTS.iter().any(|candidate| *candidate == ua));
        }
    }
}
