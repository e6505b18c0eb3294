pub mod cache;
pub mod config;
pub mod domain;
pub mod download;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mcp;
pub mod query;
pub mod rate_limit;
pub mod search;
pub mod server;
pub mod stdio_service;
pub mod types;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use types::*;

/// Shared state handed to every transport handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            started_at: Utc::now(),
        }
    }
}

/// Periodically clears expired cache entries. The first sweep runs after
/// `first`, then every `every`.
pub fn spawn_sweeper(engine: Arc<Engine>, first: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + first;
        let mut ticker = tokio::time::interval_at(start, every.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let removed = engine.sweep_expired();
            info!("Periodic sweep done ({} expired entries)", removed);
        }
    })
}
