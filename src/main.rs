use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use app_locator::config::{env_u64, SWEEP_INTERVAL};
use app_locator::{server, spawn_sweeper, AppState, Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::from_env();
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let sweep_every = env_u64("SWEEP_INTERVAL_SECS")
        .map(Duration::from_secs)
        .unwrap_or(SWEEP_INTERVAL);

    info!("Starting app-locator");
    info!("Catalog URL: {}", config.base_url);

    let state = AppState::new(Engine::with_http(config)?);
    let _sweeper = spawn_sweeper(state.engine.clone(), Duration::from_secs(10), sweep_every);

    let app = server::router(std::sync::Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("app-locator listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
