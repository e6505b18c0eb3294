use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::download::suggested_file_name;
use crate::mcp;
use crate::types::*;
use crate::{AppState, EngineError};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", post(search_handler))
        .route("/download", post(download_handler))
        .route("/stats", get(stats_handler))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Keep-alive endpoint for hosting platforms that idle out silent processes.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let now = Utc::now();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "app-locator",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now.to_rfc3339(),
        "uptime_secs": (now - state.started_at).num_seconds(),
    }))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    match state.engine.search_cached(request.user_id, &request.query).await {
        Ok(outcome) => Ok(Json(SearchResponse {
            query: request.query,
            from_cache: outcome.from_cache,
            results: outcome.results,
        })),
        Err(e) => Err(api_error(&e)),
    }
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>, ApiError> {
    match state.engine.resolve_download(&request.app_url).await {
        Ok(link) => {
            let file_name = link.as_ref().and_then(|_| suggested_file_name(&request.app_url));
            Ok(Json(DownloadResponse {
                download_url: link.map(|u| u.to_string()),
                file_name,
                app_url: request.app_url,
            }))
        }
        Err(e) => Err(api_error(&e)),
    }
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.engine.cache_stats();
    Json(StatsResponse {
        cached_searches: stats.cached_search_count,
        cached_downloads: stats.cached_download_count,
        active_users: state.engine.active_user_count(),
    })
}

fn api_error(e: &EngineError) -> ApiError {
    let status = match e {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        EngineError::Network { .. } | EngineError::Parse { .. } => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: mcp::user_message(e),
        }),
    )
}
