use crate::download::suggested_file_name;
use crate::types::*;
use crate::{AppState, Engine, EngineError};
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

/// Identity used for tool calls that do not name a user.
pub const ANONYMOUS_USER: UserId = 0;

const BUTTON_LABEL_CHARS: usize = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolsResponse {
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Text answer for a tool call. `is_error` marks engine failures that were
/// turned into a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),
}

/// Name, description and JSON schema of every tool, shared by both transports.
pub fn tool_definitions() -> Vec<McpTool> {
    vec![
        McpTool {
            name: "search_apps".to_string(),
            description: "Search the app catalog by name. Returns up to 8 app pages with their names and URLs.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "App name to look for (2-100 characters)"
                    },
                    "user_id": {
                        "type": "integer",
                        "description": "Caller identity used for rate limiting"
                    }
                },
                "required": ["query"]
            }),
        },
        McpTool {
            name: "resolve_download".to_string(),
            description: "Resolve a catalog app page URL (from search_apps) to its direct download link.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "app_url": {
                        "type": "string",
                        "description": "App page URL returned by search_apps"
                    }
                },
                "required": ["app_url"]
            }),
        },
        McpTool {
            name: "stats".to_string(),
            description: "Report cached searches, cached download links and active users.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Runs a tool against the engine and renders the outcome as text.
pub async fn dispatch(
    engine: &Engine,
    name: &str,
    arguments: &serde_json::Value,
) -> Result<ToolReply, ToolError> {
    match name {
        "search_apps" => {
            let query = arguments
                .get("query")
                .and_then(|v| v.as_str())
                .ok_or(ToolError::MissingParam("query"))?;
            let user = arguments
                .get("user_id")
                .and_then(|v| v.as_i64())
                .unwrap_or(ANONYMOUS_USER);

            Ok(match engine.search_cached(user, query).await {
                Ok(outcome) => ToolReply {
                    text: render_search(query, &outcome),
                    is_error: false,
                },
                Err(e) => failure("Search", &e),
            })
        }
        "resolve_download" => {
            let app_url = arguments
                .get("app_url")
                .and_then(|v| v.as_str())
                .ok_or(ToolError::MissingParam("app_url"))?;

            Ok(match engine.resolve_download(app_url).await {
                Ok(link) => ToolReply {
                    text: render_download(app_url, link.as_ref()),
                    is_error: false,
                },
                Err(e) => failure("Download", &e),
            })
        }
        "stats" => Ok(ToolReply {
            text: render_stats(&engine.cache_stats(), engine.active_user_count()),
            is_error: false,
        }),
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn failure(what: &str, e: &EngineError) -> ToolReply {
    error!("{} tool error: {}", what, e);
    ToolReply {
        text: user_message(e),
        is_error: true,
    }
}

/// The only place engine errors become user-facing text.
pub fn user_message(e: &EngineError) -> String {
    match e {
        EngineError::Validation(msg) => format!("Invalid input: {}", msg),
        EngineError::RateLimited => "Rate limit exceeded. Please wait 1 minute.".to_string(),
        EngineError::Network { .. } => {
            "The catalog site could not be reached. Please try again later.".to_string()
        }
        EngineError::Parse { .. } => {
            "The catalog page could not be read. Please try again later.".to_string()
        }
    }
}

/// Shortens an app name to fit a button, e.g. in a chat keyboard.
pub fn button_label(name: &str) -> String {
    if name.chars().count() <= BUTTON_LABEL_CHARS {
        name.to_string()
    } else {
        let head: String = name.chars().take(BUTTON_LABEL_CHARS - 3).collect();
        format!("{}...", head)
    }
}

pub fn render_search(query: &str, outcome: &SearchOutcome) -> String {
    if outcome.results.is_empty() {
        return format!("No apps found for: {}", query);
    }
    let cache_note = if outcome.from_cache { " (cache)" } else { "" };
    let mut text = format!("Results for '{}'{}:\n\n", query, cache_note);
    for (i, result) in outcome.results.iter().enumerate() {
        text.push_str(&format!(
            "{}. **{}**\n   URL: {}\n",
            i + 1,
            button_label(&result.name),
            result.url
        ));
    }
    text
}

pub fn render_download(app_url: &str, link: Option<&Url>) -> String {
    match link {
        Some(url) => {
            let file = suggested_file_name(app_url).unwrap_or_else(|| "app.apk".to_string());
            format!("Download link for {}:\n{}\nFile: {}", app_url, url, file)
        }
        None => format!("No download link found for {}", app_url),
    }
}

pub fn render_stats(stats: &CacheStats, active_users: usize) -> String {
    format!(
        "**Statistics**\nActive users: {}\nCached searches: {}\nCached download links: {}",
        active_users, stats.cached_search_count, stats.cached_download_count
    )
}

pub async fn list_tools() -> Json<McpToolsResponse> {
    Json(McpToolsResponse {
        tools: tool_definitions(),
    })
}

pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Result<Json<McpCallResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

    match dispatch(&state.engine, &request.name, &request.arguments).await {
        Ok(reply) => Ok(Json(McpCallResponse {
            content: vec![McpContent {
                content_type: "text".to_string(),
                text: reply.text,
            }],
            is_error: reply.is_error,
        })),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
