use rmcp::{model::*, ServiceExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SWEEP_INTERVAL;
use crate::mcp::{self, ToolError};
use crate::{spawn_sweeper, AppState, Engine, EngineConfig};

#[derive(Clone)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub fn new() -> anyhow::Result<Self> {
        // stdout carries the protocol, so logs go to stderr
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();

        let config = EngineConfig::from_env();
        info!("Starting MCP Service");
        info!("Catalog URL: {}", config.base_url);

        let state = Arc::new(AppState::new(Engine::with_http(config)?));
        Ok(Self { state })
    }
}

impl rmcp::ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "app-locator".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Finds apps on the catalog site and resolves their direct download links. Call search_apps first, then resolve_download with one of the returned URLs.".to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _page: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = mcp::tool_definitions()
            .into_iter()
            .map(|t| Tool {
                name: Cow::Owned(t.name),
                description: Some(Cow::Owned(t.description)),
                input_schema: match t.input_schema {
                    serde_json::Value::Object(map) => Arc::new(map),
                    _ => Arc::new(serde_json::Map::new()),
                },
                output_schema: None,
                annotations: None,
            })
            .collect();

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

        let arguments = serde_json::Value::Object(request.arguments.clone().unwrap_or_default());
        match mcp::dispatch(&self.state.engine, request.name.as_ref(), &arguments).await {
            Ok(reply) if reply.is_error => Ok(CallToolResult::error(vec![Content::text(reply.text)])),
            Ok(reply) => Ok(CallToolResult::success(vec![Content::text(reply.text)])),
            Err(e @ ToolError::MissingParam(_)) => {
                Err(ErrorData::new(ErrorCode::INVALID_PARAMS, e.to_string(), None))
            }
            Err(e @ ToolError::UnknownTool(_)) => {
                Err(ErrorData::new(ErrorCode::METHOD_NOT_FOUND, e.to_string(), None))
            }
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let service = McpService::new()?;
    let _sweeper = spawn_sweeper(service.state.engine.clone(), Duration::from_secs(10), SWEEP_INTERVAL);
    // Use the stdio transport from rmcp
    let server = service.serve(rmcp::transport::stdio()).await?;
    info!("MCP stdio server running");
    let _quit_reason = server.waiting().await?;
    Ok(())
}
