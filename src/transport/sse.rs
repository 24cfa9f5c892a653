//! HTTP event-stream transport.
//!
//! MCP streamable HTTP in stateful mode: a client opens a session and many
//! calls are multiplexed over its event stream. Each result carries the
//! JSON-RPC id of its originating call, so pipelined calls stay correlated.

use crate::error::DbResult;
use crate::mcp::DbService;
use crate::tools::ToolRegistry;
use crate::transport::{Transport, health, mount_mcp, serve_http};
use axum::Router;
use axum::routing::get;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tracing::info;

/// Event-stream transport implementation.
///
/// This transport provides:
/// - HTTP endpoints for MCP protocol messages
/// - Server-Sent Events for streaming responses
/// - Session management for stateful connections
pub struct SseTransport {
    registry: ToolRegistry,
    host: String,
    port: u16,
    endpoint: String,
}

impl SseTransport {
    pub fn new(
        registry: ToolRegistry,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the axum router served by this transport.
    pub fn router(&self) -> Router {
        let registry = self.registry.clone();
        let mcp = StreamableHttpService::new(
            move || Ok(DbService::new(registry.clone())),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: true,
                ..Default::default()
            },
        );

        let app = Router::new().route("/health", get(health));
        mount_mcp(app, &self.endpoint, mcp)
    }
}

impl Transport for SseTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(
            endpoint = %self.endpoint,
            "Starting MCP server with event-stream transport on {}",
            bind_addr
        );
        serve_http(self.name(), &bind_addr, self.router(), &self.registry).await
    }

    fn name(&self) -> &'static str {
        "sse"
    }
}
