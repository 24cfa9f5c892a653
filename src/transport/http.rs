//! HTTP request/response transport.
//!
//! Serves three things on one listener:
//! - `POST /call` taking the `{tool, arguments}` envelope and answering with
//!   the ToolResult JSON
//! - `GET /tools` and `GET /health`
//! - MCP streamable HTTP in stateless mode at the MCP endpoint, where every
//!   POST is self-contained

use crate::error::DbResult;
use crate::mcp::DbService;
use crate::models::{ToolCall, ToolResult};
use crate::tools::ToolRegistry;
use crate::transport::{Transport, health, mount_mcp, serve_http};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::Value as JsonValue;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// Error shown for bodies that are not a `{tool, arguments}` object.
pub const INVALID_REQUEST: &str = "invalid request";

/// HTTP transport implementation.
pub struct HttpTransport {
    registry: ToolRegistry,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `registry` - Tool registry every request is dispatched through
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
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
                stateful_mode: false,
                ..Default::default()
            },
        );

        let app = Router::new()
            .route("/call", post(call_tool))
            .route("/tools", get(list_tools))
            .route("/health", get(health))
            .with_state(self.registry.clone());

        mount_mcp(app, &self.endpoint, mcp)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(
            endpoint = %self.endpoint,
            "Starting MCP server with HTTP transport on {}",
            bind_addr
        );
        serve_http(self.name(), &bind_addr, self.router(), &self.registry).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// `POST /call`
async fn call_tool(State(registry): State<ToolRegistry>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("http_call", request_id = %request_id);

    let mut response = async move {
        let call = match parse_envelope(&body) {
            Some(call) => call,
            None => {
                debug!(bytes = body.len(), "Rejected malformed request body");
                return json_response(StatusCode::BAD_REQUEST, &ToolResult::failure(INVALID_REQUEST));
            }
        };
        let result = registry.dispatch(call).await;
        json_response(StatusCode::OK, &result)
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// `GET /tools`
async fn list_tools(State(registry): State<ToolRegistry>) -> Response {
    Json(registry.descriptors()).into_response()
}

/// Decode the envelope. Anything that is not an object with a string `tool` is malformed.
fn parse_envelope(body: &[u8]) -> Option<ToolCall> {
    match serde_json::from_slice::<JsonValue>(body) {
        Ok(value @ JsonValue::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn json_response(status: StatusCode, result: &ToolResult) -> Response {
    match result.to_json() {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render tool result");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope() {
        let call = parse_envelope(br#"{"tool":"run_query","arguments":{"sql":"SELECT 1"}}"#)
            .unwrap();
        assert_eq!(call.tool, "run_query");
        assert_eq!(call.arguments, json!({"sql": "SELECT 1"}));
    }

    #[test]
    fn test_parse_envelope_without_arguments() {
        let call = parse_envelope(br#"{"tool":"list_tables"}"#).unwrap();
        assert!(call.arguments.is_null());
    }

    #[test]
    fn test_parse_envelope_rejects_non_objects() {
        assert!(parse_envelope(b"[1,2]").is_none());
        assert!(parse_envelope(b"\"run_query\"").is_none());
        assert!(parse_envelope(b"not json").is_none());
        assert!(parse_envelope(br#"{"arguments":{}}"#).is_none());
        assert!(parse_envelope(br#"{"tool":7}"#).is_none());
    }
}
