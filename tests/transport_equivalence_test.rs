//! Tests that the plain HTTP routes and the MCP service render a call identically.
//!
//! The `POST /call` body, the text content of `DbService::call` and the
//! registry's own rendering must be the same bytes for the same call. The
//! JSON-RPC framing of each transport is covered in `mcp_transport_test.rs`.

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mysql_mcp_server::db::Backend;
use mysql_mcp_server::error::DbResult;
use mysql_mcp_server::mcp::{DbService, to_call_tool_result};
use mysql_mcp_server::models::{TableRef, TabularResult, ToolCall};
use mysql_mcp_server::tools::ToolRegistry;
use mysql_mcp_server::transport::{HttpTransport, SseTransport};
use rmcp::model::RawContent;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedBackend;

#[async_trait]
impl Backend for FixedBackend {
    async fn list_databases(&self) -> DbResult<Vec<String>> {
        Ok(vec!["shop".into()])
    }

    async fn list_tables(&self) -> DbResult<Vec<TableRef>> {
        Ok(vec![TableRef::new("shop", "orders")])
    }

    async fn execute(&self, _sql: &str) -> DbResult<TabularResult> {
        Ok(TabularResult::new(
            vec!["id".into(), "name".into(), "price".into()],
            vec![
                vec![json!(1), json!("pen"), json!("1.50")],
                vec![json!(2), json!(null), json!("10.00")],
            ],
        ))
    }
}

fn registry() -> ToolRegistry {
    ToolRegistry::new(Arc::new(FixedBackend))
}

fn http_router() -> axum::Router {
    HttpTransport::new(registry(), "127.0.0.1", 0, "/mcp").router()
}

async fn post_call(body: impl Into<Body>) -> (StatusCode, Option<String>, String) {
    let response = http_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/call")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, request_id, String::from_utf8(bytes.to_vec()).unwrap())
}

fn mcp_text(result: &rmcp::model::CallToolResult) -> String {
    match &result.content[0].raw {
        RawContent::Text(text) => text.text.clone(),
        other => panic!("expected text content, got {:?}", other),
    }
}

fn calls() -> Vec<(&'static str, Value)> {
    vec![
        ("list_databases", json!({})),
        ("list_tables", json!({})),
        ("run_query", json!({"sql": "SELECT id, name, price FROM products"})),
        ("run_query", json!({"sql": "SELECT 1; DROP TABLE users"})),
        ("run_query", json!({"sql": "DELETE FROM products"})),
        ("run_query", json!({})),
        ("no_such_tool", json!({})),
    ]
}

/// Test that POST /call, MCP tool calls and the registry agree byte for byte.
#[tokio::test]
async fn test_transports_render_identically() {
    let registry = registry();
    let service = DbService::new(registry.clone());

    for (tool, arguments) in calls() {
        let expected = registry
            .dispatch(ToolCall::new(tool, arguments.clone()))
            .await
            .to_json()
            .unwrap();

        let envelope = json!({"tool": tool, "arguments": arguments}).to_string();
        let (status, _, http_body) = post_call(envelope).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(http_body, expected, "{} over HTTP", tool);

        let arguments = arguments.as_object().cloned();
        let mcp = service
            .call(ToolCall::from_mcp(tool, arguments))
            .await
            .unwrap();
        assert_eq!(mcp_text(&mcp), expected, "{} over MCP", tool);
        assert_eq!(mcp.is_error, Some(!expected.starts_with(r#"{"ok":true"#)));
    }
}

/// Test the rendering helper directly against a stored result.
#[tokio::test]
async fn test_call_tool_result_rendering() {
    let result = registry()
        .dispatch(ToolCall::new("run_query", json!({"sql": "UPDATE t SET a = 1"})))
        .await;
    let rendered = to_call_tool_result(&result).unwrap();
    assert_eq!(rendered.is_error, Some(true));
    assert_eq!(
        mcp_text(&rendered),
        r#"{"ok":false,"error":"mutating statement rejected: UPDATE"}"#
    );
}

/// Test the HTTP success payload and its request id header.
#[tokio::test]
async fn test_http_call_payload() {
    let (status, request_id, body) =
        post_call(r#"{"tool":"run_query","arguments":{"sql":"SELECT * FROM products"}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(request_id.is_some());
    assert_eq!(
        body,
        r#"{"ok":true,"result":{"columns":["id","name","price"],"rows":[[1,"pen","1.50"],[2,null,"10.00"]]}}"#
    );
}

/// Test that the envelope may omit arguments for the listing tools.
#[tokio::test]
async fn test_http_call_without_arguments() {
    let (status, _, body) = post_call(r#"{"tool":"list_databases"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"ok":true,"result":{"columns":["database"],"rows":[["shop"]]}}"#
    );
}

/// Test that malformed envelopes are a 400 with a ToolResult body.
#[tokio::test]
async fn test_http_malformed_envelope() {
    for body in ["not json", "[]", r#""list_tables""#, r#"{"arguments":{}}"#, ""] {
        let (status, _, response) = post_call(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{:?}", body);
        assert_eq!(response, r#"{"ok":false,"error":"invalid request"}"#);
    }
}

/// Test the health endpoint on both HTTP transports.
#[tokio::test]
async fn test_health() {
    let sse = SseTransport::new(registry(), "127.0.0.1", 0, "/mcp").router();
    for router in [http_router(), sse] {
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }
}

/// Test the tool listing endpoint.
#[tokio::test]
async fn test_tools_endpoint() {
    let response = http_router()
        .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let tools: Value = serde_json::from_slice(&bytes).unwrap();
    let names: Vec<_> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["list_databases", "list_tables", "run_query"]);
}
