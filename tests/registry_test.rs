//! Integration tests for tool dispatch.
//!
//! A recording backend stands in for MySQL so the tests can check both the
//! exact wire output and which statements actually reached the database.

use async_trait::async_trait;
use mysql_mcp_server::db::Backend;
use mysql_mcp_server::error::{DbError, DbResult};
use mysql_mcp_server::models::{TableRef, TabularResult, ToolCall};
use mysql_mcp_server::tools::ToolRegistry;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingBackend {
    executed: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn list_databases(&self) -> DbResult<Vec<String>> {
        Ok(vec!["analytics".into(), "shop".into()])
    }

    async fn list_tables(&self) -> DbResult<Vec<TableRef>> {
        Ok(vec![
            TableRef::new("analytics", "events"),
            TableRef::new("shop", "orders"),
        ])
    }

    async fn execute(&self, sql: &str) -> DbResult<TabularResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        if sql.contains("missing_table") {
            return Err(DbError::query(
                "Table 'shop.missing_table' doesn't exist",
                Some("42S02".into()),
            ));
        }
        Ok(TabularResult::new(vec!["1".into()], vec![vec![json!(1)]]))
    }
}

fn setup() -> (Arc<RecordingBackend>, ToolRegistry) {
    let backend = Arc::new(RecordingBackend::default());
    let registry = ToolRegistry::new(backend.clone());
    (backend, registry)
}

async fn wire(registry: &ToolRegistry, tool: &str, arguments: serde_json::Value) -> String {
    registry
        .dispatch(ToolCall::new(tool, arguments))
        .await
        .to_json()
        .unwrap()
}

/// Test the success payload of a trivial SELECT.
#[tokio::test]
async fn test_select_one_wire_format() {
    let (backend, registry) = setup();
    assert_eq!(
        wire(&registry, "run_query", json!({"sql": "SELECT 1"})).await,
        r#"{"ok":true,"result":{"columns":["1"],"rows":[[1]]}}"#
    );
    assert_eq!(backend.executed(), vec!["SELECT 1"]);
}

/// Test that a mutating statement is denied without touching the database.
#[tokio::test]
async fn test_drop_denied_before_execution() {
    let (backend, registry) = setup();
    assert_eq!(
        wire(&registry, "run_query", json!({"sql": "DROP TABLE users"})).await,
        r#"{"ok":false,"error":"mutating statement rejected: DROP"}"#
    );
    assert!(backend.executed().is_empty());
}

/// Test that stacked queries are denied without touching the database.
#[tokio::test]
async fn test_stacked_query_denied_before_execution() {
    let (backend, registry) = setup();
    assert_eq!(
        wire(
            &registry,
            "run_query",
            json!({"sql": "SELECT 1; DROP TABLE users"})
        )
        .await,
        r#"{"ok":false,"error":"multiple statements rejected"}"#
    );
    assert!(backend.executed().is_empty());
}

/// Test that an empty statement is reported as such.
#[tokio::test]
async fn test_empty_sql() {
    let (backend, registry) = setup();
    assert_eq!(
        wire(&registry, "run_query", json!({"sql": "   "})).await,
        r#"{"ok":false,"error":"empty query"}"#
    );
    assert!(backend.executed().is_empty());
}

/// Test that the surrounding whitespace is trimmed before execution.
#[tokio::test]
async fn test_sql_trimmed_before_execution() {
    let (backend, registry) = setup();
    let result = registry
        .dispatch(ToolCall::new("run_query", json!({"sql": "\n  SELECT 1;  \n"})))
        .await;
    assert!(result.ok);
    assert_eq!(backend.executed(), vec!["SELECT 1;"]);
}

/// Test that `query` is accepted as an alias of `sql`.
#[tokio::test]
async fn test_query_alias() {
    let (backend, registry) = setup();
    let result = registry
        .dispatch(ToolCall::new("run_query", json!({"query": "SELECT 1"})))
        .await;
    assert!(result.ok);
    assert_eq!(backend.executed(), vec!["SELECT 1"]);
}

/// Test unknown tool names.
#[tokio::test]
async fn test_unknown_tool() {
    let (_, registry) = setup();
    for name in ["drop_database", "", "List_Databases"] {
        assert_eq!(
            wire(&registry, name, json!({})).await,
            r#"{"ok":false,"error":"unknown tool"}"#
        );
    }
}

/// Test invalid argument shapes.
#[tokio::test]
async fn test_invalid_arguments() {
    let (backend, registry) = setup();
    for arguments in [
        json!({}),
        json!({"sql": 42}),
        json!({"sql": null}),
        json!("SELECT 1"),
        json!([1, 2]),
    ] {
        assert_eq!(
            wire(&registry, "run_query", arguments.clone()).await,
            r#"{"ok":false,"error":"invalid arguments"}"#,
            "{}",
            arguments
        );
    }
    assert!(backend.executed().is_empty());
}

/// Test that the listing tools tolerate missing or extra arguments.
#[tokio::test]
async fn test_listing_tools_ignore_arguments() {
    let (_, registry) = setup();
    for arguments in [json!(null), json!({}), json!({"database": "shop"})] {
        let result = registry
            .dispatch(ToolCall::new("list_databases", arguments))
            .await;
        assert!(result.ok);
    }
}

/// Test the list_databases payload and that repeated calls agree.
#[tokio::test]
async fn test_list_databases_idempotent() {
    let (_, registry) = setup();
    let first = wire(&registry, "list_databases", json!({})).await;
    let second = wire(&registry, "list_databases", json!({})).await;
    assert_eq!(
        first,
        r#"{"ok":true,"result":{"columns":["database"],"rows":[["analytics"],["shop"]]}}"#
    );
    assert_eq!(first, second);
}

/// Test the list_tables payload and that repeated calls agree.
#[tokio::test]
async fn test_list_tables_idempotent() {
    let (_, registry) = setup();
    let first = wire(&registry, "list_tables", json!({})).await;
    let second = wire(&registry, "list_tables", json!({})).await;
    assert_eq!(
        first,
        r#"{"ok":true,"result":{"columns":["schema","table"],"rows":[["analytics","events"],["shop","orders"]]}}"#
    );
    assert_eq!(first, second);
}

/// Test that database errors surface as query errors.
#[tokio::test]
async fn test_query_error_passthrough() {
    let (_, registry) = setup();
    assert_eq!(
        wire(
            &registry,
            "run_query",
            json!({"sql": "SELECT * FROM missing_table"})
        )
        .await,
        r#"{"ok":false,"error":"query error: Table 'shop.missing_table' doesn't exist"}"#
    );
}

/// Test the tool descriptors.
#[test]
fn test_descriptors() {
    let (_, registry) = setup();
    let descriptors = serde_json::to_value(registry.descriptors()).unwrap();
    let tools = descriptors.as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[2]["name"], "run_query");
    assert!(tools[2]["inputSchema"]["properties"]["sql"].is_object());
    assert!(tools.iter().all(|t| t["description"].is_string()));
}
