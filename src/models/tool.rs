//! Tool-call envelope and tool definitions.
//!
//! A [`ToolCall`] is the transport-independent request `{tool, arguments}`;
//! resolving it yields the closed [`Tool`] enum or a validation error.
//! A [`ToolResult`] is the transport-independent response.

use crate::error::{DbError, DbResult};
use crate::models::TabularResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Names of the tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListDatabases,
    ListTables,
    RunQuery,
}

impl ToolName {
    /// Every tool, in the order they are listed to clients.
    pub const ALL: [ToolName; 3] = [Self::ListDatabases, Self::ListTables, Self::RunQuery];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListDatabases => "list_databases",
            Self::ListTables => "list_tables",
            Self::RunQuery => "run_query",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ListDatabases => {
                "List all databases on the MySQL server (system schemas excluded)."
            }
            Self::ListTables => {
                "List all tables in the connected database as (schema, table) rows."
            }
            Self::RunQuery => {
                "Run a read-only SQL query on MySQL.\nOnly a single SELECT, SHOW, DESCRIBE, EXPLAIN or WITH ... SELECT statement is accepted."
            }
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn input_schema(&self) -> serde_json::Map<String, JsonValue> {
        match self {
            Self::ListDatabases | Self::ListTables => schema_object::<NoArguments>(),
            Self::RunQuery => schema_object::<RunQueryArgs>(),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.as_str(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DbError::unknown_tool(s))
    }
}

fn schema_object<T: JsonSchema>() -> serde_json::Map<String, JsonValue> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(JsonValue::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Arguments of tools that take none.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoArguments {}

/// Arguments of the run_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunQueryArgs {
    /// SQL query to execute (read-only). Exactly one statement; a trailing semicolon is allowed.
    #[serde(alias = "query")]
    pub sql: String,
}

/// Tool name, description and argument schema as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Map<String, JsonValue>,
}

/// A resolved tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    ListDatabases,
    ListTables,
    RunQuery { sql: String },
}

impl Tool {
    pub fn name(&self) -> ToolName {
        match self {
            Self::ListDatabases => ToolName::ListDatabases,
            Self::ListTables => ToolName::ListTables,
            Self::RunQuery { .. } => ToolName::RunQuery,
        }
    }
}

/// The wire envelope `{tool, arguments}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }

    /// Build a call from an MCP `tools/call` request.
    pub fn from_mcp(name: &str, arguments: Option<serde_json::Map<String, JsonValue>>) -> Self {
        Self::new(name, arguments.map(JsonValue::Object).unwrap_or_default())
    }

    /// Resolve the envelope into a typed tool.
    ///
    /// Missing arguments (`null`) count as an empty object; anything other than an
    /// object is rejected.
    pub fn resolve(&self) -> DbResult<Tool> {
        let name: ToolName = self.tool.parse()?;
        let arguments = match &self.arguments {
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            JsonValue::Object(_) => self.arguments.clone(),
            other => {
                return Err(DbError::invalid_arguments(format!(
                    "arguments must be an object, got {}",
                    json_type_name(other)
                )));
            }
        };

        match name {
            ToolName::ListDatabases => Ok(Tool::ListDatabases),
            ToolName::ListTables => Ok(Tool::ListTables),
            ToolName::RunQuery => {
                let args: RunQueryArgs = serde_json::from_value(arguments)
                    .map_err(|e| DbError::invalid_arguments(e.to_string()))?;
                Ok(Tool::RunQuery { sql: args.sql })
            }
        }
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// The wire response `{ok, result}` or `{ok, error}`.
///
/// Every transport renders it with [`ToolResult::to_json`], so identical calls
/// produce identical bytes whichever way they arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TabularResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(result: TabularResult) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn from_error(err: &DbError) -> Self {
        Self::failure(err.to_string())
    }

    /// Serialize to the canonical compact JSON form.
    pub fn to_json(&self) -> DbResult<String> {
        serde_json::to_string(self)
            .map_err(|e| DbError::internal(format!("Failed to serialize tool result: {}", e)))
    }
}

impl From<DbResult<TabularResult>> for ToolResult {
    fn from(result: DbResult<TabularResult>) -> Self {
        match result {
            Ok(table) => Self::success(table),
            Err(e) => Self::from_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_name_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_tool_name() {
        let err = "drop_everything".parse::<ToolName>().unwrap_err();
        assert_eq!(err.to_string(), "unknown tool");
    }

    #[test]
    fn test_resolve_run_query() {
        let call = ToolCall::new("run_query", json!({"sql": "SELECT 1"}));
        assert_eq!(
            call.resolve().unwrap(),
            Tool::RunQuery {
                sql: "SELECT 1".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_accepts_query_alias() {
        let call = ToolCall::new("run_query", json!({"query": "SHOW TABLES"}));
        assert_eq!(call.resolve().unwrap().name(), ToolName::RunQuery);
    }

    #[test]
    fn test_resolve_missing_sql_is_invalid() {
        let call = ToolCall::new("run_query", json!({}));
        let err = call.resolve().unwrap_err();
        assert!(matches!(err, DbError::InvalidArguments { .. }));
    }

    #[test]
    fn test_resolve_non_string_sql_is_invalid() {
        let call = ToolCall::new("run_query", json!({"sql": 42}));
        assert!(matches!(
            call.resolve().unwrap_err(),
            DbError::InvalidArguments { .. }
        ));
    }

    #[test]
    fn test_resolve_non_object_arguments_is_invalid() {
        let call = ToolCall::new("list_tables", json!(["x"]));
        assert!(matches!(
            call.resolve().unwrap_err(),
            DbError::InvalidArguments { .. }
        ));
    }

    #[test]
    fn test_resolve_null_arguments_for_listing() {
        let call = ToolCall::new("list_databases", JsonValue::Null);
        assert_eq!(call.resolve().unwrap(), Tool::ListDatabases);
    }

    #[test]
    fn test_envelope_without_arguments_deserializes() {
        let call: ToolCall = serde_json::from_str(r#"{"tool":"list_tables"}"#).unwrap();
        assert_eq!(call.resolve().unwrap(), Tool::ListTables);
    }

    #[test]
    fn test_tool_result_wire_form() {
        let ok = ToolResult::success(TabularResult::new(
            vec!["1".to_string()],
            vec![vec![json!(1)]],
        ));
        assert_eq!(
            ok.to_json().unwrap(),
            r#"{"ok":true,"result":{"columns":["1"],"rows":[[1]]}}"#
        );

        let failed = ToolResult::failure("multiple statements rejected");
        assert_eq!(
            failed.to_json().unwrap(),
            r#"{"ok":false,"error":"multiple statements rejected"}"#
        );
    }

    #[test]
    fn test_run_query_schema_requires_sql() {
        let schema = ToolName::RunQuery.input_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].get("sql").is_some());
        assert_eq!(schema["required"], json!(["sql"]));
    }

    #[test]
    fn test_descriptor_serializes_input_schema_key() {
        let value = serde_json::to_value(ToolName::ListTables.descriptor()).unwrap();
        assert_eq!(value["name"], "list_tables");
        assert!(value.get("inputSchema").is_some());
    }
}
