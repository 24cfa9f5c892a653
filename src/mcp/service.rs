//! MCP service implementation using rmcp.
//!
//! The tool set is the closed [`ToolName`] enum, so `tools/list` and
//! `tools/call` are implemented by hand on top of the [`ToolRegistry`] instead
//! of through rmcp's tool router. A call result carries the canonical
//! ToolResult JSON as a single text item and sets `isError` when it failed.

use crate::models::{ToolCall, ToolName, ToolResult};
use crate::tools::ToolRegistry;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool as McpTool,
    },
    service::RequestContext,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct DbService {
    registry: ToolRegistry,
}

impl DbService {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Tool definitions as advertised by `tools/list`.
    pub fn tools() -> Vec<McpTool> {
        ToolName::ALL
            .iter()
            .map(|name| {
                McpTool::new(
                    name.as_str(),
                    name.description(),
                    Arc::new(name.input_schema()),
                )
            })
            .collect()
    }

    /// Handle one MCP tool call through the registry.
    pub async fn call(&self, call: ToolCall) -> Result<CallToolResult, McpError> {
        let result = self.registry.dispatch(call).await;
        to_call_tool_result(&result)
    }
}

/// Render a ToolResult the way every MCP transport returns it.
pub fn to_call_tool_result(result: &ToolResult) -> Result<CallToolResult, McpError> {
    let payload = result.to_json().map_err(McpError::from)?;
    let content = vec![Content::text(payload)];
    Ok(if result.ok {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    })
}

impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mysql-mcp-server".to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to a MySQL server.\n\
                \n\
                ## Workflow\n\
                1. Call `list_databases` to see the available databases\n\
                2. Call `list_tables` to see (schema, table) pairs\n\
                3. Call `run_query` with a single SELECT, SHOW, DESCRIBE, EXPLAIN or WITH ... SELECT\n\
                \n\
                ## Results\n\
                Every tool returns JSON `{\"ok\": true, \"result\": {\"columns\": [...], \"rows\": [[...]]}}`\n\
                or `{\"ok\": false, \"error\": \"...\"}`.\n\
                Statements that modify data, multiple statements and MySQL executable comments are rejected."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "MCP tools/call");
        self.call(ToolCall::from_mcp(&request.name, request.arguments))
            .await
    }
}
