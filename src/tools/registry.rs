//! Tool dispatch.
//!
//! The registry turns a [`ToolCall`] into exactly one [`ToolResult`]. It is
//! the only capability transports depend on: stdio, HTTP and the event stream
//! all deliver calls here and render whatever comes back.

use crate::db::Backend;
use crate::error::DbResult;
use crate::models::{TableRef, TabularResult, Tool, ToolCall, ToolDescriptor, ToolName, ToolResult};
use crate::tools::classifier;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DATABASES_COLUMN: &str = "database";
pub const TABLE_COLUMNS: [&str; 2] = ["schema", "table"];

/// Maps tool calls onto the database backend.
#[derive(Clone)]
pub struct ToolRegistry {
    backend: Arc<dyn Backend>,
}

impl ToolRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Release the database connection. Called once by the transport on shutdown.
    pub async fn close(&self) {
        info!("Closing database connection");
        self.backend.close().await;
    }

    /// Descriptors of every tool, in listing order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        ToolName::ALL.iter().map(ToolName::descriptor).collect()
    }

    /// Handle one call. Never fails: every error becomes an `ok: false` result.
    pub async fn dispatch(&self, call: ToolCall) -> ToolResult {
        let start = Instant::now();
        let outcome = match call.resolve() {
            Ok(tool) => self.run(tool).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(table) => info!(
                tool = %call.tool,
                row_count = table.row_count(),
                elapsed_ms = elapsed_ms,
                "Tool call succeeded"
            ),
            Err(e) if e.is_rejection() => info!(
                tool = %call.tool,
                error = %e,
                detail = ?e,
                "Tool call rejected"
            ),
            Err(e) => warn!(
                tool = %call.tool,
                error = %e,
                elapsed_ms = elapsed_ms,
                "Tool call failed"
            ),
        }

        ToolResult::from(outcome)
    }

    /// Run a resolved tool.
    pub async fn run(&self, tool: Tool) -> DbResult<TabularResult> {
        match tool {
            Tool::ListDatabases => {
                let names = self.backend.list_databases().await?;
                Ok(TabularResult::single_column(DATABASES_COLUMN, names))
            }
            Tool::ListTables => {
                let tables = self.backend.list_tables().await?;
                Ok(tables_result(tables))
            }
            Tool::RunQuery { sql } => {
                debug!(sql = %sql, "Classifying query");
                classifier::ensure_read_only(&sql)?;
                self.backend.execute(sql.trim()).await
            }
        }
    }
}

fn tables_result(tables: Vec<TableRef>) -> TabularResult {
    TabularResult::new(
        TABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        tables
            .into_iter()
            .map(|t| vec![t.schema.into(), t.table.into()])
            .collect(),
    )
}
