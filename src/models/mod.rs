//! Data models for the MySQL MCP Server.
//!
//! This module contains all data structures used for:
//! - Tool-call envelopes and tool results
//! - Query classification and tabular results
//! - Schema introspection

pub mod query;
pub mod schema;
pub mod tool;

pub use query::{QueryClassification, TabularResult, Verdict};
pub use schema::TableRef;
pub use tool::{
    NoArguments, RunQueryArgs, Tool, ToolCall, ToolDescriptor, ToolName, ToolResult,
};
