//! MCP tool implementations.
//!
//! This module contains the tool layer:
//! - `classifier`: read-only gate for `run_query`
//! - `registry`: dispatch of tool calls onto the database backend

pub mod classifier;
pub mod registry;

pub use classifier::{classify, ensure_read_only};
pub use registry::ToolRegistry;
