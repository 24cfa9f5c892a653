//! MySQL MCP Server Library
//!
//! This library exposes a MySQL server to AI assistants as three MCP tools
//! (`list_databases`, `list_tables`, `run_query`) over stdio, plain HTTP or an
//! HTTP event stream. Queries pass a read-only classifier before they reach
//! the single managed connection.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
pub use tools::ToolRegistry;
