//! Database access layer.
//!
//! This module provides database access functionality:
//! - Single-connection management with reconnect-and-retry
//! - The MySQL session and connector
//! - Schema introspection
//! - Type mappings from MySQL values to JSON cells

#[macro_use]
mod macros;
pub mod manager;
pub mod mysql;
pub mod schema;
pub mod types;

pub use manager::{Backend, ConnectionManager, Connector, Session};
pub use mysql::{MySqlConnector, MySqlSession};

/// The connection manager used by the server binary.
pub type MySqlManager = ConnectionManager<MySqlConnector>;
