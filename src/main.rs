//! MySQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to run read-only queries against a MySQL server.

use clap::Parser;
use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db::{MySqlConnector, MySqlManager};
use mysql_mcp_server::tools::ToolRegistry;
use mysql_mcp_server::transport::{HttpTransport, SseTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_config = config.database()?;
    info!(target_db = %db_config.target(), user = %db_config.user, "Connecting to MySQL");

    let connector = MySqlConnector::new(&db_config, config.connect_timeout_duration())?;
    let manager = Arc::new(MySqlManager::new(
        connector,
        config.query_timeout_duration(),
    ));

    // A server we cannot reach at startup is a configuration error
    if let Err(e) = manager.connect().await {
        error!(error = %e, suggestion = ?e.suggestion(), "Failed to connect to MySQL");
        return Err(e.into());
    }

    let registry = ToolRegistry::new(manager);

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(registry).run().await,
        TransportMode::Http => {
            HttpTransport::new(registry, &config.host, config.port, &config.mcp_endpoint)
                .run()
                .await
        }
        TransportMode::Sse => {
            SseTransport::new(registry, &config.host, config.port, &config.mcp_endpoint)
                .run()
                .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
