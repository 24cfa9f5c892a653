//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations:
//! - Stdio: MCP over standard input/output for CLI integration
//! - HTTP: plain `POST /call` request/response plus stateless MCP
//! - SSE: stateful MCP sessions over a long-lived HTTP event stream
//!
//! Every transport hands calls to the same [`ToolRegistry`], so a given call
//! produces the same ToolResult JSON whichever way it arrived.

pub mod http;
pub mod sse;
pub mod stdio;

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::tools::ToolRegistry;
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Trait for MCP transport implementations.
///
/// Transports handle the low-level communication between the MCP server
/// and clients, abstracting away the protocol details.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Graceful shutdown budget for in-flight HTTP calls and open event streams.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// `GET /health`
pub(crate) async fn health() -> &'static str {
    "OK"
}

/// Mount an rmcp service at `endpoint`.
///
/// `nest_service` doesn't support the root path "/", so that case uses a fallback.
pub(crate) fn mount_mcp(
    router: Router,
    endpoint: &str,
    service: StreamableHttpService<DbService, LocalSessionManager>,
) -> Router {
    if endpoint == "/" {
        router.fallback_service(service)
    } else {
        router.nest_service(endpoint, service)
    }
}

/// Serve `app` on `bind_addr` until a shutdown signal, then close the database connection.
pub(crate) async fn serve_http(
    name: &'static str,
    bind_addr: &str,
    app: Router,
    registry: &ToolRegistry,
) -> DbResult<()> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
        DbError::internal(format!("Failed to bind to {}: {}", bind_addr, e))
    })?;

    info!(transport = name, addr = %bind_addr, "Listening");

    // Use a notify to coordinate shutdown timing
    let shutdown_notify = Arc::new(tokio::sync::Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    let shutdown_signal = async move {
        wait_for_signal().await;
        shutdown_notify_clone.notify_one();
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

    // Event streams may keep the server alive indefinitely, so once shutdown
    // starts we race the drain against a timeout and a second signal.
    tokio::select! {
        result = server => {
            match result {
                Ok(()) => info!(transport = name, "HTTP server stopped"),
                Err(e) => {
                    error!(error = %e, "HTTP server error");
                    registry.close().await;
                    return Err(DbError::internal(format!("HTTP server error: {}", e)));
                }
            }
        }
        _ = async {
            shutdown_notify.notified().await;
            info!(
                timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                "Waiting for connections to close (send signal again to force exit)..."
            );

            tokio::select! {
                _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                    warn!("Graceful shutdown timeout, forcing exit");
                }
                _ = wait_for_signal() => {
                    warn!("Received second signal, forcing immediate exit");
                }
            }
        } => {}
    }

    registry.close().await;
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// If a handler cannot be installed that signal is simply never observed.
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
