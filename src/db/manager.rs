//! Single-connection manager with one reconnect-and-retry.
//!
//! The process owns exactly one database session. It lives behind an async
//! mutex so only one operation talks to MySQL at a time, and it is opened
//! lazily: eagerly at startup, then again on the first use after a failure.
//!
//! When an operation fails because the session was lost (server restart,
//! `wait_timeout`, network reset), the session is discarded and the operation
//! is retried exactly once on a fresh session. A session opened for the
//! current call is never retried, so a server that is down costs one connect
//! attempt per call.

use crate::error::{DbError, DbResult};
use crate::models::{TableRef, TabularResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// An open database session.
#[async_trait]
pub trait Session: Send + Sized + 'static {
    /// Non-system databases, ordered by name.
    async fn list_databases(&mut self) -> DbResult<Vec<String>>;

    /// Tables of the selected database, or of every non-system schema.
    async fn list_tables(&mut self) -> DbResult<Vec<TableRef>>;

    /// Run one statement that the classifier already allowed.
    async fn fetch(&mut self, sql: &str) -> DbResult<TabularResult>;

    /// Close the session gracefully.
    async fn close(self) -> DbResult<()>;
}

/// Opens sessions. One connector per configured server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    async fn connect(&self) -> DbResult<Self::Session>;

    /// `host:port/database` for log lines. Never contains credentials.
    fn target(&self) -> String;
}

/// The database operations tools are built on.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_databases(&self) -> DbResult<Vec<String>>;

    async fn list_tables(&self) -> DbResult<Vec<TableRef>>;

    /// Execute a statement. Callers must have classified it as read-only.
    async fn execute(&self, sql: &str) -> DbResult<TabularResult>;

    /// Release the underlying connection on shutdown.
    async fn close(&self) {}
}

/// Owns the process-wide session.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    session: Mutex<Option<C::Session>>,
    query_timeout: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, query_timeout: Duration) -> Self {
        Self {
            connector,
            session: Mutex::new(None),
            query_timeout,
        }
    }

    /// Open the session now instead of on first use.
    pub async fn connect(&self) -> DbResult<()> {
        let mut slot = self.session.lock().await;
        if slot.is_none() {
            *slot = Some(self.open().await?);
        }
        Ok(())
    }

    /// Whether a session is currently held.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Close the session, if any. The next operation reconnects.
    pub async fn close(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            match session.close().await {
                Ok(()) => info!(target_db = %self.connector.target(), "Database connection closed"),
                Err(e) => debug!(error = %e, "Error while closing database connection"),
            }
        }
    }

    async fn open(&self) -> DbResult<C::Session> {
        let target = self.connector.target();
        debug!(target_db = %target, "Opening database connection");
        let session = self.connector.connect().await?;
        info!(target_db = %target, "Connected to MySQL");
        Ok(session)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = DbResult<T>>,
    ) -> DbResult<T> {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(operation, self.query_timeout.as_secs())),
        }
    }
}

/// Whether a session that produced `result` may be reused.
///
/// Lost sessions are gone, and a timed-out session may still be streaming the
/// abandoned result set.
pub(crate) fn keeps_session<T>(result: &DbResult<T>) -> bool {
    !matches!(
        result,
        Err(e) if e.is_connection_lost() || matches!(e, DbError::Timeout { .. })
    )
}

#[async_trait]
impl<C: Connector> Backend for ConnectionManager<C> {
    async fn list_databases(&self) -> DbResult<Vec<String>> {
        with_session!(self, "list_databases", |session| session.list_databases())
    }

    async fn list_tables(&self) -> DbResult<Vec<TableRef>> {
        with_session!(self, "list_tables", |session| session.list_tables())
    }

    async fn execute(&self, sql: &str) -> DbResult<TabularResult> {
        debug!(sql = %sql, "Executing query");
        with_session!(self, "query execution", |session| session.fetch(sql))
    }

    async fn close(&self) {
        ConnectionManager::close(self).await
    }
}
