//! Error types for the MySQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! The `Display` form of each variant is exactly what a client sees in the
//! `error` field of a failed tool result, so messages stay short and stable.

use thiserror::Error;

/// MySQL error numbers that mean the session is gone rather than the statement being wrong.
///
/// 1053 server shutdown in progress, 1927 connection killed, 2006 server has gone away,
/// 2013 lost connection during query, 4031 disconnected by the server because of inactivity.
const CONNECTION_LOST_ERRNOS: &[u16] = &[1053, 1927, 2006, 2013, 4031];

#[derive(Error, Debug)]
pub enum DbError {
    #[error("connection error: {message}")]
    Connection { message: String, suggestion: String },

    #[error("query error: {message}")]
    Query {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    /// The read-only gate refused the statement. The reason is shown verbatim.
    #[error("{reason}")]
    Denied { reason: String },

    #[error("invalid arguments")]
    InvalidArguments { detail: String },

    #[error("unknown tool")]
    UnknownTool { name: String },

    #[error("query error: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a classification denial.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    /// Create an invalid arguments error. The detail is logged, never returned to clients.
    pub fn invalid_arguments(detail: impl Into<String>) -> Self {
        Self::InvalidArguments {
            detail: detail.into(),
        }
    }

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Timeout { .. } => {
                Some("Consider increasing --query-timeout or narrowing the query")
            }
            _ => None,
        }
    }

    /// True when the failure means the session is unusable and a reconnect may help.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// True for failures detected before anything was sent to the database.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Denied { .. } | Self::InvalidArguments { .. } | Self::UnknownTool { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let errno = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                if errno.is_some_and(|n| CONNECTION_LOST_ERRNOS.contains(&n)) {
                    return DbError::connection(
                        db_err.message(),
                        "The server closed the session; it will be re-established",
                    );
                }
                let code = db_err.code().map(|c| c.to_string());
                DbError::query(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection acquire", 0),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => {
                DbError::connection("Database worker crashed", "Reconnect to the database")
            }
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for protocol-level failures.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        if err.is_rejection() {
            rmcp::ErrorData::invalid_params(err.to_string(), data)
        } else {
            rmcp::ErrorData::internal_error(err.to_string(), data)
        }
    }
}
