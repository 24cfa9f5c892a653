//! Session retry macro.
//!
//! The body of a connection-manager operation is written once and expanded
//! twice: once against the current session and, after a lost connection,
//! once more against a freshly opened one.

/// Run `$call` against the managed session, reconnecting and retrying once
/// when a previously healthy session turns out to be lost.
///
/// Expands inside a `ConnectionManager` method returning `DbResult<_>`.
///
/// # Example
///
/// ```ignore
/// with_session!(self, "list_databases", |session| session.list_databases())
/// ```
macro_rules! with_session {
    ($manager:expr, $operation:expr, |$session:ident| $call:expr) => {{
        let manager = $manager;
        let mut slot = manager.session.lock().await;
        let (mut $session, fresh) = match slot.take() {
            Some(existing) => (existing, false),
            None => (manager.open().await?, true),
        };

        let result = manager.bounded($operation, $call).await;
        match result {
            Err(e) if e.is_connection_lost() && !fresh => {
                tracing::warn!(
                    operation = $operation,
                    error = %e,
                    "Connection lost, reconnecting once"
                );
                drop($session);
                let mut $session = manager.open().await?;
                let retried = manager.bounded($operation, $call).await;
                if $crate::db::manager::keeps_session(&retried) {
                    *slot = Some($session);
                }
                retried
            }
            settled => {
                if $crate::db::manager::keeps_session(&settled) {
                    *slot = Some($session);
                }
                settled
            }
        }
    }};
}
