//! Error types for connection operations

use std::fmt::Write as _;
use std::time::Duration;

use thiserror::Error;

use super::pool::ConnectionAttempt;
use crate::error::{ErrorKind, ErrorReport};

/// Errors raised while connecting, pooling or talking to the database
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Every connection variant failed
    #[error("Could not connect after {} attempt(s): {}", .attempts.len(), summarize(.attempts))]
    Unavailable { attempts: Vec<ConnectionAttempt> },

    /// No pooled connection became free in time
    #[error("Connection pool exhausted after waiting {0:?}")]
    PoolExhausted(Duration),

    /// The pool was disposed
    #[error("Connection pool is closed")]
    PoolClosed,

    /// Pool construction or bookkeeping failed
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// A single connection attempt exceeded its timeout
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),

    /// Backend has no way to address this variant
    #[error("Unsupported connection variant: {0}")]
    Unsupported(String),

    /// Backend error while executing a statement
    #[error("Database error: {0}")]
    Database(String),

    /// A statement violated a key, unique, not-null or check constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Result type for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

fn summarize(attempts: &[ConnectionAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.label, a.error.as_deref().unwrap_or("ok")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::Unavailable { .. }
            | ConnectionError::Timeout(_)
            | ConnectionError::Unsupported(_) => ErrorKind::ConnectionUnavailable,
            ConnectionError::PoolExhausted(_) => ErrorKind::PoolExhausted,
            ConnectionError::PoolClosed | ConnectionError::Pool(_) => ErrorKind::Configuration,
            ConnectionError::Database(_) | ConnectionError::Constraint(_) => ErrorKind::Database,
        }
    }

    /// Whether repeating the same statement could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ConnectionError::Constraint(_)
                | ConnectionError::Unsupported(_)
                | ConnectionError::PoolClosed
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ConnectionError::Unavailable { attempts } => {
                let mut msg = format!("Connection failed after {} attempt(s):", attempts.len());
                for attempt in attempts {
                    let _ = write!(
                        msg,
                        "\n  - {}: {} ({} ms)",
                        attempt.label,
                        attempt.error.as_deref().unwrap_or("ok"),
                        attempt.elapsed_ms
                    );
                }
                msg.push_str(
                    "\n\nHint: Verify host/port, that the server is running and that a driver for \
                     the selected backend is compiled in.",
                );
                msg
            }
            ConnectionError::PoolExhausted(waited) => format!(
                "No pooled connection became available within {waited:?}.\n\n\
                Hint: Retry later, or raise the pool size/overflow or lower the worker count."
            ),
            ConnectionError::PoolClosed => {
                "The connection pool has been disposed.\n\nHint: Create a new pool manager."
                    .to_string()
            }
            ConnectionError::Unsupported(what) => format!(
                "Unsupported connection variant: {what}\n\nHint: Use host/port addressing for this backend."
            ),
            _ => self.to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), &self.user_message())
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for ConnectionError {
    fn from(err: duckdb::Error) -> Self {
        let message = err.to_string();
        if message.to_ascii_lowercase().contains("constraint") {
            ConnectionError::Constraint(message)
        } else {
            ConnectionError::Database(message)
        }
    }
}

#[cfg(feature = "postgres-backend")]
impl From<tokio_postgres::Error> for ConnectionError {
    fn from(err: tokio_postgres::Error) -> Self {
        // SQLSTATE class 23: integrity constraint violation
        match err.code() {
            Some(state) if state.code().starts_with("23") => {
                ConnectionError::Constraint(err.to_string())
            }
            _ => ConnectionError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_lists_attempts() {
        let err = ConnectionError::Unavailable {
            attempts: vec![
                ConnectionAttempt {
                    label: "default instance".to_string(),
                    error: Some("refused".to_string()),
                    elapsed_ms: 3,
                },
                ConnectionAttempt {
                    label: "standard port".to_string(),
                    error: Some("refused".to_string()),
                    elapsed_ms: 4,
                },
            ],
        };
        assert_eq!(err.kind(), ErrorKind::ConnectionUnavailable);
        assert!(err.to_string().starts_with("Could not connect after 2 attempt(s)"));

        let report = err.report();
        assert!(report.message.contains("  - standard port: refused (4 ms)"));
        assert!(report.hint.unwrap().contains("host/port"));
    }

    #[test]
    fn test_constraint_errors_are_not_retried() {
        let err = ConnectionError::Constraint("duplicate key \"1.0\"".to_string());
        assert_eq!(err.kind(), ErrorKind::Database);
        assert!(!err.is_retryable());
        assert!(ConnectionError::Database("connection reset".to_string()).is_retryable());
        assert!(ConnectionError::PoolExhausted(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_pool_exhausted_kind() {
        let err = ConnectionError::PoolExhausted(Duration::from_secs(30));
        assert_eq!(err.kind(), ErrorKind::PoolExhausted);
        assert!(err.user_message().contains("Hint:"));
    }
}
