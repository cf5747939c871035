//! Error types for schema operations

use std::path::PathBuf;

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::error::{ErrorKind, ErrorReport};

/// Errors that can occur while materializing schemas
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Connection or pool failure before any table was touched
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Creating one table failed
    #[error("Failed to create table '{table}': {message}")]
    TableCreation { table: String, message: String },

    /// Nothing to create
    #[error("No table schemas supplied")]
    Empty,
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Connection(e) => e.kind(),
            SchemaError::TableCreation { .. } => ErrorKind::TableCreationFailed,
            SchemaError::Empty => ErrorKind::InvalidSource,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SchemaError::Connection(e) => e.user_message(),
            SchemaError::TableCreation { table, message } => format!(
                "Failed to create table '{table}': {message}\n\n\
                Hint: Check that the generated DDL is valid for the target database and that \
                the user may create tables."
            ),
            SchemaError::Empty => {
                "No table schemas supplied.\n\nHint: Profile at least one table first.".to_string()
            }
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), &self.user_message())
    }
}

/// Errors raised by generation-history sinks
#[derive(Error, Debug)]
pub enum HistoryError {
    /// IO error with path context
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing history is not a JSON array of records
    #[error("Corrupt history file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the history
    #[error("History lock poisoned")]
    Poisoned,
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    pub fn user_message(&self) -> String {
        match self {
            HistoryError::Io { path, .. } => format!(
                "{self}\n\nHint: Check that {} is writable.",
                path.display()
            ),
            HistoryError::Corrupt { path, .. } => format!(
                "{self}\n\nHint: Move {} aside to start a fresh history.",
                path.display()
            ),
            HistoryError::Json(_) | HistoryError::Poisoned => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_creation_kind() {
        let err = SchemaError::TableCreation {
            table: "orders".to_string(),
            message: "syntax error".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::TableCreationFailed);
        let report = err.report();
        assert_eq!(report.message, "Failed to create table 'orders': syntax error");
        assert!(report.hint.is_some());
    }

    #[test]
    fn test_connection_kind_passes_through() {
        let err = SchemaError::from(ConnectionError::PoolClosed);
        assert_eq!(err.kind(), ConnectionError::PoolClosed.kind());
    }
}
