//! Error types for import jobs

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::SchemaError;

/// Errors that end an import job
#[derive(Error, Debug)]
pub enum ImportError {
    /// Source unreadable or empty
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid import configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A chunk failed on every attempt
    #[error(
        "Chunk {chunk} (rows {first_row}-{last_row}) failed after {attempts} attempt(s): {message}"
    )]
    ChunkInsert {
        chunk: usize,
        first_row: u64,
        last_row: u64,
        attempts: u32,
        /// Rows inserted by the job before it stopped
        inserted_rows: u64,
        message: String,
    },

    /// Row count after the import does not match the inserted rows
    #[error("Verification failed: expected {expected} new rows, found {found}")]
    Verification { expected: u64, found: u64 },

    #[error("Import cancelled after {inserted_rows} rows")]
    Cancelled { inserted_rows: u64 },

    /// A worker task panicked or was aborted
    #[error("Import worker failed: {0}")]
    Worker(String),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidSource(_) => ErrorKind::InvalidSource,
            ImportError::InvalidConfig(_) => ErrorKind::Configuration,
            ImportError::Connection(e) => e.kind(),
            ImportError::Schema(e) => e.kind(),
            ImportError::ChunkInsert { .. } | ImportError::Worker(_) => ErrorKind::ChunkInsertFailed,
            ImportError::Verification { .. } => ErrorKind::Verification,
            ImportError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ImportError::InvalidSource(reason) => format!(
                "Cannot import: {reason}\n\nHint: Check that the source has a header row and at least one data row."
            ),
            ImportError::InvalidConfig(_) => format!(
                "{self}\n\nHint: Build the config with ImportConfig::builder(), which clamps sizes to at least 1."
            ),
            ImportError::Connection(e) => e.user_message(),
            ImportError::Schema(e) => e.user_message(),
            ImportError::ChunkInsert {
                first_row,
                last_row,
                inserted_rows,
                ..
            } => format!(
                "{self}\n{inserted_rows} row(s) were inserted before the failure.\n\n\
                Hint: Inspect source rows {first_row}-{last_row}, or use the skip failure policy \
                to import the remaining rows."
            ),
            ImportError::Verification { .. } => format!(
                "{self}\n\nHint: Check whether another process writes to the table during imports."
            ),
            _ => self.to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), &self.user_message())
    }
}
