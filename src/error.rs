//! Error taxonomy shared by every module
//!
//! Module errors map onto an [`ErrorKind`] so a UI can render a structured
//! [`ErrorReport`] instead of raw error text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a failure, independent of the module that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Profiling fell back to a looser type; never fatal
    ProfilingDegraded,
    /// A relationship scored below the threshold and was dropped; never fatal
    RelationshipLowConfidence,
    ConnectionUnavailable,
    PoolExhausted,
    TableCreationFailed,
    ChunkInsertFailed,
    InvalidSource,
    Cancelled,
    Configuration,
    Database,
    Verification,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProfilingDegraded => "profiling_degraded",
            ErrorKind::RelationshipLowConfidence => "relationship_low_confidence",
            ErrorKind::ConnectionUnavailable => "connection_unavailable",
            ErrorKind::PoolExhausted => "pool_exhausted",
            ErrorKind::TableCreationFailed => "table_creation_failed",
            ErrorKind::ChunkInsertFailed => "chunk_insert_failed",
            ErrorKind::InvalidSource => "invalid_source",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Database => "database",
            ErrorKind::Verification => "verification",
        }
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::PoolExhausted | ErrorKind::ChunkInsertFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured, serializable description of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorReport {
    /// Split a `user_message()` text into message and `Hint:` line
    pub fn new(kind: ErrorKind, user_message: &str) -> Self {
        match user_message.split_once("\n\nHint: ") {
            Some((message, hint)) => Self {
                kind,
                message: message.to_string(),
                hint: Some(hint.to_string()),
            },
            None => Self {
                kind,
                message: user_message.to_string(),
                hint: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_splits_hint() {
        let report = ErrorReport::new(
            ErrorKind::PoolExhausted,
            "No connection available.\n\nHint: Raise the pool size.",
        );
        assert_eq!(report.message, "No connection available.");
        assert_eq!(report.hint.as_deref(), Some("Raise the pool size."));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "poolExhausted");
    }

    #[test]
    fn test_report_without_hint() {
        let report = ErrorReport::new(ErrorKind::Database, "boom");
        assert_eq!(report.hint, None);
        assert!(!serde_json::to_string(&report).unwrap().contains("hint"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::PoolExhausted.is_retryable());
        assert!(!ErrorKind::ConnectionUnavailable.is_retryable());
    }
}
