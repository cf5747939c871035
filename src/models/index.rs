//! Index suggestion model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of index to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    Regular,
    Composite,
}

/// Urgency of an index suggestion, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl IndexPriority {
    /// Critical and high suggestions are created during materialization
    pub fn is_auto_created(&self) -> bool {
        matches!(self, IndexPriority::Critical | IndexPriority::High)
    }
}

impl fmt::Display for IndexPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPriority::Critical => write!(f, "critical"),
            IndexPriority::High => write!(f, "high"),
            IndexPriority::Medium => write!(f, "medium"),
            IndexPriority::Low => write!(f, "low"),
        }
    }
}

/// A proposed index on a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSuggestion {
    pub kind: IndexKind,
    pub columns: Vec<String>,
    pub name: String,
    pub rationale: String,
    pub priority: IndexPriority,
}

impl IndexSuggestion {
    /// Whether this suggestion touches the column
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}
