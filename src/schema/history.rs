//! Generation history
//!
//! Every table-creation run appends one [`GenerationRecord`] to an injected
//! [`HistorySink`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::HistoryError;

/// One table-creation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub timestamp: DateTime<Utc>,
    pub created_tables: Vec<String>,
    pub failed_tables: Vec<String>,
    /// Seconds
    pub execution_time: f64,
    pub schemas_generated: usize,
    /// SHA-256 over the generated DDL
    pub schema_hash: String,
}

/// SHA-256 of DDL statements in the given order
pub fn schema_hash<'a>(statements: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for statement in statements {
        hasher.update(statement.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Append-only destination for generation records
pub trait HistorySink: Send + Sync {
    fn append(&self, record: GenerationRecord) -> Result<(), HistoryError>;

    /// All records, oldest first
    fn records(&self) -> Result<Vec<GenerationRecord>, HistoryError>;
}

/// History kept in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<GenerationRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistorySink for MemoryHistory {
    fn append(&self, record: GenerationRecord) -> Result<(), HistoryError> {
        self.records
            .lock()
            .map_err(|_| HistoryError::Poisoned)?
            .push(record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<GenerationRecord>, HistoryError> {
        let records = self.records.lock().map_err(|_| HistoryError::Poisoned)?;
        Ok(records.clone())
    }
}

/// History stored as a pretty-printed JSON array, rewritten on every append
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<GenerationRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&json).map_err(|source| HistoryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl HistorySink for JsonFileHistory {
    fn append(&self, record: GenerationRecord) -> Result<(), HistoryError> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        records.push(record);
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn records(&self) -> Result<Vec<GenerationRecord>, HistoryError> {
        let _guard = self.lock.lock();
        self.load()
    }
}
