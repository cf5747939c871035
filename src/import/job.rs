//! Import job state and reports

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::PoolStatus;
use crate::error::ErrorReport;

/// Lifecycle of an import job
///
/// States advance strictly in declaration order; any non-terminal state may
/// move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    Init,
    Validating,
    Profiling,
    SchemaReady,
    CreatingTable,
    Importing,
    Verifying,
    Completed,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::Init => "INIT",
            ImportState::Validating => "VALIDATING",
            ImportState::Profiling => "PROFILING",
            ImportState::SchemaReady => "SCHEMA_READY",
            ImportState::CreatingTable => "CREATING_TABLE",
            ImportState::Importing => "IMPORTING",
            ImportState::Verifying => "VERIFYING",
            ImportState::Completed => "COMPLETED",
            ImportState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed)
    }

    /// The state that follows on success, `None` for terminal states
    pub fn next(&self) -> Option<ImportState> {
        match self {
            ImportState::Init => Some(ImportState::Validating),
            ImportState::Validating => Some(ImportState::Profiling),
            ImportState::Profiling => Some(ImportState::SchemaReady),
            ImportState::SchemaReady => Some(ImportState::CreatingTable),
            ImportState::CreatingTable => Some(ImportState::Importing),
            ImportState::Importing => Some(ImportState::Verifying),
            ImportState::Verifying => Some(ImportState::Completed),
            ImportState::Completed | ImportState::Failed => None,
        }
    }

    pub fn can_transition_to(&self, next: ImportState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ImportState::Failed || self.next() == Some(next)
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a running or finished import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub table: String,
    pub state: ImportState,
    /// Rows read from the source so far; the full count once the source is exhausted
    pub source_row_count: u64,
    /// Rows read and cleaned
    pub processed_rows: u64,
    pub inserted_rows: u64,
    /// Rows of chunks that failed every attempt
    pub failed_rows: u64,
    /// Fully-empty rows dropped during cleaning
    pub skipped_rows: u64,
    pub chunks_completed: usize,
    /// Milliseconds spent in each state
    pub stages_elapsed: BTreeMap<ImportState, u64>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl ImportJob {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            table: table.into(),
            state: ImportState::Init,
            source_row_count: 0,
            processed_rows: 0,
            inserted_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            chunks_completed: 0,
            stages_elapsed: BTreeMap::new(),
            started_at: Utc::now(),
            error: None,
        }
    }

    /// Share of source rows inserted, when the source size is known
    pub fn progress(&self, expected_rows: Option<u64>) -> Option<f64> {
        expected_rows
            .filter(|n| *n > 0)
            .map(|n| (self.inserted_rows as f64 / n as f64).min(1.0))
    }
}

/// Final metrics of a completed import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub job: ImportJob,
    pub rows_per_second: f64,
    pub elapsed_ms: u64,
    /// Rows counted in the table after the import, minus rows present before it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_rows: Option<u64>,
    pub pool_status: PoolStatus,
    pub warnings: Vec<String>,
}

/// Times spent per state
#[derive(Debug)]
pub(crate) struct StageClock {
    entered: Instant,
    started: Instant,
}

impl StageClock {
    pub(crate) fn start() -> Self {
        let now = Instant::now();
        Self {
            entered: now,
            started: now,
        }
    }

    /// Move `job` to `next`, charging the time since the last transition to the current state
    pub(crate) fn transition(&mut self, job: &mut ImportJob, next: ImportState) {
        debug_assert!(job.state.can_transition_to(next), "{} -> {}", job.state, next);
        let now = Instant::now();
        let spent = now.duration_since(self.entered).as_millis() as u64;
        *job.stages_elapsed.entry(job.state).or_default() += spent;
        job.state = next;
        self.entered = now;
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub(crate) fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        let mut state = ImportState::Init;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            assert!(state.can_transition_to(next));
            state = next;
            seen.push(state);
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(state, ImportState::Completed);
        assert!(ImportState::Importing.can_transition_to(ImportState::Failed));
        assert!(!ImportState::Init.can_transition_to(ImportState::Importing));
        assert!(!ImportState::Completed.can_transition_to(ImportState::Failed));
    }

    #[test]
    fn test_stage_clock_records_each_state() {
        let mut job = ImportJob::new("t");
        let mut clock = StageClock::start();
        clock.transition(&mut job, ImportState::Validating);
        clock.transition(&mut job, ImportState::Failed);
        assert_eq!(job.state, ImportState::Failed);
        assert!(job.stages_elapsed.contains_key(&ImportState::Init));
        assert!(job.stages_elapsed.contains_key(&ImportState::Validating));
    }

    #[test]
    fn test_serialized_state_names() {
        let json = serde_json::to_string(&ImportState::SchemaReady).unwrap();
        assert_eq!(json, "\"SCHEMA_READY\"");
        let mut job = ImportJob::new("t");
        job.stages_elapsed.insert(ImportState::Importing, 12);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["stagesElapsed"]["IMPORTING"], 12);
    }

    #[test]
    fn test_progress() {
        let mut job = ImportJob::new("t");
        job.inserted_rows = 50;
        assert_eq!(job.progress(Some(200)), Some(0.25));
        assert_eq!(job.progress(None), None);
    }
}
