//! Configuration for chunked imports

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when a chunk still fails after all retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Abort the job
    #[default]
    FailFast,
    /// Count the chunk's rows as failed and keep importing
    Skip,
}

/// Configuration for the import pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Rows per chunk
    pub chunk_size: usize,

    /// Concurrent insert workers, never more than the pool capacity
    pub max_workers: usize,

    /// Chunks accumulated before they are handed to the workers
    pub chunks_per_dispatch: usize,

    /// Rows per insert statement batch; each batch commits on its own
    pub insert_batch_size: usize,

    /// Leading rows profiled when no schema is supplied
    pub sample_rows: usize,

    /// Create the target table before importing
    pub create_table: bool,

    /// Drop (after backing up) an existing table of the same name
    pub replace_existing: bool,

    /// Retries per chunk after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry, doubled for every further one
    pub retry_base_delay_ms: u64,

    pub failure_policy: FailurePolicy,

    /// Re-count rows after the import
    pub verify: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            max_workers: 2,
            chunks_per_dispatch: 2,
            insert_batch_size: 500,
            sample_rows: 1000,
            create_table: true,
            replace_existing: false,
            max_retries: 3,
            retry_base_delay_ms: 100,
            failure_policy: FailurePolicy::FailFast,
            verify: true,
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }

    /// Check the sizes the pipeline divides rows by
    ///
    /// Deserialized configs skip the builder's clamping, so the pipeline checks
    /// this before reading any rows.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("chunkSize", self.chunk_size),
            ("maxWorkers", self.max_workers),
            ("chunksPerDispatch", self.chunks_per_dispatch),
            ("insertBatchSize", self.insert_batch_size),
            ("sampleRows", self.sample_rows),
        ] {
            if value == 0 {
                return Err(format!("{name} must be at least 1"));
            }
        }
        Ok(())
    }

    /// Backoff before retry number `attempt` (0 for the first retry)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(1 << attempt.min(16)))
    }
}

/// Builder for [`ImportConfig`]
#[derive(Debug, Default)]
pub struct ImportConfigBuilder {
    config: ImportConfig,
}

impl ImportConfigBuilder {
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.config.chunk_size = rows.max(1);
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers.max(1);
        self
    }

    pub fn chunks_per_dispatch(mut self, chunks: usize) -> Self {
        self.config.chunks_per_dispatch = chunks.max(1);
        self
    }

    pub fn insert_batch_size(mut self, rows: usize) -> Self {
        self.config.insert_batch_size = rows.max(1);
        self
    }

    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.config.sample_rows = rows.max(1);
        self
    }

    pub fn create_table(mut self, create: bool) -> Self {
        self.config.create_table = create;
        self
    }

    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.config.replace_existing = replace;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.config.verify = verify;
        self
    }

    pub fn build(self) -> ImportConfig {
        self.config
    }
}
