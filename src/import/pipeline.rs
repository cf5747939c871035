//! Chunked, concurrent import of a row stream into one table

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::clean::{ChunkCleaner, CleanStats};
use super::config::{FailurePolicy, ImportConfig};
use super::error::{ImportError, ImportResult};
use super::job::{ImportJob, ImportReport, ImportState, StageClock};
use super::source::RowSource;
use crate::connection::{ColumnBinding, ConnectionResult, DbConnection, PoolManager};
use crate::inference::clean_table_name;
use crate::models::{CellValue, RawTable, TableSchema};
use crate::schema::{CreateOptions, SchemaAssembler, SchemaError, TableStatus, materialize};

/// Streams row sources into tables through a connection pool
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use data_import_sdk::connection::{ConnectionConfig, PoolConfig, PoolManager};
/// use data_import_sdk::import::{ImportConfig, ImportPipeline, RowSource};
/// use data_import_sdk::models::CellValue;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = Arc::new(PoolManager::new(ConnectionConfig::duckdb_memory(), PoolConfig::default())?);
/// let rows = (0..10_000).map(|i| vec![CellValue::Int(i), format!("item {i}").into()]);
/// let source = RowSource::new(vec!["id".into(), "label".into()], rows);
///
/// let mut handle = ImportPipeline::new(pool, ImportConfig::default()).start(source, "items", None);
/// let report = handle.wait().await?;
/// assert_eq!(report.job.inserted_rows, 10_000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    pool: Arc<PoolManager>,
    config: ImportConfig,
    assembler: SchemaAssembler,
}

impl ImportPipeline {
    pub fn new(pool: Arc<PoolManager>, config: ImportConfig) -> Self {
        Self {
            pool,
            config,
            assembler: SchemaAssembler::new(),
        }
    }

    /// Use a custom assembler for profiling the leading sample
    pub fn with_assembler(mut self, assembler: SchemaAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Concurrent insert workers, bounded by the pool capacity
    pub fn worker_count(&self) -> usize {
        self.config.max_workers.min(self.pool.capacity()).max(1)
    }

    /// Start importing `source` into `table` on a background task
    ///
    /// Without a `schema` the leading rows are profiled to build one. Must be
    /// called from within a Tokio runtime.
    pub fn start(
        &self,
        source: RowSource,
        table: &str,
        schema: Option<TableSchema>,
    ) -> ImportHandle {
        let job = ImportJob::new(clean_table_name(table));
        let id = job.id;
        let (progress, receiver) = watch::channel(job.clone());
        let cancel = CancellationToken::new();
        let span = info_span!("import", job_id = %id, table = %job.table);

        let run = ImportRun {
            pool: self.pool.clone(),
            config: Arc::new(self.config.clone()),
            assembler: self.assembler.clone(),
            workers: self.worker_count(),
            cancel: cancel.clone(),
            progress,
            job,
            clock: StageClock::start(),
            stats: CleanStats::default(),
            warnings: Vec::new(),
        };
        let task = tokio::spawn(run.execute(source, schema).instrument(span));

        ImportHandle {
            id,
            progress: receiver,
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a running import
#[derive(Debug)]
pub struct ImportHandle {
    id: Uuid,
    progress: watch::Receiver<ImportJob>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ImportResult<ImportReport>>>,
}

impl ImportHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Latest snapshot of the job
    pub fn progress(&self) -> ImportJob {
        self.progress.borrow().clone()
    }

    /// Receiver notified on every progress update
    pub fn subscribe(&self) -> watch::Receiver<ImportJob> {
        self.progress.clone()
    }

    /// Request cancellation
    ///
    /// Takes effect before the next chunk is read or dispatched; chunks already
    /// being inserted finish first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the job to finish
    ///
    /// The final snapshot, including partial counts after a failure, stays
    /// available through [`progress`](Self::progress).
    pub async fn wait(&mut self) -> ImportResult<ImportReport> {
        let Some(task) = self.task.take() else {
            return Err(ImportError::Worker("import result was already taken".to_string()));
        };
        task.await
            .map_err(|e| ImportError::Worker(e.to_string()))?
    }
}

/// Rows of one chunk, already cleaned
#[derive(Debug)]
struct Chunk {
    index: usize,
    /// 1-based source row numbers, inclusive
    first_row: u64,
    last_row: u64,
    rows: Vec<Vec<CellValue>>,
}

#[derive(Debug)]
struct ChunkDone {
    index: usize,
    inserted: u64,
    attempts: u32,
}

#[derive(Debug)]
struct ChunkFailure {
    index: usize,
    first_row: u64,
    last_row: u64,
    /// Rows committed by earlier batches of the chunk
    inserted: u64,
    failed: u64,
    attempts: u32,
    message: String,
}

/// Shared by the insert workers
#[derive(Debug, Clone)]
struct InsertTarget {
    pool: Arc<PoolManager>,
    table: Arc<str>,
    columns: Arc<[ColumnBinding]>,
    config: Arc<ImportConfig>,
}

struct ImportRun {
    pool: Arc<PoolManager>,
    config: Arc<ImportConfig>,
    assembler: SchemaAssembler,
    workers: usize,
    cancel: CancellationToken,
    progress: watch::Sender<ImportJob>,
    job: ImportJob,
    clock: StageClock,
    stats: CleanStats,
    warnings: Vec<String>,
}

impl ImportRun {
    async fn execute(
        mut self,
        source: RowSource,
        schema: Option<TableSchema>,
    ) -> ImportResult<ImportReport> {
        info!(workers = self.workers, chunk_size = self.config.chunk_size, "Import started");
        match self.run(source, schema).await {
            Ok(verified_rows) => {
                self.advance(ImportState::Completed);
                let elapsed = self.clock.elapsed_secs();
                let report = ImportReport {
                    rows_per_second: if elapsed > 0.0 {
                        self.job.inserted_rows as f64 / elapsed
                    } else {
                        0.0
                    },
                    elapsed_ms: self.clock.elapsed_ms(),
                    verified_rows,
                    pool_status: self.pool.pool_status(),
                    warnings: self.warnings,
                    job: self.job,
                };
                info!(
                    rows = report.job.inserted_rows,
                    failed = report.job.failed_rows,
                    rows_per_second = report.rows_per_second,
                    elapsed_ms = report.elapsed_ms,
                    "Import completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, inserted = self.job.inserted_rows, "Import failed");
                self.job.error = Some(e.report());
                self.advance(ImportState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        mut source: RowSource,
        schema: Option<TableSchema>,
    ) -> ImportResult<Option<u64>> {
        self.advance(ImportState::Validating);
        self.config.validate().map_err(ImportError::InvalidConfig)?;
        if source.columns().is_empty() {
            return Err(ImportError::InvalidSource("the source has no columns".to_string()));
        }
        if !source.has_rows() {
            return Err(ImportError::InvalidSource("the source has no data rows".to_string()));
        }
        self.job.source_row_count = source.len_hint().unwrap_or(0);

        self.advance(ImportState::Profiling);
        let mut sampled = Vec::new();
        let mut schema = match schema {
            Some(schema) => schema,
            None => {
                let sample = RawTable::new(
                    source.columns().to_vec(),
                    source.take_rows(self.config.sample_rows),
                );
                let schema = self.assembler.analyze_table(&self.job.table, &sample);
                debug!(sample_rows = sample.row_count(), "Profiled leading sample");
                sampled = sample.rows;
                schema
            }
        };
        schema.name = self.job.table.clone();

        self.advance(ImportState::SchemaReady);
        info!(columns = schema.columns.len(), primary_keys = ?schema.primary_keys, "Schema ready");

        self.advance(ImportState::CreatingTable);
        if self.config.create_table {
            self.create_table(&schema).await?;
        }
        let baseline = if self.config.verify {
            let mut conn = self.pool.get_connection().await?;
            Some(conn.count_rows(&schema.name).await?)
        } else {
            None
        };

        self.advance(ImportState::Importing);
        self.import_rows(&schema, sampled, &mut source).await?;

        self.advance(ImportState::Verifying);
        let Some(baseline) = baseline else {
            return Ok(None);
        };
        let mut conn = self.pool.get_connection().await?;
        let found = conn.count_rows(&schema.name).await?.saturating_sub(baseline);
        if found != self.job.inserted_rows {
            return Err(ImportError::Verification {
                expected: self.job.inserted_rows,
                found,
            });
        }
        Ok(Some(found))
    }

    async fn create_table(&mut self, schema: &TableSchema) -> ImportResult<()> {
        // Uniqueness seen in the sample does not hold for the rest of the stream,
        // so only the primary key constrains the new table.
        let options = CreateOptions::default()
            .replace_existing(self.config.replace_existing)
            .create_indexes(false);
        let schemas = BTreeMap::from([(schema.name.clone(), schema.clone())]);
        let report = materialize(&self.pool, &schemas, &options, None).await?;
        let failure = report
            .table(&schema.name)
            .filter(|table| table.status == TableStatus::Failed)
            .map(|table| table.error.clone().unwrap_or_default());
        self.warnings.extend(report.warnings);
        match failure {
            Some(message) => Err(ImportError::Schema(SchemaError::TableCreation {
                table: schema.name.clone(),
                message,
            })),
            None => Ok(()),
        }
    }

    async fn import_rows(
        &mut self,
        schema: &TableSchema,
        sampled: Vec<Vec<CellValue>>,
        source: &mut RowSource,
    ) -> ImportResult<()> {
        let cleaner = ChunkCleaner::new(schema, source.columns());
        let unmatched = cleaner.unmatched_columns();
        if !unmatched.is_empty() {
            warn!(columns = ?unmatched, "Schema columns missing from the source");
            self.warnings.push(format!(
                "Columns not found in the source and filled with defaults: {}",
                unmatched.join(", ")
            ));
        }

        let target = InsertTarget {
            pool: self.pool.clone(),
            table: Arc::from(schema.name.as_str()),
            columns: ColumnBinding::for_schema(schema).into(),
            config: self.config.clone(),
        };
        let workers = Arc::new(Semaphore::new(self.workers));
        let chunk_size = self.config.chunk_size;
        let mut sampled = sampled.into_iter();
        let mut pending = Vec::with_capacity(self.config.chunks_per_dispatch);
        let mut next_row = 1u64;

        for index in 0.. {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            let mut raw: Vec<Vec<CellValue>> = sampled.by_ref().take(chunk_size).collect();
            if raw.len() < chunk_size {
                raw.extend(source.take_rows(chunk_size - raw.len()));
            }
            if raw.is_empty() {
                break;
            }

            let read = raw.len() as u64;
            let (rows, stats) = cleaner.clean(raw);
            self.stats.merge(stats);
            self.job.processed_rows += read;
            self.job.skipped_rows += stats.dropped_rows as u64;
            self.job.source_row_count = self.job.source_row_count.max(self.job.processed_rows);
            pending.push(Chunk {
                index,
                first_row: next_row,
                last_row: next_row + read - 1,
                rows,
            });
            next_row += read;
            self.publish();

            if pending.len() >= self.config.chunks_per_dispatch {
                self.dispatch(std::mem::take(&mut pending), &target, &workers)
                    .await?;
            }
        }
        if !pending.is_empty() {
            self.dispatch(pending, &target, &workers).await?;
        }

        if self.stats.coerced_cells > 0 {
            self.warnings.push(format!(
                "{} value(s) did not match their column type and were replaced with defaults",
                self.stats.coerced_cells
            ));
        }
        if self.stats.truncated_cells > 0 {
            self.warnings.push(format!(
                "{} value(s) were truncated to their column's maximum length",
                self.stats.truncated_cells
            ));
        }
        Ok(())
    }

    /// Insert accumulated chunks in parallel and wait for all of them
    async fn dispatch(
        &mut self,
        chunks: Vec<Chunk>,
        target: &InsertTarget,
        workers: &Arc<Semaphore>,
    ) -> ImportResult<()> {
        let mut tasks = JoinSet::new();
        let mut cancelled = false;
        for chunk in chunks {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if chunk.rows.is_empty() {
                self.job.chunks_completed += 1;
                continue;
            }
            let permit = workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ImportError::Worker(e.to_string()))?;
            let target = target.clone();
            tasks.spawn(
                async move {
                    let _permit = permit;
                    insert_chunk(&target, chunk).await
                }
                .in_current_span(),
            );
        }

        let mut first_failure: Option<ChunkFailure> = None;
        let mut worker_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    self.job.inserted_rows += done.inserted;
                    self.job.chunks_completed += 1;
                    debug!(chunk = done.index, rows = done.inserted, attempts = done.attempts, "Chunk inserted");
                }
                Ok(Err(failure)) => {
                    self.job.inserted_rows += failure.inserted;
                    match self.config.failure_policy {
                        FailurePolicy::Skip => {
                            warn!(
                                chunk = failure.index,
                                first_row = failure.first_row,
                                last_row = failure.last_row,
                                error = %failure.message,
                                "Skipping failed chunk"
                            );
                            self.job.failed_rows += failure.failed;
                            self.job.chunks_completed += 1;
                            self.warnings.push(format!(
                                "Skipped rows {}-{} after {} attempt(s): {}",
                                failure.first_row, failure.last_row, failure.attempts, failure.message
                            ));
                        }
                        FailurePolicy::FailFast => {
                            self.job.failed_rows += failure.failed;
                            if first_failure.as_ref().is_none_or(|f| failure.index < f.index) {
                                first_failure = Some(failure);
                            }
                        }
                    }
                }
                Err(e) => {
                    worker_error.get_or_insert_with(|| ImportError::Worker(e.to_string()));
                }
            }
            self.publish();
        }

        if let Some(e) = worker_error {
            return Err(e);
        }
        if let Some(failure) = first_failure {
            return Err(ImportError::ChunkInsert {
                chunk: failure.index,
                first_row: failure.first_row,
                last_row: failure.last_row,
                attempts: failure.attempts,
                inserted_rows: self.job.inserted_rows,
                message: failure.message,
            });
        }
        if cancelled {
            return Err(self.cancelled());
        }
        Ok(())
    }

    fn cancelled(&self) -> ImportError {
        info!(inserted = self.job.inserted_rows, "Import cancelled");
        ImportError::Cancelled {
            inserted_rows: self.job.inserted_rows,
        }
    }

    fn advance(&mut self, next: ImportState) {
        self.clock.transition(&mut self.job, next);
        debug!(state = %next, "Import state changed");
        self.publish();
    }

    fn publish(&self) {
        self.progress.send_replace(self.job.clone());
    }
}

/// Insert one chunk, retrying failed batches with exponential backoff
///
/// Batches commit independently, so a retry resumes at the first uncommitted batch.
async fn insert_chunk(target: &InsertTarget, chunk: Chunk) -> Result<ChunkDone, ChunkFailure> {
    let mut committed = 0usize;
    let mut attempt = 0u32;
    loop {
        match insert_batches(target, &chunk.rows, &mut committed).await {
            Ok(()) => {
                return Ok(ChunkDone {
                    index: chunk.index,
                    inserted: committed as u64,
                    attempts: attempt + 1,
                });
            }
            Err(e) if e.is_retryable() && attempt < target.config.max_retries => {
                let delay = target.config.retry_delay(attempt);
                attempt += 1;
                warn!(
                    chunk = chunk.index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Chunk insert failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(ChunkFailure {
                    index: chunk.index,
                    first_row: chunk.first_row,
                    last_row: chunk.last_row,
                    inserted: committed as u64,
                    failed: (chunk.rows.len() - committed) as u64,
                    attempts: attempt + 1,
                    message: e.to_string(),
                });
            }
        }
    }
}

async fn insert_batches(
    target: &InsertTarget,
    rows: &[Vec<CellValue>],
    committed: &mut usize,
) -> ConnectionResult<()> {
    let mut conn = target.pool.get_connection().await?;
    for batch in rows[*committed..].chunks(target.config.insert_batch_size) {
        conn.insert_rows(&target.table, &target.columns, batch).await?;
        *committed += batch.len();
    }
    Ok(())
}
