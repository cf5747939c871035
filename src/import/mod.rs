//! Chunked bulk import
//!
//! Streams a [`RowSource`] into one table: validate, profile a leading sample,
//! create the table, then clean and insert fixed-size chunks through a bounded set
//! of workers, each holding its own pooled connection. Failed chunks are retried
//! with exponential backoff; progress is published as [`ImportJob`] snapshots.

mod clean;
mod config;
mod error;
mod job;
mod pipeline;
mod source;

pub use clean::{ChunkCleaner, CleanStats, coerce, normalize};
pub use config::{FailurePolicy, ImportConfig, ImportConfigBuilder};
pub use error::{ImportError, ImportResult};
pub use job::{ImportJob, ImportReport, ImportState};
pub use pipeline::{ImportHandle, ImportPipeline};
pub use source::RowSource;
