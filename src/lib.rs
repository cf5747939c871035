//! Data Import SDK - Schema inference and bulk loading for tabular data
//!
//! Provides unified interfaces for:
//! - Column profiling (semantic types, constraints, statistics)
//! - Primary/foreign key and cardinality detection across tables
//! - Index recommendations
//! - Dialect-specific DDL and dependency-ordered table creation
//! - Connection discovery and bounded pooling
//! - Chunked, concurrent imports with retries and progress reporting

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod import;
pub mod indexing;
pub mod inference;
pub mod models;
pub mod relationships;
pub mod schema;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use connection::{
    ConnectionConfig, ConnectionError, PoolConfig, PoolManager, PoolStatus,
};
pub use error::{ErrorKind, ErrorReport};
pub use export::{Dialect, SQLExporter};
pub use import::{
    FailurePolicy, ImportConfig, ImportError, ImportHandle, ImportJob, ImportPipeline,
    ImportReport, ImportState, RowSource,
};
pub use indexing::IndexAdvisor;
pub use inference::{ColumnProfiler, ProfilerConfig};
pub use relationships::RelationshipDetector;
pub use schema::{
    CreateOptions, CreationReport, JsonFileHistory, SchemaAssembler, SchemaError, materialize,
};

// Re-export models
pub use models::{
    CellValue, ColumnProfile, ForeignKey, IndexSuggestion, RawTable, Relationship, SemanticType,
    TableSchema,
};
