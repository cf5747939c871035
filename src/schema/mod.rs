//! Schema assembly and materialization
//!
//! [`SchemaAssembler`] turns raw tables into [`TableSchema`](crate::models::TableSchema)s;
//! [`materialize`] creates them in dependency order and records the run in a
//! [`HistorySink`].

mod assembler;
mod error;
mod history;
mod materialize;
mod order;
mod suggestions;

pub use assembler::{AssemblerConfig, SchemaAnalysis, SchemaAssembler};
pub use error::{HistoryError, SchemaError, SchemaResult};
pub use history::{GenerationRecord, HistorySink, JsonFileHistory, MemoryHistory, schema_hash};
pub use materialize::{CreateOptions, CreationReport, TableReport, TableStatus, materialize};
pub use order::{creation_order, creation_rounds};
pub use suggestions::{OptimizationKind, OptimizationSuggestion, SchemaSuggestions, optimizations};
