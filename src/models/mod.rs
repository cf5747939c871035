//! Models module
//!
//! Core data structures shared by profiling, schema assembly and import.

pub mod column;
pub mod index;
pub mod relationship;
pub mod table;
pub mod value;

pub use column::{ColumnConstraint, ColumnProfile, ColumnStatistics, PatternHint, SemanticType};
pub use index::{IndexKind, IndexPriority, IndexSuggestion};
pub use relationship::{Cardinality, ForeignKey, Relationship};
pub use table::{RawTable, TableMetadata, TableSchema};
pub use value::CellValue;
