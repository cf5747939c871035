//! Column profiling
//!
//! Turns a sample of raw cell values into a [`ColumnProfile`](crate::models::ColumnProfile):
//! semantic type, nullability, constraints, statistics and naming hints.
//!
//! # Example
//!
//! ```rust
//! use data_import_sdk::inference::ColumnProfiler;
//! use data_import_sdk::models::{CellValue, PatternHint, SemanticType};
//!
//! let profiler = ColumnProfiler::new();
//! let emails: Vec<CellValue> = vec!["a@x.com".into(), "b@x.com".into()];
//! let profile = profiler.profile("Email", &emails);
//!
//! assert_eq!(profile.semantic_type, SemanticType::String);
//! assert_eq!(profile.pattern_hint, Some(PatternHint::Email));
//! ```

mod config;
mod formats;
mod naming;
mod profiler;

pub use config::{ProfilerConfig, ProfilerConfigBuilder};
pub use formats::{
    detect_pattern, detect_pattern_where, looks_like_json, matches_pattern, parse_datetime, parse_lenient_number,
    pattern_confidence,
};
pub use naming::{clean_column_name, clean_column_names, clean_table_name};
pub use profiler::ColumnProfiler;
