//! SQL export
//!
//! Renders inferred schemas as DDL for each supported dialect.

pub mod dialect;
pub mod sql;

pub use dialect::Dialect;
pub use sql::SQLExporter;
