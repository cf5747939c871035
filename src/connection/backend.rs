//! Backend seams for live database access

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::ConnectionVariant;
use super::error::ConnectionResult;
use crate::export::{Dialect, SQLExporter};
use crate::models::{CellValue, SemanticType, TableSchema};

/// Target column of a bulk insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnBinding {
    pub name: String,
    pub semantic_type: SemanticType,
    pub max_length: Option<usize>,
}

impl ColumnBinding {
    /// Bindings for every column of a schema, in column order
    pub fn for_schema(schema: &TableSchema) -> Vec<ColumnBinding> {
        schema
            .columns
            .iter()
            .map(|c| ColumnBinding {
                name: c.name.clone(),
                semantic_type: c.semantic_type,
                max_length: c.max_length,
            })
            .collect()
    }

    pub fn sql_type(&self, dialect: Dialect) -> String {
        dialect.type_name(self.semantic_type, self.max_length)
    }
}

/// A single live connection
///
/// A connection is never shared between concurrent operations; the pool hands out
/// exclusive access.
#[async_trait]
pub trait DbConnection: Send {
    fn dialect(&self) -> Dialect;

    /// Run one or more statements without results
    async fn execute(&mut self, sql: &str) -> ConnectionResult<()>;

    /// First column of the first row as an integer
    async fn query_i64(&mut self, sql: &str) -> ConnectionResult<i64>;

    async fn table_exists(&mut self, table: &str) -> ConnectionResult<bool>;

    /// Column names of a table in ordinal order
    async fn column_names(&mut self, table: &str) -> ConnectionResult<Vec<String>>;

    /// Insert rows in one transaction, returning the inserted count
    ///
    /// `rows[i][j]` is the value for `columns[j]`.
    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[ColumnBinding],
        rows: &[Vec<CellValue>],
    ) -> ConnectionResult<u64>;

    /// Cheap liveness probe
    async fn ping(&mut self) -> ConnectionResult<()>;

    async fn count_rows(&mut self, table: &str) -> ConnectionResult<u64> {
        let sql = SQLExporter::count_rows(table, self.dialect());
        Ok(self.query_i64(&sql).await?.max(0) as u64)
    }
}

/// Opens connections for one backend
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    async fn connect(&self, variant: &ConnectionVariant) -> ConnectionResult<Box<dyn DbConnection>>;
}
