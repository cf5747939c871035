//! Embedded DuckDB backend

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use duckdb::types::Value;
use tracing::debug;

use super::backend::{ColumnBinding, Connector, DbConnection};
use super::config::{Address, ConnectionVariant};
use super::error::{ConnectionError, ConnectionResult};
use crate::export::{Dialect, SQLExporter};
use crate::models::CellValue;

const MEMORY: &str = ":memory:";

/// Opens DuckDB connections
///
/// Every connection to the same path is cloned from one root handle, so pooled
/// connections (including in-memory ones) see the same database.
#[derive(Default)]
pub struct DuckDbConnector {
    roots: Mutex<HashMap<String, duckdb::Connection>>,
}

impl DuckDbConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for DuckDbConnector {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    async fn connect(&self, variant: &ConnectionVariant) -> ConnectionResult<Box<dyn DbConnection>> {
        let path = match &variant.address {
            Address::Embedded { path } => path.clone(),
            other => {
                return Err(ConnectionError::Unsupported(format!(
                    "{} ({other}) for duckdb",
                    variant.label
                )));
            }
        };

        let key = path.clone().unwrap_or_else(|| MEMORY.to_string());
        let mut roots = self
            .roots
            .lock()
            .map_err(|_| ConnectionError::Database("DuckDB connection registry poisoned".to_string()))?;
        let root = match roots.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let conn = match &path {
                    Some(path) => duckdb::Connection::open(path)?,
                    None => duckdb::Connection::open_in_memory()?,
                };
                debug!(path = entry.key().as_str(), "Opened DuckDB database");
                entry.insert(conn)
            }
        };
        let conn = root.try_clone()?;
        Ok(Box::new(DuckDbConnection { conn }))
    }
}

/// One DuckDB connection
pub struct DuckDbConnection {
    conn: duckdb::Connection,
}

impl DuckDbConnection {
    /// Wrap an already opened connection
    pub fn new(conn: duckdb::Connection) -> Self {
        Self { conn }
    }
}

fn to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Boolean(*b),
        CellValue::Int(i) => Value::BigInt(*i),
        CellValue::Float(f) => Value::Double(*f),
        CellValue::String(s) => Value::Text(s.clone()),
    }
}

#[async_trait]
impl DbConnection for DuckDbConnection {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    async fn execute(&mut self, sql: &str) -> ConnectionResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    async fn query_i64(&mut self, sql: &str) -> ConnectionResult<i64> {
        let value: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value)
    }

    async fn table_exists(&mut self, table: &str) -> ConnectionResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn column_names(&mut self, table: &str) -> ConnectionResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_name = ?1 ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[ColumnBinding],
        rows: &[Vec<CellValue>],
    ) -> ConnectionResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let placeholders: Vec<String> = columns
            .iter()
            .map(|c| format!("CAST(? AS {})", c.sql_type(Dialect::DuckDb)))
            .collect();
        let sql = format!(
            "{}({})",
            SQLExporter::insert_prefix(table, &names, Dialect::DuckDb),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values = (0..columns.len()).map(|j| row.get(j).map(to_value).unwrap_or(Value::Null));
                stmt.execute(duckdb::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(rows.len() as u64)
    }

    async fn ping(&mut self) -> ConnectionResult<()> {
        let _: i32 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::models::SemanticType;

    fn binding(name: &str, semantic_type: SemanticType) -> ColumnBinding {
        ColumnBinding {
            name: name.to_string(),
            semantic_type,
            max_length: None,
        }
    }

    #[tokio::test]
    async fn test_connections_share_memory_database() {
        let connector = DuckDbConnector::new();
        let variant = &ConnectionConfig::duckdb_memory().variants()[0];

        let mut first = connector.connect(variant).await.unwrap();
        first.execute("CREATE TABLE t (id INTEGER)").await.unwrap();

        let mut second = connector.connect(variant).await.unwrap();
        assert!(second.table_exists("t").await.unwrap());
        second.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_rows_casts_values() {
        let connector = DuckDbConnector::new();
        let variant = &ConnectionConfig::duckdb_memory().variants()[0];
        let mut conn = connector.connect(variant).await.unwrap();
        conn.execute("CREATE TABLE people (id INTEGER, name VARCHAR, born DATE, active BOOLEAN)")
            .await
            .unwrap();

        let columns = vec![
            binding("id", SemanticType::Integer),
            binding("name", SemanticType::String),
            binding("born", SemanticType::Date),
            binding("active", SemanticType::Boolean),
        ];
        let rows = vec![
            vec![CellValue::Int(1), "Ann".into(), "2001-02-03".into(), CellValue::Bool(true)],
            vec![CellValue::Int(2), CellValue::Null, CellValue::Null, CellValue::Bool(false)],
        ];
        assert_eq!(conn.insert_rows("people", &columns, &rows).await.unwrap(), 2);
        assert_eq!(conn.count_rows("people").await.unwrap(), 2);
        assert_eq!(
            conn.column_names("people").await.unwrap(),
            vec!["id", "name", "born", "active"]
        );
    }

    #[tokio::test]
    async fn test_rejects_server_address() {
        let connector = DuckDbConnector::new();
        let variant = &ConnectionConfig::postgres("localhost", "db").variants()[0];
        let err = connector.connect(variant).await.err().unwrap();
        assert!(matches!(err, ConnectionError::Unsupported(_)));
    }
}
