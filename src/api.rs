//! Boundary calls for hosts embedding the SDK
//!
//! Thin entry points over the assembler, materializer, pool and import pipeline,
//! shaped for a UI or RPC layer: results are serializable and failures come back
//! as structured reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connection::{ConnectionAttempt, ConnectionConfig, PoolConfig, PoolManager, PoolStatus};
use crate::error::ErrorReport;
use crate::export::Dialect;
use crate::import::{ImportConfig, ImportHandle, ImportPipeline, RowSource};
use crate::models::{RawTable, TableSchema};
use crate::schema::{
    AssemblerConfig, CreateOptions, CreationReport, HistorySink, SchemaAnalysis, SchemaAssembler,
    SchemaResult, materialize,
};

/// Schemas for a batch of raw tables, keyed by cleaned table name
pub fn profile_tables(tables: &BTreeMap<String, RawTable>) -> BTreeMap<String, TableSchema> {
    SchemaAssembler::new().analyze(tables)
}

/// [`profile_tables`] with explicit settings, plus review suggestions
pub fn profile_tables_with(
    tables: &BTreeMap<String, RawTable>,
    config: AssemblerConfig,
) -> SchemaAnalysis {
    SchemaAssembler::with_config(config).analyze_detailed(tables)
}

/// CREATE TABLE statement per schema
pub fn generate_ddl(
    schemas: &BTreeMap<String, TableSchema>,
    dialect: Dialect,
) -> BTreeMap<String, String> {
    SchemaAssembler::generate_ddl(schemas, dialect)
}

/// Create tables in dependency order, recording the run in `history`
pub async fn create_tables(
    pool: &PoolManager,
    schemas: &BTreeMap<String, TableSchema>,
    options: &CreateOptions,
    history: Option<&dyn HistorySink>,
) -> SchemaResult<CreationReport> {
    materialize(pool, schemas, options, history).await
}

/// Start a background import of `source` into `table`
pub fn start_import(
    pool: Arc<PoolManager>,
    source: RowSource,
    table: &str,
    config: ImportConfig,
) -> ImportHandle {
    ImportPipeline::new(pool, config).start(source, table, None)
}

/// Outcome of a connection test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCheck {
    pub ok: bool,
    pub message: String,
    pub attempts: Vec<ConnectionAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Try every connection variant of `config` with a throwaway pool
pub async fn test_connection(config: ConnectionConfig) -> ConnectionCheck {
    match PoolManager::new(config, PoolConfig::default()) {
        Ok(manager) => {
            let check = check_connection(&manager).await;
            manager.dispose();
            check
        }
        Err(e) => ConnectionCheck {
            ok: false,
            message: e.user_message(),
            attempts: Vec::new(),
            error: Some(e.report()),
        },
    }
}

/// Connect `manager` (if not already connected) and describe the outcome
pub async fn check_connection(manager: &PoolManager) -> ConnectionCheck {
    match manager.connect().await {
        Ok(variant) => {
            let message = format!(
                "Connected to '{}' via {} ({})",
                variant.database, variant.label, variant.address
            );
            info!(variant = %variant.label, "Connection test succeeded");
            ConnectionCheck {
                ok: true,
                message,
                attempts: manager.last_attempts(),
                error: None,
            }
        }
        Err(e) => ConnectionCheck {
            ok: false,
            message: e.user_message(),
            attempts: manager.last_attempts(),
            error: Some(e.report()),
        },
    }
}

pub fn pool_status(manager: &PoolManager) -> PoolStatus {
    manager.pool_status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    #[test]
    fn test_profile_and_generate() {
        let tables = BTreeMap::from([(
            "Users".to_string(),
            RawTable::from_columns(vec![
                ("id", vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]),
                ("email", vec!["a@x.com".into(), "b@x.com".into(), "c@x.com".into()]),
            ]),
        )]);
        let schemas = profile_tables(&tables);
        let ddl = generate_ddl(&schemas, Dialect::Postgres);
        assert!(ddl["users"].starts_with("CREATE TABLE \"users\""));
        assert!(ddl["users"].contains("PRIMARY KEY (\"id\")"));
    }

    #[cfg(feature = "duckdb-backend")]
    #[tokio::test]
    async fn test_connection_to_memory_database() {
        let manager =
            PoolManager::new(ConnectionConfig::duckdb_memory(), PoolConfig::default()).unwrap();
        assert_eq!(pool_status(&manager).total_connections, 0);

        let check = check_connection(&manager).await;
        assert!(check.ok, "{}", check.message);
        assert_eq!(check.attempts.len(), 1);
        assert_eq!(pool_status(&manager).size, 3);
        assert!(pool_status(&manager).total_connections >= 1);
    }
}
