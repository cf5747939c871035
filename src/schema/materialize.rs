//! Table creation against a live database

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};

use super::error::{SchemaError, SchemaResult};
use super::history::{GenerationRecord, HistorySink, schema_hash};
use super::order::creation_order;
use crate::connection::{DbConnection, PoolManager};
use crate::export::{Dialect, SQLExporter};
use crate::models::TableSchema;

/// How to treat tables during creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateOptions {
    /// Drop tables that already exist
    pub replace_existing: bool,
    /// Copy an existing table aside before dropping it
    pub backup_existing: bool,
    /// Create critical and high priority indexes
    pub create_indexes: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            replace_existing: false,
            backup_existing: true,
            create_indexes: true,
        }
    }
}

impl CreateOptions {
    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    pub fn backup_existing(mut self, backup: bool) -> Self {
        self.backup_existing = backup;
        self
    }

    pub fn create_indexes(mut self, create: bool) -> Self {
        self.create_indexes = create;
        self
    }
}

/// Outcome for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Created,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub table: String,
    pub status: TableStatus,
    pub columns: usize,
    /// Foreign keys included in the DDL
    pub relationships: usize,
    pub indexes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a table-creation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationReport {
    pub created_tables: Vec<String>,
    pub failed_tables: Vec<String>,
    pub tables: Vec<TableReport>,
    pub warnings: Vec<String>,
    pub creation_order: Vec<String>,
    pub execution_time_ms: u64,
    pub schema_hash: String,
}

impl CreationReport {
    pub fn is_success(&self) -> bool {
        self.failed_tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Create every table in dependency order on one pooled connection
///
/// With `replace_existing`, existing tables are backed up and dropped in reverse
/// creation order first. A failing table is recorded and skipped; later tables
/// are still attempted.
///
/// Foreign keys to tables that were not created (yet) are left out of the DDL and
/// reported as warnings. The run is appended to `history` when one is given.
pub async fn materialize(
    pool: &PoolManager,
    schemas: &BTreeMap<String, TableSchema>,
    options: &CreateOptions,
    history: Option<&dyn HistorySink>,
) -> SchemaResult<CreationReport> {
    if schemas.is_empty() {
        return Err(SchemaError::Empty);
    }

    let span = info_span!("materialize", tables = schemas.len());
    async move {
        let started = Instant::now();
        let mut conn = pool.get_connection().await?;
        let dialect = conn.dialect();
        let order = creation_order(schemas);
        info!(order = ?order, "Creating tables");
        let full_ddl: Vec<String> = order
            .iter()
            .map(|name| SQLExporter::create_table(&schemas[name], dialect))
            .collect();

        let mut created: BTreeSet<String> = BTreeSet::new();
        let mut report = CreationReport {
            created_tables: Vec::new(),
            failed_tables: Vec::new(),
            tables: Vec::new(),
            warnings: Vec::new(),
            creation_order: order.clone(),
            execution_time_ms: 0,
            schema_hash: schema_hash(full_ddl.iter().map(String::as_str)),
        };

        let mut cleared = if options.replace_existing {
            clear_existing(&mut **conn, &order, dialect, options, &mut report.warnings).await
        } else {
            BTreeMap::new()
        };

        for name in &order {
            let schema = &schemas[name];
            let mut table = create_one(
                &mut **conn,
                schema,
                dialect,
                options.create_indexes,
                &created,
                cleared.get(name),
                &mut report.warnings,
            )
            .await;
            table.backup = cleared.remove(name).and_then(|c| c.backup);
            match table.status {
                TableStatus::Created => {
                    created.insert(name.clone());
                    report.created_tables.push(name.clone());
                }
                TableStatus::Failed => report.failed_tables.push(name.clone()),
            }
            report.tables.push(table);
        }
        report.execution_time_ms = started.elapsed().as_millis() as u64;

        info!(
            created = report.created_tables.len(),
            failed = report.failed_tables.len(),
            warnings = report.warnings.len(),
            elapsed_ms = report.execution_time_ms,
            "Table creation finished"
        );

        if let Some(history) = history {
            let record = GenerationRecord {
                timestamp: Utc::now(),
                created_tables: report.created_tables.clone(),
                failed_tables: report.failed_tables.clone(),
                execution_time: report.execution_time_ms as f64 / 1000.0,
                schemas_generated: schemas.len(),
                schema_hash: report.schema_hash.clone(),
            };
            if let Err(e) = history.append(record) {
                warn!(error = %e, "Could not record generation history");
                report.warnings.push(format!("Generation history not recorded: {e}"));
            }
        }
        Ok(report)
    }
    .instrument(span)
    .await
}

/// What happened to a pre-existing table before creation
#[derive(Debug, Default)]
struct Cleared {
    backup: Option<String>,
    drop_error: Option<String>,
}

/// Back up and drop existing tables, dependents first
async fn clear_existing(
    conn: &mut dyn DbConnection,
    order: &[String],
    dialect: Dialect,
    options: &CreateOptions,
    warnings: &mut Vec<String>,
) -> BTreeMap<String, Cleared> {
    let mut cleared = BTreeMap::new();
    for name in order.iter().rev() {
        if !matches!(conn.table_exists(name).await, Ok(true)) {
            continue;
        }
        let mut outcome = Cleared::default();
        if options.backup_existing {
            let backup = format!("{name}_backup_{}", Utc::now().format("%Y%m%d_%H%M%S"));
            match conn.execute(&SQLExporter::backup_table(name, &backup, dialect)).await {
                Ok(()) => {
                    info!(table = %name, backup = %backup, "Backed up existing table");
                    outcome.backup = Some(backup);
                }
                Err(e) => warnings.push(format!("Backup of '{name}' failed: {e}")),
            }
        }
        if let Err(e) = conn.execute(&SQLExporter::drop_table(name, dialect)).await {
            warn!(table = %name, error = %e, "Could not drop existing table");
            outcome.drop_error = Some(e.to_string());
        }
        cleared.insert(name.clone(), outcome);
    }
    cleared
}

async fn create_one(
    conn: &mut dyn DbConnection,
    schema: &TableSchema,
    dialect: Dialect,
    create_indexes: bool,
    created: &BTreeSet<String>,
    cleared: Option<&Cleared>,
    warnings: &mut Vec<String>,
) -> TableReport {
    let name = schema.name.as_str();
    let mut report = TableReport {
        table: name.to_string(),
        status: TableStatus::Failed,
        columns: schema.columns.len(),
        relationships: 0,
        indexes: 0,
        backup: None,
        error: None,
    };
    let fail = |report: &mut TableReport, message: String| {
        let kind = SchemaError::TableCreation {
            table: report.table.clone(),
            message: message.clone(),
        }
        .kind();
        error!(table = %report.table, kind = %kind, error = %message, "Table creation failed");
        report.error = Some(message);
    };

    match conn.table_exists(name).await {
        Ok(true) => {
            let message = match cleared.and_then(|c| c.drop_error.as_deref()) {
                Some(e) => format!("could not drop existing table: {e}"),
                None => "table already exists".to_string(),
            };
            fail(&mut report, message);
            return report;
        }
        Ok(false) => {}
        Err(e) => {
            fail(&mut report, e.to_string());
            return report;
        }
    }

    let include = |fk: &crate::models::ForeignKey| {
        fk.references_table == name || created.contains(&fk.references_table)
    };
    for fk in schema.foreign_keys.iter().filter(|fk| !include(fk)) {
        warnings.push(format!(
            "Foreign key {name}.{} -> {}.{} omitted: referenced table was not created",
            fk.column, fk.references_table, fk.references_column
        ));
    }
    report.relationships = schema.foreign_keys.iter().filter(|fk| include(fk)).count();

    let ddl = SQLExporter::create_table_with(schema, dialect, include);
    if let Err(e) = conn.execute(&ddl).await {
        fail(&mut report, e.to_string());
        return report;
    }
    report.status = TableStatus::Created;
    info!(table = %name, columns = report.columns, relationships = report.relationships, "Created table");

    if create_indexes {
        for index in schema
            .index_suggestions
            .iter()
            .filter(|s| s.priority.is_auto_created())
        {
            let Some(sql) = SQLExporter::create_index(index, name, dialect) else {
                continue;
            };
            match conn.execute(&sql).await {
                Ok(()) => report.indexes += 1,
                Err(e) => warnings.push(format!("Index {} on '{name}' failed: {e}", index.name)),
            }
        }
    }
    report
}
