//! SQL generation for inferred table schemas
//!
//! # Security
//!
//! All identifiers are quoted and escaped per dialect. Internal quote characters
//! are escaped by doubling them.

use super::dialect::Dialect;
use crate::models::{ForeignKey, IndexKind, IndexSuggestion, TableSchema};

/// Generates DDL and maintenance statements for table schemas
pub struct SQLExporter;

impl SQLExporter {
    /// CREATE TABLE statement for a schema, including every foreign key
    ///
    /// # Example
    ///
    /// ```rust
    /// use data_import_sdk::export::{Dialect, SQLExporter};
    /// use data_import_sdk::models::{CellValue, RawTable};
    /// use data_import_sdk::schema::SchemaAssembler;
    ///
    /// let raw = RawTable::from_columns(vec![("id", vec![CellValue::Int(1), CellValue::Int(2)])]);
    /// let schema = SchemaAssembler::new().analyze_table("users", &raw);
    /// let sql = SQLExporter::create_table(&schema, Dialect::Postgres);
    /// assert!(sql.starts_with("CREATE TABLE \"users\" ("));
    /// ```
    pub fn create_table(schema: &TableSchema, dialect: Dialect) -> String {
        Self::create_table_with(schema, dialect, |_| true)
    }

    /// CREATE TABLE statement keeping only the foreign keys accepted by `include`
    pub fn create_table_with<F>(schema: &TableSchema, dialect: Dialect, include: F) -> String
    where
        F: Fn(&ForeignKey) -> bool,
    {
        let q = |id: &str| dialect.quote_identifier(id);
        let mut defs = Vec::with_capacity(schema.columns.len() + schema.foreign_keys.len() + 1);

        for column in &schema.columns {
            let mut def = format!(
                "    {} {}",
                q(&column.name),
                dialect.type_name(column.semantic_type, column.max_length)
            );
            if !column.nullable || schema.is_primary_key(&column.name) {
                def.push_str(" NOT NULL");
            }
            defs.push(def);
        }

        if !schema.primary_keys.is_empty() {
            let keys: Vec<String> = schema.primary_keys.iter().map(|k| q(k)).collect();
            defs.push(format!("    PRIMARY KEY ({})", keys.join(", ")));
        }

        for fk in schema.foreign_keys.iter().filter(|fk| include(fk)) {
            defs.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                q(&fk.column),
                q(&fk.references_table),
                q(&fk.references_column)
            ));
        }

        format!("CREATE TABLE {} (\n{}\n);", q(&schema.name), defs.join(",\n"))
    }

    /// CREATE INDEX statement, or `None` for primary keys which live in the table DDL
    pub fn create_index(index: &IndexSuggestion, table: &str, dialect: Dialect) -> Option<String> {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let unique = match index.kind {
            IndexKind::Primary => return None,
            IndexKind::Unique => "UNIQUE ",
            IndexKind::Regular | IndexKind::Composite => "",
        };
        Some(format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            dialect.quote_identifier(&index.name),
            dialect.quote_identifier(table),
            columns.join(", ")
        ))
    }

    pub fn drop_table(table: &str, dialect: Dialect) -> String {
        format!("DROP TABLE IF EXISTS {}", dialect.quote_identifier(table))
    }

    /// Copy a table's rows into a new backup table
    pub fn backup_table(table: &str, backup: &str, dialect: Dialect) -> String {
        let source = dialect.quote_identifier(table);
        let target = dialect.quote_identifier(backup);
        match dialect {
            Dialect::SqlServer => format!("SELECT * INTO {target} FROM {source}"),
            _ => format!("CREATE TABLE {target} AS SELECT * FROM {source}"),
        }
    }

    pub fn count_rows(table: &str, dialect: Dialect) -> String {
        format!("SELECT COUNT(*) FROM {}", dialect.quote_identifier(table))
    }

    /// `INSERT INTO "t" ("a", "b") VALUES ` without the value tuples
    pub fn insert_prefix(table: &str, columns: &[String], dialect: Dialect) -> String {
        let columns: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ",
            dialect.quote_identifier(table),
            columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::inference::ColumnProfiler;
    use crate::models::{Cardinality, CellValue, IndexPriority, TableMetadata};

    fn orders() -> TableSchema {
        let profiler = ColumnProfiler::new();
        TableSchema {
            name: "orders".to_string(),
            original_name: "Orders".to_string(),
            columns: vec![
                profiler.profile("id", &[CellValue::Int(1), CellValue::Int(2)]),
                profiler.profile("customer_id", &[CellValue::Int(1), CellValue::Null]),
                profiler.profile("note", &["a".into(), "bb".into()]),
            ],
            primary_keys: vec!["id".to_string()],
            foreign_keys: vec![ForeignKey {
                column: "customer_id".to_string(),
                references_table: "customers".to_string(),
                references_column: "id".to_string(),
                confidence: 0.9,
                cardinality: Cardinality::ManyToOne,
            }],
            index_suggestions: Vec::new(),
            metadata: TableMetadata {
                row_count: 2,
                column_count: 3,
                created_at: Utc::now(),
                source_name: "Orders".to_string(),
            },
        }
    }

    #[test]
    fn test_create_table_postgres() {
        let sql = SQLExporter::create_table(&orders(), Dialect::Postgres);
        assert_eq!(
            sql,
            "CREATE TABLE \"orders\" (\n    \"id\" INTEGER NOT NULL,\n    \"customer_id\" INTEGER,\n    \"note\" VARCHAR(50) NOT NULL,\n    PRIMARY KEY (\"id\"),\n    FOREIGN KEY (\"customer_id\") REFERENCES \"customers\" (\"id\")\n);"
        );
    }

    #[test]
    fn test_create_table_sqlserver_without_foreign_keys() {
        let sql = SQLExporter::create_table_with(&orders(), Dialect::SqlServer, |_| false);
        assert!(sql.starts_with("CREATE TABLE [orders] ("));
        assert!(sql.contains("[note] NVARCHAR(50) NOT NULL"));
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_index_statements() {
        let unique = IndexSuggestion {
            kind: IndexKind::Unique,
            columns: vec!["email".to_string()],
            name: "UQ_users_email".to_string(),
            rationale: String::new(),
            priority: IndexPriority::High,
        };
        assert_eq!(
            SQLExporter::create_index(&unique, "users", Dialect::DuckDb).as_deref(),
            Some("CREATE UNIQUE INDEX \"UQ_users_email\" ON \"users\" (\"email\")")
        );

        let primary = IndexSuggestion {
            kind: IndexKind::Primary,
            ..unique
        };
        assert_eq!(SQLExporter::create_index(&primary, "users", Dialect::DuckDb), None);
    }

    #[test]
    fn test_backup_statements() {
        assert_eq!(
            SQLExporter::backup_table("t", "t_backup", Dialect::Sqlite),
            "CREATE TABLE \"t_backup\" AS SELECT * FROM \"t\""
        );
        assert_eq!(
            SQLExporter::backup_table("t", "t_backup", Dialect::SqlServer),
            "SELECT * INTO [t_backup] FROM [t]"
        );
    }
}
