//! SQL dialects and their type mappings

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::SemanticType;

/// Target database dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    SqlServer,
    Postgres,
    DuckDb,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
            Dialect::Postgres => "postgres",
            Dialect::DuckDb => "duckdb",
        }
    }

    /// Column type for a semantic type
    ///
    /// `max_length` only matters for `string` columns on dialects with bounded
    /// character types.
    pub fn type_name(&self, semantic_type: SemanticType, max_length: Option<usize>) -> String {
        use SemanticType as T;

        match self {
            Dialect::Sqlite => match semantic_type {
                T::Integer | T::Bigint => "INTEGER",
                T::Float | T::Decimal => "REAL",
                T::Boolean => "BOOLEAN",
                T::String | T::Text | T::Json | T::Uuid => "TEXT",
                T::Date => "DATE",
                T::Datetime => "DATETIME",
                T::Time => "TIME",
            }
            .to_string(),
            Dialect::SqlServer => match semantic_type {
                T::Integer => "INT".to_string(),
                T::Bigint => "BIGINT".to_string(),
                T::Float => "FLOAT".to_string(),
                T::Decimal => "DECIMAL(18,2)".to_string(),
                T::Boolean => "BIT".to_string(),
                T::String => format!("NVARCHAR({})", max_length.unwrap_or(255)),
                T::Text | T::Json => "NVARCHAR(MAX)".to_string(),
                T::Date => "DATE".to_string(),
                T::Datetime => "DATETIME2".to_string(),
                T::Time => "TIME".to_string(),
                T::Uuid => "UNIQUEIDENTIFIER".to_string(),
            },
            Dialect::Postgres => match semantic_type {
                T::Integer => "INTEGER".to_string(),
                T::Bigint => "BIGINT".to_string(),
                T::Float => "DOUBLE PRECISION".to_string(),
                T::Decimal => "NUMERIC(18,2)".to_string(),
                T::Boolean => "BOOLEAN".to_string(),
                T::String => format!("VARCHAR({})", max_length.unwrap_or(255)),
                T::Text => "TEXT".to_string(),
                T::Date => "DATE".to_string(),
                T::Datetime => "TIMESTAMP".to_string(),
                T::Time => "TIME".to_string(),
                T::Json => "JSONB".to_string(),
                T::Uuid => "UUID".to_string(),
            },
            Dialect::DuckDb => match semantic_type {
                T::Integer => "INTEGER",
                T::Bigint => "BIGINT",
                T::Float => "DOUBLE",
                T::Decimal => "DECIMAL(18,2)",
                T::Boolean => "BOOLEAN",
                T::String | T::Text | T::Json => "VARCHAR",
                T::Date => "DATE",
                T::Datetime => "TIMESTAMP",
                T::Time => "TIME",
                T::Uuid => "UUID",
            }
            .to_string(),
        }
    }

    /// Quote and escape an identifier
    ///
    /// Internal quote characters are doubled.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            Dialect::SqlServer => format!("[{}]", identifier.replace(']', "]]")),
            _ => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(format!(
                "Invalid dialect: {}. Expected: sqlite, sqlserver, postgres, duckdb",
                s
            )),
        }
    }
}
