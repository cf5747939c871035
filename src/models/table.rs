//! Table models: raw source tables and inferred table schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::column::ColumnProfile;
use super::index::IndexSuggestion;
use super::relationship::ForeignKey;
use super::value::CellValue;

/// A source table as read from a sheet: a header plus rows
///
/// Rows shorter than the header are treated as padded with nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Create a raw table from a header and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from named columns of equal or differing length
    ///
    /// # Example
    ///
    /// ```rust
    /// use data_import_sdk::models::{CellValue, RawTable};
    ///
    /// let table = RawTable::from_columns(vec![
    ///     ("id", vec![CellValue::Int(1), CellValue::Int(2)]),
    ///     ("email", vec!["a@x.com".into(), "b@x.com".into()]),
    /// ]);
    /// assert_eq!(table.row_count(), 2);
    /// ```
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<CellValue>)>) -> Self {
        let height = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); height];
        for (name, values) in columns {
            names.push(name.into());
            for (i, row) in rows.iter_mut().enumerate() {
                row.push(values.get(i).cloned().unwrap_or(CellValue::Null));
            }
        }
        Self {
            columns: names,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of the column at `index`, in row order
    pub fn column_values(&self, index: usize) -> Vec<CellValue> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(CellValue::Null))
            .collect()
    }
}

/// Bookkeeping about how a schema was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub row_count: usize,
    pub column_count: usize,
    pub created_at: DateTime<Utc>,
    /// Name of the sheet or stream the table came from
    pub source_name: String,
}

/// Inferred schema for one table
///
/// Primary keys always name columns of this table, and those columns are not nullable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Cleaned identifier
    pub name: String,
    pub original_name: String,
    pub columns: Vec<ColumnProfile>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub index_suggestions: Vec<IndexSuggestion>,
    pub metadata: TableMetadata,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|c| c == column)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Tables this table references, excluding itself
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .filter(|t| *t != self.name)
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_pads_short_columns() {
        let table = RawTable::from_columns(vec![
            ("a", vec![CellValue::Int(1), CellValue::Int(2)]),
            ("b", vec![CellValue::from("x")]),
        ]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1], vec![CellValue::Int(2), CellValue::Null]);
        assert_eq!(table.column_index("b"), Some(1));
        assert_eq!(table.column_values(1), vec![CellValue::from("x"), CellValue::Null]);
    }
}
