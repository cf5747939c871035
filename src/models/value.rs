//! Cell values read from tabular sources

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a source row
///
/// Spreadsheet extracts carry loosely typed cells. They are normalized into this
/// closed set at ingestion so profiling and cleaning never need to guess the
/// representation of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent or null marker
    #[default]
    Null,
    /// Native boolean
    Bool(bool),
    /// Native 64-bit integer
    Int(i64),
    /// Native 64-bit float
    Float(f64),
    /// Text
    String(String),
}

impl CellValue {
    /// Whether the cell is absent
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text rendering used for pattern and length analysis, `None` for nulls
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::String(s) => Some(s.clone()),
        }
    }

    /// Numeric view of the cell
    ///
    /// Strings are trimmed and parsed; non-finite results are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) if f.is_finite() => Some(*f),
            CellValue::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_view() {
        assert_eq!(CellValue::from(" 42 ").as_f64(), Some(42.0));
        assert_eq!(CellValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(CellValue::from("abc").as_f64(), None);
        assert_eq!(CellValue::from("NaN").as_f64(), None);
        assert_eq!(CellValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_text_view() {
        assert_eq!(CellValue::Null.as_text(), None);
        assert_eq!(CellValue::Int(3).as_text().as_deref(), Some("3"));
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
    }
}
