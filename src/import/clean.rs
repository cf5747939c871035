//! Chunk cleaning and type coercion
//!
//! Source cells are normalized (strings trimmed, null markers mapped to null) and
//! then coerced to the column's semantic type. A value that cannot be coerced gets
//! a safe default instead of failing the chunk: zero for numbers, an empty string
//! for text, null for temporal values.

use chrono::NaiveTime;
use uuid::Uuid;

use crate::inference::{clean_column_name, parse_datetime, parse_lenient_number};
use crate::models::{CellValue, ColumnProfile, SemanticType, TableSchema};

const NULL_MARKERS: &[&str] = &["nan", "none", "null"];
const TRUE_MARKERS: &[&str] = &["true", "1", "yes", "y"];
const FALSE_MARKERS: &[&str] = &["false", "0", "no", "n"];

/// Counters for one cleaned chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Rows dropped because every cell was empty
    pub dropped_rows: usize,
    /// Cells replaced by a default because they did not fit the column type
    pub coerced_cells: usize,
    pub truncated_cells: usize,
}

impl CleanStats {
    pub fn merge(&mut self, other: CleanStats) {
        self.dropped_rows += other.dropped_rows;
        self.coerced_cells += other.coerced_cells;
        self.truncated_cells += other.truncated_cells;
    }
}

/// Maps source rows onto the columns of a target schema
#[derive(Debug, Clone)]
pub struct ChunkCleaner {
    columns: Vec<ColumnProfile>,
    /// Source position of each schema column
    positions: Vec<Option<usize>>,
}

impl ChunkCleaner {
    /// Match schema columns to source headers by original or cleaned name
    pub fn new(schema: &TableSchema, header: &[String]) -> Self {
        let cleaned: Vec<String> = header.iter().map(|h| clean_column_name(h)).collect();
        let positions = schema
            .columns
            .iter()
            .map(|column| {
                header
                    .iter()
                    .position(|h| *h == column.original_name)
                    .or_else(|| cleaned.iter().position(|h| *h == column.name))
            })
            .collect();
        Self {
            columns: schema.columns.clone(),
            positions,
        }
    }

    /// Schema columns without a matching source column; they are filled with defaults
    pub fn unmatched_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.positions)
            .filter(|(_, pos)| pos.is_none())
            .map(|(c, _)| c.name.as_str())
            .collect()
    }

    /// Clean a chunk of source rows into rows in schema column order
    pub fn clean(&self, rows: Vec<Vec<CellValue>>) -> (Vec<Vec<CellValue>>, CleanStats) {
        let mut stats = CleanStats::default();
        let mut cleaned = Vec::with_capacity(rows.len());
        for row in rows {
            let normalized: Vec<CellValue> = self
                .positions
                .iter()
                .map(|pos| {
                    pos.and_then(|i| row.get(i))
                        .map(normalize)
                        .unwrap_or(CellValue::Null)
                })
                .collect();
            if normalized.iter().all(CellValue::is_null) {
                stats.dropped_rows += 1;
                continue;
            }
            let coerced = normalized
                .into_iter()
                .zip(&self.columns)
                .map(|(value, column)| coerce(value, column, &mut stats))
                .collect();
            cleaned.push(coerced);
        }
        (cleaned, stats)
    }
}

/// Trim strings and map null markers and non-finite floats to null
pub fn normalize(value: &CellValue) -> CellValue {
    match value {
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
                CellValue::Null
            } else {
                CellValue::String(trimmed.to_string())
            }
        }
        CellValue::Float(f) if !f.is_finite() => CellValue::Null,
        other => other.clone(),
    }
}

/// Coerce a normalized value to the column's type
pub fn coerce(value: CellValue, column: &ColumnProfile, stats: &mut CleanStats) -> CellValue {
    if value.is_null() {
        return if column.nullable {
            CellValue::Null
        } else {
            default_for(column.semantic_type)
        };
    }

    let coerced = match column.semantic_type {
        SemanticType::Integer | SemanticType::Bigint => to_int(&value),
        SemanticType::Float | SemanticType::Decimal => to_float(&value),
        SemanticType::Boolean => to_bool(&value),
        SemanticType::Date => to_temporal(&value, "%Y-%m-%d"),
        SemanticType::Datetime => to_temporal(&value, "%Y-%m-%d %H:%M:%S"),
        SemanticType::Time => to_time(&value),
        SemanticType::Uuid => value
            .as_text()
            .and_then(|s| Uuid::parse_str(&s).ok())
            .map(|u| CellValue::String(u.hyphenated().to_string())),
        SemanticType::String | SemanticType::Text | SemanticType::Json => {
            value.as_text().map(CellValue::String)
        }
    };

    match coerced {
        Some(CellValue::String(s)) => match column.max_length {
            Some(max) if s.chars().count() > max => {
                stats.truncated_cells += 1;
                CellValue::String(s.chars().take(max).collect())
            }
            _ => CellValue::String(s),
        },
        Some(v) => v,
        None => {
            stats.coerced_cells += 1;
            default_for(column.semantic_type)
        }
    }
}

fn default_for(semantic_type: SemanticType) -> CellValue {
    match semantic_type {
        SemanticType::Integer | SemanticType::Bigint => CellValue::Int(0),
        SemanticType::Float | SemanticType::Decimal => CellValue::Float(0.0),
        SemanticType::Boolean => CellValue::Bool(false),
        SemanticType::String | SemanticType::Text => CellValue::String(String::new()),
        SemanticType::Date
        | SemanticType::Datetime
        | SemanticType::Time
        | SemanticType::Json
        | SemanticType::Uuid => CellValue::Null,
    }
}

fn to_int(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Int(i) => Some(CellValue::Int(*i)),
        CellValue::Bool(b) => Some(CellValue::Int(i64::from(*b))),
        CellValue::Float(f) => Some(CellValue::Int(f.trunc() as i64)),
        CellValue::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| parse_lenient_number(s).map(|f| f.trunc() as i64))
            .map(CellValue::Int),
        CellValue::Null => None,
    }
}

fn to_float(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Bool(b) => Some(CellValue::Float(if *b { 1.0 } else { 0.0 })),
        CellValue::String(s) => value
            .as_f64()
            .or_else(|| parse_lenient_number(s))
            .map(CellValue::Float),
        other => other.as_f64().map(CellValue::Float),
    }
}

fn to_bool(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Bool(b) => Some(CellValue::Bool(*b)),
        CellValue::Int(i) => Some(CellValue::Bool(*i != 0)),
        CellValue::Float(f) => Some(CellValue::Bool(*f != 0.0)),
        CellValue::String(s) => {
            let lower = s.to_lowercase();
            if TRUE_MARKERS.contains(&lower.as_str()) {
                Some(CellValue::Bool(true))
            } else if FALSE_MARKERS.contains(&lower.as_str()) {
                Some(CellValue::Bool(false))
            } else {
                None
            }
        }
        CellValue::Null => None,
    }
}

fn to_temporal(value: &CellValue, format: &str) -> Option<CellValue> {
    let text = value.as_text()?;
    parse_datetime(&text).map(|dt| CellValue::String(dt.format(format).to_string()))
}

fn to_time(value: &CellValue) -> Option<CellValue> {
    let text = value.as_text()?;
    ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&text, fmt).ok())
        .map(|t| CellValue::String(t.format("%H:%M:%S").to_string()))
}
