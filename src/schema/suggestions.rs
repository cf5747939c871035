//! Review suggestions for assembled schemas

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Relationship, SemanticType, TableSchema};

/// What an optimization suggestion proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimizationKind {
    /// Short `text` column that fits a bounded character type
    UseVarchar,
    /// Selective column that will not get an index
    AddIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestion {
    pub table: String,
    pub column: String,
    pub kind: OptimizationKind,
    pub message: String,
}

/// Relationships worth reviewing and schema optimizations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSuggestions {
    /// Relationships at or above the suggestion threshold, including those below
    /// the foreign-key threshold
    pub relationships: Vec<Relationship>,
    pub optimizations: Vec<OptimizationSuggestion>,
}

/// Optimizations for a set of schemas
///
/// A column counts as indexed only when an index on it will be created during
/// materialization.
pub fn optimizations(
    schemas: &BTreeMap<String, TableSchema>,
    selectivity_threshold: f64,
) -> Vec<OptimizationSuggestion> {
    let mut found = Vec::new();
    for schema in schemas.values() {
        for column in &schema.columns {
            let stats = &column.statistics;
            if column.semantic_type == SemanticType::Text && stats.avg_length < 100.0 {
                found.push(OptimizationSuggestion {
                    table: schema.name.clone(),
                    column: column.name.clone(),
                    kind: OptimizationKind::UseVarchar,
                    message: format!(
                        "Consider VARCHAR instead of TEXT for '{}' (average length {:.1})",
                        column.name, stats.avg_length
                    ),
                });
            }

            let indexed = schema
                .index_suggestions
                .iter()
                .any(|s| s.priority.is_auto_created() && s.covers(&column.name));
            if stats.unique_ratio > selectivity_threshold && !indexed {
                found.push(OptimizationSuggestion {
                    table: schema.name.clone(),
                    column: column.name.clone(),
                    kind: OptimizationKind::AddIndex,
                    message: format!(
                        "Consider an index on '{}' ({:.0}% distinct values)",
                        column.name,
                        stats.unique_ratio * 100.0
                    ),
                });
            }
        }
    }
    found
}
