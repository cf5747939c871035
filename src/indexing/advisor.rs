//! Index advisor

use serde::{Deserialize, Serialize};

use crate::models::{IndexKind, IndexPriority, IndexSuggestion, TableSchema};

/// Configuration for index suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorConfig {
    /// Unique ratio above which an unindexed column gets a regular index
    pub selectivity_threshold: f64,
    /// Propose a composite index over the first two textual columns
    pub composite_search_index: bool,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            selectivity_threshold: 0.8,
            composite_search_index: true,
        }
    }
}

/// Proposes indexes for a table schema
#[derive(Debug, Clone, Default)]
pub struct IndexAdvisor {
    config: AdvisorConfig,
}

impl IndexAdvisor {
    pub fn new() -> Self {
        Self::with_config(AdvisorConfig::default())
    }

    pub fn with_config(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// Suggestions ordered by priority, most urgent first
    ///
    /// Selectivity comes from the column statistics embedded in the schema.
    pub fn suggest(&self, schema: &TableSchema) -> Vec<IndexSuggestion> {
        let table = &schema.name;
        let mut suggestions = Vec::new();

        if !schema.primary_keys.is_empty() {
            suggestions.push(IndexSuggestion {
                kind: IndexKind::Primary,
                columns: schema.primary_keys.clone(),
                name: format!("PK_{table}"),
                rationale: "Primary key constraint".to_string(),
                priority: IndexPriority::Critical,
            });
        }

        for fk in &schema.foreign_keys {
            if suggestions.iter().any(|s| s.kind == IndexKind::Regular && s.columns == [fk.column.clone()]) {
                continue;
            }
            suggestions.push(IndexSuggestion {
                kind: IndexKind::Regular,
                columns: vec![fk.column.clone()],
                name: format!("IDX_{table}_{}", fk.column),
                rationale: "Foreign key lookup optimization".to_string(),
                priority: IndexPriority::High,
            });
        }

        for column in schema.columns.iter().filter(|c| c.is_unique()) {
            suggestions.push(IndexSuggestion {
                kind: IndexKind::Unique,
                columns: vec![column.name.clone()],
                name: format!("UQ_{table}_{}", column.name),
                rationale: "Unique constraint enforcement".to_string(),
                priority: IndexPriority::High,
            });
        }

        for column in &schema.columns {
            let ratio = column.statistics.unique_ratio;
            if ratio > self.config.selectivity_threshold
                && !suggestions.iter().any(|s| s.covers(&column.name))
            {
                suggestions.push(IndexSuggestion {
                    kind: IndexKind::Regular,
                    columns: vec![column.name.clone()],
                    name: format!("IDX_{table}_{}", column.name),
                    rationale: format!("High selectivity ({:.2}%)", ratio * 100.0),
                    priority: IndexPriority::Medium,
                });
            }
        }

        if self.config.composite_search_index {
            let textual: Vec<String> = schema
                .columns
                .iter()
                .filter(|c| c.semantic_type.is_textual())
                .take(2)
                .map(|c| c.name.clone())
                .collect();
            if textual.len() == 2 {
                suggestions.push(IndexSuggestion {
                    kind: IndexKind::Composite,
                    columns: textual,
                    name: format!("IDX_{table}_search"),
                    rationale: "Text search optimization".to_string(),
                    priority: IndexPriority::Low,
                });
            }
        }

        suggestions.sort_by_key(|s| s.priority);
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::inference::ColumnProfiler;
    use crate::models::{Cardinality, CellValue, ForeignKey, TableMetadata};

    fn schema() -> TableSchema {
        let profiler = ColumnProfiler::new();
        let ids: Vec<CellValue> = (1..=10).map(CellValue::Int).collect();
        let customers: Vec<CellValue> = (1..=10).map(|i| CellValue::Int(i % 3)).collect();
        let emails: Vec<CellValue> = (1..=10).map(|i| format!("u{i}@x.com").into()).collect();
        let cities: Vec<CellValue> = (1..=10).map(|i| format!("city{}", i % 2).into()).collect();
        let columns = vec![
            profiler.profile("id", &ids),
            profiler.profile("customer_id", &customers),
            profiler.profile("email", &emails),
            profiler.profile("city", &cities),
        ];
        TableSchema {
            name: "orders".to_string(),
            original_name: "Orders".to_string(),
            columns,
            primary_keys: vec!["id".to_string()],
            foreign_keys: vec![ForeignKey {
                column: "customer_id".to_string(),
                references_table: "customers".to_string(),
                references_column: "id".to_string(),
                confidence: 1.0,
                cardinality: Cardinality::ManyToOne,
            }],
            index_suggestions: Vec::new(),
            metadata: TableMetadata {
                row_count: 10,
                column_count: 4,
                created_at: Utc::now(),
                source_name: "Orders".to_string(),
            },
        }
    }

    #[test]
    fn test_suggestions() {
        let suggestions = IndexAdvisor::new().suggest(&schema());
        let names: Vec<&str> = suggestions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "PK_orders",
                "IDX_orders_customer_id",
                "UQ_orders_id",
                "UQ_orders_email",
                "IDX_orders_search",
            ]
        );
        assert_eq!(suggestions[0].priority, IndexPriority::Critical);
        assert_eq!(suggestions[1].rationale, "Foreign key lookup optimization");
        assert_eq!(suggestions[4].kind, IndexKind::Composite);
        assert_eq!(suggestions[4].columns, vec!["email", "city"]);
    }

    #[test]
    fn test_high_selectivity_regular_index() {
        let mut schema = schema();
        schema.primary_keys.clear();
        schema.foreign_keys.clear();
        // 9 distinct of 10: selective but not unique
        let values: Vec<CellValue> = (1..=10).map(|i| CellValue::Int(i.min(9))).collect();
        schema.columns = vec![ColumnProfiler::new().profile("code", &values)];

        let suggestions = IndexAdvisor::new().suggest(&schema);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, IndexKind::Regular);
        assert_eq!(suggestions[0].name, "IDX_orders_code");
        assert_eq!(suggestions[0].rationale, "High selectivity (90.00%)");
        assert_eq!(suggestions[0].priority, IndexPriority::Medium);
    }

    #[test]
    fn test_no_primary_without_keys() {
        let mut schema = schema();
        schema.primary_keys.clear();
        let suggestions = IndexAdvisor::new().suggest(&schema);
        assert!(suggestions.iter().all(|s| s.kind != IndexKind::Primary));
    }
}
