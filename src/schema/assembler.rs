//! Schema assembly: profiling, relationships and indexes

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::suggestions::{SchemaSuggestions, optimizations};
use crate::export::{Dialect, SQLExporter};
use crate::indexing::{AdvisorConfig, IndexAdvisor};
use crate::inference::{ColumnProfiler, ProfilerConfig, clean_table_name};
use crate::models::{ColumnProfile, ForeignKey, RawTable, TableMetadata, TableSchema};
use crate::relationships::{DetectorConfig, ProfiledTable, RelationshipDetector, key_candidates};

/// Configuration for schema assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblerConfig {
    pub profiler: ProfilerConfig,
    pub detector: DetectorConfig,
    pub advisor: AdvisorConfig,
    /// Leading rows of each table used for analysis, 0 for all
    pub sample_rows: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            profiler: ProfilerConfig::default(),
            detector: DetectorConfig::default(),
            advisor: AdvisorConfig::default(),
            sample_rows: 10_000,
        }
    }
}

/// Schemas for a batch of tables plus review suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAnalysis {
    /// Keyed by cleaned table name
    pub schemas: BTreeMap<String, TableSchema>,
    pub suggestions: SchemaSuggestions,
}

/// Builds table schemas from raw source tables
#[derive(Debug, Clone, Default)]
pub struct SchemaAssembler {
    config: AssemblerConfig,
}

impl SchemaAssembler {
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Profile, relate and index a batch of tables
    ///
    /// Keys of the input are source names; keys of the result are the cleaned
    /// table names the schemas carry.
    pub fn analyze(&self, tables: &BTreeMap<String, RawTable>) -> BTreeMap<String, TableSchema> {
        self.analyze_detailed(tables).schemas
    }

    /// Schema for a single table
    pub fn analyze_table(&self, source_name: &str, table: &RawTable) -> TableSchema {
        let profiler = ColumnProfiler::with_config(self.config.profiler.clone());
        let sample = self.sample(table);
        let columns = profiler.profile_table(&sample);
        let name = clean_table_name(source_name);
        let profiled = [ProfiledTable {
            name: &name,
            data: &sample,
            profiles: &columns,
        }];
        let relationships = RelationshipDetector::with_config(self.config.detector.clone())
            .detect(&profiled)
            .remove(&name)
            .unwrap_or_default();
        let foreign_keys = relationships.iter().map(ForeignKey::from).collect();
        self.finish(name, source_name, table.row_count(), columns, foreign_keys)
    }

    /// [`analyze`](Self::analyze) plus relationships and optimizations to review
    pub fn analyze_detailed(&self, tables: &BTreeMap<String, RawTable>) -> SchemaAnalysis {
        let names = unique_table_names(tables.keys());
        let samples: Vec<Cow<'_, RawTable>> = tables.values().map(|t| self.sample(t)).collect();

        let profiler = ColumnProfiler::with_config(self.config.profiler.clone());
        let profiles: Vec<Vec<ColumnProfile>> = samples
            .par_iter()
            .map(|sample| profiler.profile_table(sample))
            .collect();

        let profiled: Vec<ProfiledTable<'_>> = names
            .iter()
            .zip(&samples)
            .zip(&profiles)
            .map(|((name, sample), profiles)| ProfiledTable {
                name,
                data: sample,
                profiles,
            })
            .collect();

        let detector = RelationshipDetector::with_config(self.config.detector.clone());
        let threshold = self.config.detector.confidence_threshold;
        let review_threshold = self.config.detector.suggestion_threshold.min(threshold);
        let mut detected = detector.detect_above(&profiled, review_threshold);
        drop(profiled);

        let mut reviewed = Vec::new();
        let mut schemas = BTreeMap::new();
        for ((name, (source_name, table)), columns) in names.iter().zip(tables).zip(profiles) {
            let relationships = detected.remove(name).unwrap_or_default();
            let foreign_keys = relationships
                .iter()
                .filter(|r| r.confidence >= threshold)
                .map(ForeignKey::from)
                .collect();
            reviewed.extend(relationships);

            let schema = self.finish(name.clone(), source_name, table.row_count(), columns, foreign_keys);
            schemas.insert(name.clone(), schema);
        }

        info!(
            tables = schemas.len(),
            foreign_keys = schemas.values().map(|s| s.foreign_keys.len()).sum::<usize>(),
            "Analyzed tables"
        );

        let optimizations = optimizations(&schemas, self.config.advisor.selectivity_threshold);
        SchemaAnalysis {
            schemas,
            suggestions: SchemaSuggestions {
                relationships: reviewed,
                optimizations,
            },
        }
    }

    /// CREATE TABLE statement per table, keyed like the input
    pub fn generate_ddl(
        schemas: &BTreeMap<String, TableSchema>,
        dialect: Dialect,
    ) -> BTreeMap<String, String> {
        schemas
            .iter()
            .map(|(name, schema)| (name.clone(), SQLExporter::create_table(schema, dialect)))
            .collect()
    }

    fn sample<'a>(&self, table: &'a RawTable) -> Cow<'a, RawTable> {
        let limit = self.config.sample_rows;
        if limit == 0 || table.row_count() <= limit {
            Cow::Borrowed(table)
        } else {
            Cow::Owned(RawTable::new(
                table.columns.clone(),
                table.rows[..limit].to_vec(),
            ))
        }
    }

    /// Pick the primary key and attach indexes
    fn finish(
        &self,
        name: String,
        source_name: &str,
        row_count: usize,
        columns: Vec<ColumnProfile>,
        foreign_keys: Vec<ForeignKey>,
    ) -> TableSchema {
        let primary_keys: Vec<String> = key_candidates(&columns)
            .into_iter()
            .take(1)
            .map(|k| k.column)
            .collect();
        debug!(table = %name, primary_keys = ?primary_keys, "Selected primary key");

        let mut schema = TableSchema {
            original_name: source_name.to_string(),
            metadata: TableMetadata {
                row_count,
                column_count: columns.len(),
                created_at: Utc::now(),
                source_name: source_name.to_string(),
            },
            name,
            columns,
            primary_keys,
            foreign_keys,
            index_suggestions: Vec::new(),
        };
        for column in schema.columns.iter_mut() {
            if schema.primary_keys.contains(&column.name) {
                column.nullable = false;
            }
        }
        schema.index_suggestions =
            IndexAdvisor::with_config(self.config.advisor.clone()).suggest(&schema);
        schema
    }
}

/// Cleaned table names, suffixed `_2`, `_3`... on collision
fn unique_table_names<'a>(sources: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    sources
        .map(|source| {
            let base = clean_table_name(source);
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cardinality, CellValue, IndexKind, PatternHint, SemanticType};

    fn ints(values: impl IntoIterator<Item = i64>) -> Vec<CellValue> {
        values.into_iter().map(CellValue::Int).collect()
    }

    fn shop() -> BTreeMap<String, RawTable> {
        let customers = RawTable::from_columns(vec![
            ("ID", ints(1..=5)),
            (
                "Email",
                (1..=5).map(|i| format!("c{i}@shop.com").into()).collect(),
            ),
        ]);
        let orders = RawTable::from_columns(vec![
            ("id", ints(100..=107)),
            ("Customer ID", ints([1, 1, 2, 3, 3, 3, 4, 5])),
            ("Amount", (0..8).map(|i| CellValue::Float(9.5 + i as f64)).collect()),
        ]);
        [("Customers".to_string(), customers), ("Orders".to_string(), orders)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_analyze_shop() {
        let schemas = SchemaAssembler::new().analyze(&shop());
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["customers", "orders"]);

        let customers = &schemas["customers"];
        assert_eq!(customers.original_name, "Customers");
        assert_eq!(customers.primary_keys, vec!["id"]);
        assert_eq!(
            customers.column("email").unwrap().pattern_hint,
            Some(PatternHint::Email)
        );

        let orders = &schemas["orders"];
        assert_eq!(orders.primary_keys, vec!["id"]);
        assert_eq!(orders.foreign_keys.len(), 1);
        let fk = &orders.foreign_keys[0];
        assert_eq!(fk.column, "customer_id");
        assert_eq!(fk.references_table, "customers");
        assert_eq!(fk.references_column, "id");
        assert_eq!(fk.cardinality, Cardinality::ManyToOne);
        assert_eq!(orders.column("amount").unwrap().semantic_type, SemanticType::Float);

        assert_eq!(orders.index_suggestions[0].kind, IndexKind::Primary);
        assert!(
            orders
                .index_suggestions
                .iter()
                .any(|s| s.name == "IDX_orders_customer_id")
        );
    }

    #[test]
    fn test_primary_keys_are_not_nullable_columns() {
        for schema in SchemaAssembler::new().analyze(&shop()).values() {
            for key in &schema.primary_keys {
                assert!(!schema.column(key).unwrap().nullable);
            }
        }
    }

    #[test]
    fn test_generate_ddl_per_table() {
        let schemas = SchemaAssembler::new().analyze(&shop());
        let ddl = SchemaAssembler::generate_ddl(&schemas, Dialect::Postgres);
        assert_eq!(ddl.len(), 2);
        assert!(ddl["orders"].contains(
            "FOREIGN KEY (\"customer_id\") REFERENCES \"customers\" (\"id\")"
        ));
        assert!(ddl["customers"].contains("\"email\" VARCHAR(50) NOT NULL"));
    }

    #[test]
    fn test_duplicate_cleaned_names() {
        let tables: BTreeMap<String, RawTable> = [
            ("Order Lines".to_string(), RawTable::from_columns(vec![("a", ints([1]))])),
            ("order_lines".to_string(), RawTable::from_columns(vec![("a", ints([1]))])),
        ]
        .into_iter()
        .collect();
        let schemas = SchemaAssembler::new().analyze(&tables);
        assert_eq!(
            schemas.keys().collect::<Vec<_>>(),
            vec!["order_lines", "order_lines_2"]
        );
    }

    #[test]
    fn test_review_relationships_below_foreign_key_threshold() {
        let tables: BTreeMap<String, RawTable> = [
            ("customers".to_string(), RawTable::from_columns(vec![("id", ints(1..=10))])),
            (
                "orders".to_string(),
                // 6 of 10 distinct values match: 0.7 * 0.6 + 0.3 = 0.72
                RawTable::from_columns(vec![("customer_id", ints([1, 2, 3, 4, 5, 6, 50, 51, 52, 53]))]),
            ),
        ]
        .into_iter()
        .collect();

        let analysis = SchemaAssembler::new().analyze_detailed(&tables);
        assert!(analysis.schemas["orders"].foreign_keys.is_empty());
        assert_eq!(analysis.suggestions.relationships.len(), 1);
        assert_eq!(analysis.suggestions.relationships[0].to_table, "customers");
    }

    #[test]
    fn test_sampling_limits_rows() {
        let config = AssemblerConfig {
            sample_rows: 3,
            ..AssemblerConfig::default()
        };
        let table = RawTable::from_columns(vec![("n", ints(1..=10))]);
        let schema = SchemaAssembler::with_config(config).analyze_table("numbers", &table);
        assert_eq!(schema.metadata.row_count, 10);
        assert_eq!(schema.columns[0].statistics.sample_size, 3);
    }
}
