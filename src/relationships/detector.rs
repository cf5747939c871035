//! Cross-table foreign-key detection

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keys::{KeyCandidate, key_candidates, referenced_stem};
use crate::models::{Cardinality, CellValue, ColumnProfile, RawTable, Relationship};

/// Configuration for relationship detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Minimum confidence for a relationship to become a foreign key
    pub confidence_threshold: f64,
    /// Minimum confidence for a relationship to be offered for review
    pub suggestion_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            suggestion_threshold: 0.7,
        }
    }
}

/// One source table together with its column profiles
///
/// `profiles[i]` describes `data.columns[i]`; `name` is the cleaned table name.
#[derive(Debug, Clone, Copy)]
pub struct ProfiledTable<'a> {
    pub name: &'a str,
    pub data: &'a RawTable,
    pub profiles: &'a [ColumnProfile],
}

impl ProfiledTable<'_> {
    fn values(&self, column: &str) -> Vec<CellValue> {
        self.profiles
            .iter()
            .position(|p| p.name == column)
            .map(|i| self.data.column_values(i))
            .unwrap_or_default()
    }
}

/// Finds foreign-key relationships between a batch of tables
#[derive(Debug, Clone, Default)]
pub struct RelationshipDetector {
    config: DetectorConfig,
}

impl RelationshipDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Relationships at or above the configured threshold, keyed by referencing table
    pub fn detect(&self, tables: &[ProfiledTable<'_>]) -> BTreeMap<String, Vec<Relationship>> {
        self.detect_above(tables, self.config.confidence_threshold)
    }

    /// Relationships at or above `threshold`, keyed by referencing table
    ///
    /// Each referencing column keeps only its best-scoring target.
    pub fn detect_above(
        &self,
        tables: &[ProfiledTable<'_>],
        threshold: f64,
    ) -> BTreeMap<String, Vec<Relationship>> {
        let keys: Vec<Vec<KeyCandidate>> =
            tables.iter().map(|t| key_candidates(t.profiles)).collect();

        let mut result = BTreeMap::new();
        for (ti, table) in tables.iter().enumerate() {
            let mut found = Vec::new();
            for (ci, profile) in table.profiles.iter().enumerate() {
                let column = profile.name.as_str();
                let fk_values = table.data.column_values(ci);

                let best = candidate_targets(tables, &keys, ti, column)
                    .into_iter()
                    .map(|(ui, target)| {
                        let referenced = &tables[ui];
                        let pk_values = referenced.values(&target);
                        let confidence = relationship_confidence(&fk_values, &pk_values);
                        (ui, target, pk_values, confidence)
                    })
                    .filter(|(ui, target, _, confidence)| {
                        let accepted = *confidence >= threshold;
                        if !accepted {
                            debug!(
                                kind = "relationship_low_confidence",
                                from_table = table.name,
                                from_column = column,
                                to_table = tables[*ui].name,
                                to_column = %target,
                                confidence,
                                "Dropping relationship below threshold"
                            );
                        }
                        accepted
                    })
                    .max_by(|a, b| a.3.total_cmp(&b.3));

                if let Some((ui, target, pk_values, confidence)) = best {
                    let referenced = &tables[ui];
                    let cardinality = Cardinality::from_uniqueness(
                        is_unique_over_rows(&fk_values, table.data.row_count()),
                        is_unique_over_rows(&pk_values, referenced.data.row_count()),
                    );
                    debug!(
                        from_table = table.name,
                        from_column = column,
                        to_table = referenced.name,
                        to_column = %target,
                        confidence,
                        cardinality = %cardinality,
                        "Detected relationship"
                    );
                    found.push(Relationship {
                        from_table: table.name.to_string(),
                        from_column: column.to_string(),
                        to_table: referenced.name.to_string(),
                        to_column: target,
                        confidence,
                        cardinality,
                    });
                }
            }
            result.insert(table.name.to_string(), found);
        }
        result
    }
}

/// Candidate `(table index, column)` targets for one column
///
/// Only the best key of each referenced table is a target, so foreign keys
/// always point at the primary key chosen for that table.
fn candidate_targets(
    tables: &[ProfiledTable<'_>],
    keys: &[Vec<KeyCandidate>],
    ti: usize,
    column: &str,
) -> Vec<(usize, String)> {
    let mut targets: Vec<(usize, String)> = Vec::new();
    let mut push = |ui: usize, target: &str| {
        if !(ui == ti && target == column) && !targets.iter().any(|(u, c)| *u == ui && c == target) {
            targets.push((ui, target.to_string()));
        }
    };

    if let Some(stem) = referenced_stem(column) {
        for (ui, other) in tables.iter().enumerate() {
            if table_matches(&stem, other.name) {
                if let Some(key) = keys[ui].first() {
                    push(ui, &key.column);
                }
            }
        }
    }

    // Same-name columns only when this column is not itself a key of its table
    if !keys[ti].iter().any(|k| k.column == column) {
        for (ui, _) in tables.iter().enumerate().filter(|(ui, _)| *ui != ti) {
            if keys[ui].first().is_some_and(|k| k.column == column) {
                push(ui, column);
            }
        }
    }
    targets
}

/// Whether a table name fits the stem extracted from a column name
fn table_matches(stem: &str, table: &str) -> bool {
    let table = table.to_lowercase();
    let singular = table.strip_suffix('s').unwrap_or(&table);
    table.contains(stem) || (singular.len() >= 3 && stem.ends_with(singular))
}

/// 0.7 x value overlap + 0.3 x type compatibility, in [0, 1]
pub fn relationship_confidence(fk_values: &[CellValue], pk_values: &[CellValue]) -> f64 {
    let fk: HashSet<String> = fk_values.iter().filter_map(CellValue::as_text).collect();
    let pk: HashSet<String> = pk_values.iter().filter_map(CellValue::as_text).collect();
    if fk.is_empty() || pk.is_empty() {
        return 0.0;
    }

    let overlap = fk.intersection(&pk).count() as f64 / fk.len() as f64;
    let confidence = overlap * 0.7 + type_compatibility(fk_values, pk_values) * 0.3;
    confidence.clamp(0.0, 1.0)
}

fn type_compatibility(a: &[CellValue], b: &[CellValue]) -> f64 {
    let numeric = |values: &[CellValue]| {
        values
            .iter()
            .filter(|v| !v.is_null())
            .all(|v| v.as_f64().is_some())
    };
    let textual = |values: &[CellValue]| {
        values
            .iter()
            .filter(|v| !v.is_null())
            .all(|v| matches!(v, CellValue::String(_)))
    };

    if numeric(a) && numeric(b) {
        1.0
    } else if textual(a) && textual(b) {
        0.8
    } else {
        0.5
    }
}

/// Distinct non-null values equal the table's row count
fn is_unique_over_rows(values: &[CellValue], row_count: usize) -> bool {
    let distinct: HashSet<String> = values.iter().filter_map(CellValue::as_text).collect();
    row_count > 0 && distinct.len() == row_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ColumnProfiler;

    fn ints(values: &[i64]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Int(*v)).collect()
    }

    fn profiled(raw: &RawTable) -> Vec<ColumnProfile> {
        ColumnProfiler::new().profile_table(raw)
    }

    #[test]
    fn test_many_to_one() {
        let customers = RawTable::from_columns(vec![
            ("id", ints(&[1, 2, 3])),
            ("name", vec!["Ann".into(), "Bob".into(), "Cy".into()]),
        ]);
        let orders = RawTable::from_columns(vec![
            ("id", ints(&[10, 11, 12, 13])),
            ("customer_id", ints(&[1, 1, 2, 3])),
        ]);
        let cp = profiled(&customers);
        let op = profiled(&orders);
        let tables = [
            ProfiledTable { name: "customers", data: &customers, profiles: &cp },
            ProfiledTable { name: "orders", data: &orders, profiles: &op },
        ];

        let found = RelationshipDetector::new().detect(&tables);
        assert!(found["customers"].is_empty());
        let rels = &found["orders"];
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].from_column, "customer_id");
        assert_eq!(rels[0].to_table, "customers");
        assert_eq!(rels[0].to_column, "id");
        assert_eq!(rels[0].cardinality, Cardinality::ManyToOne);
        assert!((rels[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_overlap_is_dropped() {
        let customers = RawTable::from_columns(vec![("id", ints(&[1, 2, 3]))]);
        let orders = RawTable::from_columns(vec![("customer_id", ints(&[7, 8, 9, 1]))]);
        let cp = profiled(&customers);
        let op = profiled(&orders);
        let tables = [
            ProfiledTable { name: "customers", data: &customers, profiles: &cp },
            ProfiledTable { name: "orders", data: &orders, profiles: &op },
        ];

        // overlap 0.25 -> 0.475
        let found = RelationshipDetector::new().detect(&tables);
        assert!(found["orders"].is_empty());
        let loose = RelationshipDetector::new().detect_above(&tables, 0.4);
        assert_eq!(loose["orders"].len(), 1);
    }

    #[test]
    fn test_no_key_means_no_foreign_key() {
        let customers = RawTable::from_columns(vec![("id", ints(&[1, 1, 2]))]);
        let orders = RawTable::from_columns(vec![("customer_id", ints(&[1, 2]))]);
        let cp = profiled(&customers);
        let op = profiled(&orders);
        let tables = [
            ProfiledTable { name: "customers", data: &customers, profiles: &cp },
            ProfiledTable { name: "orders", data: &orders, profiles: &op },
        ];
        assert!(RelationshipDetector::new().detect(&tables)["orders"].is_empty());
    }

    #[test]
    fn test_self_reference() {
        let category = RawTable::from_columns(vec![
            ("category_id", ints(&[1, 2, 3, 4])),
            (
                "parent_category_id",
                vec![CellValue::Null, CellValue::Int(1), CellValue::Int(1), CellValue::Int(2)],
            ),
        ]);
        let profiles = profiled(&category);
        let tables = [ProfiledTable { name: "category", data: &category, profiles: &profiles }];

        let rels = &RelationshipDetector::new().detect(&tables)["category"];
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].from_column, "parent_category_id");
        assert_eq!(rels[0].to_table, "category");
        assert_eq!(rels[0].to_column, "category_id");
        assert_eq!(rels[0].cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn test_confidence_bounds_and_type_mix() {
        let fk: Vec<CellValue> = vec!["1".into(), "2".into()];
        let pk = ints(&[1, 2]);
        assert!((relationship_confidence(&fk, &pk) - 1.0).abs() < 1e-9);

        let fk: Vec<CellValue> = vec!["a".into(), "b".into()];
        let pk: Vec<CellValue> = vec!["a".into(), "b".into(), "c".into()];
        assert!((relationship_confidence(&fk, &pk) - 0.94).abs() < 1e-9);

        assert_eq!(relationship_confidence(&[], &pk), 0.0);
    }
}
