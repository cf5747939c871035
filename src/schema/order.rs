//! Table creation order

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use crate::models::TableSchema;

/// Tables grouped into creation rounds
///
/// Edges run from a referencing table to the table it references. Each round holds
/// every remaining table whose dependencies were emitted in earlier rounds, in name
/// order. When no table is ready the graph has a cycle and all remaining tables are
/// emitted as one final round. Self-references and references to tables outside the
/// batch are ignored.
pub fn creation_rounds(schemas: &BTreeMap<String, TableSchema>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let nodes: BTreeMap<&str, NodeIndex> = schemas
        .keys()
        .map(|name| (name.as_str(), graph.add_node(name.as_str())))
        .collect();

    for (name, schema) in schemas {
        let from = nodes[name.as_str()];
        for dependency in schema.dependencies() {
            if let Some(&to) = nodes.get(dependency) {
                graph.update_edge(from, to, ());
            }
        }
    }

    let mut remaining: BTreeSet<&str> = nodes.keys().copied().collect();
    let mut rounds = Vec::new();
    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|name| {
                graph
                    .neighbors(nodes[name])
                    .all(|dep| !remaining.contains(graph[dep]))
            })
            .collect();

        let round = if ready.is_empty() {
            warn!(
                tables = ?remaining,
                "Circular foreign-key dependency, creating remaining tables in name order"
            );
            remaining.iter().copied().collect()
        } else {
            ready
        };
        for name in &round {
            remaining.remove(name);
        }
        rounds.push(round.into_iter().map(String::from).collect());
    }
    rounds
}

/// Flattened [`creation_rounds`]
pub fn creation_order(schemas: &BTreeMap<String, TableSchema>) -> Vec<String> {
    creation_rounds(schemas).into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Cardinality, ForeignKey, TableMetadata};

    fn table(name: &str, references: &[&str]) -> (String, TableSchema) {
        let schema = TableSchema {
            name: name.to_string(),
            original_name: name.to_string(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: references
                .iter()
                .map(|r| ForeignKey {
                    column: format!("{r}_id"),
                    references_table: r.to_string(),
                    references_column: "id".to_string(),
                    confidence: 1.0,
                    cardinality: Cardinality::ManyToOne,
                })
                .collect(),
            index_suggestions: Vec::new(),
            metadata: TableMetadata {
                row_count: 0,
                column_count: 0,
                created_at: Utc::now(),
                source_name: name.to_string(),
            },
        };
        (name.to_string(), schema)
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let schemas: BTreeMap<_, _> = [
            table("order_items", &["orders", "products"]),
            table("orders", &["customers"]),
            table("customers", &[]),
            table("products", &[]),
        ]
        .into_iter()
        .collect();

        let rounds = creation_rounds(&schemas);
        assert_eq!(
            rounds,
            vec![
                vec!["customers".to_string(), "products".to_string()],
                vec!["orders".to_string()],
                vec!["order_items".to_string()],
            ]
        );

        let order = creation_order(&schemas);
        for (name, schema) in &schemas {
            for dep in schema.dependencies() {
                assert!(position(&order, dep) < position(&order, name));
            }
        }
    }

    #[test]
    fn test_cycle_terminates_with_every_table_once() {
        let schemas: BTreeMap<_, _> = [
            table("a", &["b"]),
            table("b", &["a"]),
            table("c", &[]),
            table("d", &["a"]),
        ]
        .into_iter()
        .collect();

        let order = creation_order(&schemas);
        assert_eq!(order, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_self_and_external_references_are_ignored() {
        let schemas: BTreeMap<_, _> = [table("category", &["category", "elsewhere"])]
            .into_iter()
            .collect();
        assert_eq!(creation_order(&schemas), vec!["category"]);
    }
}
