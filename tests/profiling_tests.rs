//! Profiling and schema assembly tests

use std::collections::BTreeMap;

use data_import_sdk::api::{generate_ddl, profile_tables, profile_tables_with};
use data_import_sdk::export::Dialect;
use data_import_sdk::models::{Cardinality, CellValue, PatternHint, RawTable, SemanticType};
use data_import_sdk::schema::{AssemblerConfig, OptimizationKind};

fn shop() -> BTreeMap<String, RawTable> {
    let customers = RawTable::from_columns(vec![
        ("id", (1..=20).map(CellValue::Int).collect::<Vec<_>>()),
        (
            "name",
            (1..=20).map(|i| CellValue::from(format!("Customer {i}"))).collect(),
        ),
    ]);
    let orders = RawTable::from_columns(vec![
        ("id", (1..=60).map(CellValue::Int).collect::<Vec<_>>()),
        (
            "customer_id",
            (0..60).map(|i| CellValue::Int(i % 20 + 1)).collect(),
        ),
        (
            "amount",
            (0..60).map(|i| CellValue::Float(i as f64 * 1.5 + 0.25)).collect(),
        ),
    ]);
    BTreeMap::from([
        ("Customers".to_string(), customers),
        ("Orders".to_string(), orders),
    ])
}

mod profiling_tests {
    use super::*;

    #[test]
    fn test_id_and_email_scenario() {
        let tables = BTreeMap::from([(
            "users".to_string(),
            RawTable::from_columns(vec![
                ("id", vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]),
                (
                    "email",
                    vec!["a@x.com".into(), "b@x.com".into(), "c@x.com".into()],
                ),
            ]),
        )]);
        let schemas = profile_tables(&tables);
        let users = &schemas["users"];

        let id = users.column("id").unwrap();
        assert_eq!(id.semantic_type, SemanticType::Integer);
        assert!(id.is_unique());

        let email = users.column("email").unwrap();
        assert_eq!(email.semantic_type, SemanticType::String);
        assert_eq!(email.pattern_hint, Some(PatternHint::Email));
    }

    #[test]
    fn test_orders_reference_customers() {
        let schemas = profile_tables(&shop());
        let orders = &schemas["orders"];
        let fk = orders.foreign_key("customer_id").unwrap();
        assert_eq!(fk.references_table, "customers");
        assert_eq!(fk.references_column, "id");
        assert_eq!(fk.cardinality, Cardinality::ManyToOne);
        assert_eq!(orders.primary_keys, vec!["id".to_string()]);
        assert!(schemas["customers"].foreign_keys.is_empty());
    }

    #[test]
    fn test_detailed_analysis_offers_suggestions() {
        let analysis = profile_tables_with(&shop(), AssemblerConfig::default());
        assert_eq!(analysis.schemas.len(), 2);
        assert!(
            analysis
                .suggestions
                .relationships
                .iter()
                .any(|r| r.from_table == "orders" && r.to_table == "customers")
        );
        assert!(
            !analysis
                .suggestions
                .optimizations
                .iter()
                .any(|o| o.kind == OptimizationKind::UseVarchar && o.column == "id")
        );
    }

    #[test]
    fn test_ddl_per_dialect() {
        let schemas = profile_tables(&shop());
        for dialect in [Dialect::Postgres, Dialect::DuckDb, Dialect::Sqlite, Dialect::SqlServer] {
            let ddl = generate_ddl(&schemas, dialect);
            assert_eq!(ddl.len(), 2);
            assert!(ddl["orders"].contains(&dialect.quote_identifier("customer_id")));
            assert!(ddl["orders"].contains("FOREIGN KEY"));
        }
    }
}
