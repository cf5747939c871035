//! Relationship model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Multiplicity of a relationship between two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    /// Classify from whether each side of the relationship is fully unique
    pub fn from_uniqueness(referencing_unique: bool, referenced_unique: bool) -> Self {
        match (referencing_unique, referenced_unique) {
            (true, true) => Cardinality::OneToOne,
            (false, true) => Cardinality::ManyToOne,
            (true, false) => Cardinality::OneToMany,
            (false, false) => Cardinality::ManyToMany,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToMany => "many-to-many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected reference from one table's column to another table's key
///
/// Table and column names are the cleaned identifiers used in DDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    /// Score in [0, 1]
    pub confidence: f64,
    pub cardinality: Cardinality,
}

/// Foreign key attached to a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub confidence: f64,
    pub cardinality: Cardinality,
}

impl From<&Relationship> for ForeignKey {
    fn from(rel: &Relationship) -> Self {
        Self {
            column: rel.from_column.clone(),
            references_table: rel.to_table.clone(),
            references_column: rel.to_column.clone(),
            confidence: rel.confidence,
            cardinality: rel.cardinality,
        }
    }
}
