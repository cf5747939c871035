//! Relationship detection
//!
//! Finds primary-key candidates per table and foreign-key references across a
//! batch of tables, scoring each by value overlap and type compatibility.

mod detector;
mod keys;

pub use detector::{DetectorConfig, ProfiledTable, RelationshipDetector, relationship_confidence};
pub use keys::{KeyCandidate, has_key_name, is_fully_unique, key_candidates, key_confidence, referenced_stem};
