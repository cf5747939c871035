//! Primary-key candidate detection

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ColumnProfile;

static PRIMARY_KEY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"^id$", r"^(.+)_id$", r"^pk_", r"^primary_", r"(^|_)key$"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static FOREIGN_KEY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"^(.+)_id$", r"^(.+)id$", r"^fk_(.+)$", r"^ref_(.+)$"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// A column that could serve as its table's primary key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCandidate {
    pub column: String,
    pub confidence: f64,
}

/// Whether the name follows a primary-key naming convention
pub fn has_key_name(column: &str) -> bool {
    let lower = column.to_lowercase();
    PRIMARY_KEY_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Table stem referenced by a foreign-key style name, e.g. `customer` for `customer_id`
pub fn referenced_stem(column: &str) -> Option<String> {
    let lower = column.to_lowercase();
    FOREIGN_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(&lower))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('_').to_string())
        .filter(|stem| !stem.is_empty())
}

/// Every sampled value present and distinct
pub fn is_fully_unique(profile: &ColumnProfile) -> bool {
    let stats = &profile.statistics;
    stats.sample_size > 0 && stats.null_ratio == 0.0 && stats.unique_count == stats.sample_size
}

/// Primary-key confidence from the name and the uniqueness signal
pub fn key_confidence(profile: &ColumnProfile) -> f64 {
    let stats = &profile.statistics;
    let lower = profile.name.to_lowercase();
    let mut confidence = 0.0;

    if lower == "id" {
        confidence += 0.3;
    } else if lower.contains("_id") {
        confidence += 0.2;
    }
    if stats.sample_size > 0 && stats.unique_count == stats.sample_size {
        confidence += 0.4;
    }
    if stats.null_ratio == 0.0 {
        confidence += 0.3;
    }
    confidence
}

/// Key candidates of a table, best first
///
/// A candidate carries a key-like name and a fully unique, null-free sample.
pub fn key_candidates(profiles: &[ColumnProfile]) -> Vec<KeyCandidate> {
    let mut candidates: Vec<KeyCandidate> = profiles
        .iter()
        .filter(|p| has_key_name(&p.name) && is_fully_unique(p))
        .map(|p| KeyCandidate {
            column: p.name.clone(),
            confidence: key_confidence(p),
        })
        .collect();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ColumnProfiler;
    use crate::models::CellValue;

    #[test]
    fn test_key_names() {
        assert!(has_key_name("id"));
        assert!(has_key_name("customer_id"));
        assert!(has_key_name("pk_order"));
        assert!(has_key_name("natural_key"));
        assert!(!has_key_name("paid"));
        assert!(!has_key_name("name"));
    }

    #[test]
    fn test_referenced_stem() {
        assert_eq!(referenced_stem("customer_id").as_deref(), Some("customer"));
        assert_eq!(referenced_stem("customerid").as_deref(), Some("customer"));
        assert_eq!(referenced_stem("fk_product").as_deref(), Some("product"));
        assert_eq!(referenced_stem("ref_region").as_deref(), Some("region"));
        assert_eq!(referenced_stem("id"), None);
        assert_eq!(referenced_stem("name"), None);
    }

    #[test]
    fn test_candidates_prefer_plain_id() {
        let profiler = ColumnProfiler::new();
        let profiles = vec![
            profiler.profile("order_id", &[CellValue::Int(10), CellValue::Int(11)]),
            profiler.profile("id", &[CellValue::Int(1), CellValue::Int(2)]),
            profiler.profile("name_key", &[CellValue::Int(1), CellValue::Null]),
        ];
        let candidates = key_candidates(&profiles);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].column, "id");
        assert!((candidates[0].confidence - 1.0).abs() < 1e-9);
        assert!((candidates[1].confidence - 0.9).abs() < 1e-9);
    }
}
