//! Column profiler
//!
//! Infers a semantic type, constraints and descriptive metadata for one column
//! from a sample of its values. Profiling never fails: ambiguous input degrades
//! to a textual type.

use std::collections::HashSet;

use tracing::debug;

use super::config::ProfilerConfig;
use super::formats::{detect_pattern_where, looks_like_json, parse_datetime, parse_lenient_number};
use super::naming::{clean_column_name, clean_column_names};
use crate::models::{
    CellValue, ColumnConstraint, ColumnProfile, ColumnStatistics, PatternHint, RawTable,
    SemanticType,
};

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "1", "0", "yes", "no", "y", "n"];

/// Column-name fragments and the business meaning they suggest, checked in order
const BUSINESS_MEANINGS: &[(&str, &str)] = &[
    ("id", "identifier"),
    ("email", "contact_information"),
    ("phone", "contact_information"),
    ("address", "location"),
    ("name", "personal_information"),
    ("date", "temporal"),
    ("time", "temporal"),
    ("amount", "financial"),
    ("price", "financial"),
    ("cost", "financial"),
    ("status", "categorical"),
    ("type", "categorical"),
    ("category", "categorical"),
];

/// Running min/max/sum/sum-of-squares over numeric values
#[derive(Debug, Default)]
struct NumericStats {
    min: f64,
    max: f64,
    sum: f64,
    sum_sq: f64,
    count: usize,
}

impl NumericStats {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.sum_sq += value * value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sample standard deviation
    fn std_dev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let variance = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        Some(variance.max(0.0).sqrt())
    }
}

/// Column profiler
#[derive(Debug, Clone, Default)]
pub struct ColumnProfiler {
    config: ProfilerConfig,
}

impl ColumnProfiler {
    /// Create a profiler with default configuration
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default())
    }

    /// Create a profiler with custom configuration
    pub fn with_config(config: ProfilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profile a column, cleaning its header into the identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use data_import_sdk::inference::ColumnProfiler;
    /// use data_import_sdk::models::{CellValue, SemanticType};
    ///
    /// let values = vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)];
    /// let profile = ColumnProfiler::new().profile("ID", &values);
    /// assert_eq!(profile.name, "id");
    /// assert_eq!(profile.semantic_type, SemanticType::Integer);
    /// ```
    pub fn profile(&self, original_name: &str, values: &[CellValue]) -> ColumnProfile {
        self.profile_as(&clean_column_name(original_name), original_name, values)
    }

    /// Profile every column of a table, keeping cleaned names unique
    pub fn profile_table(&self, table: &RawTable) -> Vec<ColumnProfile> {
        clean_column_names(&table.columns)
            .iter()
            .zip(&table.columns)
            .enumerate()
            .map(|(i, (name, original))| self.profile_as(name, original, &table.column_values(i)))
            .collect()
    }

    /// Profile a column under an already cleaned identifier
    pub fn profile_as(&self, name: &str, original_name: &str, values: &[CellValue]) -> ColumnProfile {
        let present: Vec<&CellValue> = values.iter().filter(|v| !is_blank(v)).collect();
        if present.is_empty() {
            return self.empty_profile(name, original_name, values.len());
        }

        let texts: Vec<String> = present
            .iter()
            .filter_map(|v| v.as_text())
            .map(|s| s.trim().to_string())
            .collect();

        let mut statistics = base_statistics(values.len(), &texts);
        let (semantic_type, pattern_hint) = self.detect_type(name, &present, &texts, &statistics);

        if semantic_type.is_numeric() {
            let mut numeric = NumericStats::default();
            for (value, text) in present.iter().zip(&texts) {
                if let Some(n) = value.as_f64().or_else(|| parse_lenient_number(text)) {
                    numeric.add(n);
                }
            }
            if numeric.count > 0 {
                statistics.min = Some(numeric.min);
                statistics.max = Some(numeric.max);
                statistics.mean = numeric.mean();
                statistics.std_dev = numeric.std_dev();
            }
        }

        let constraints = self.constraints(semantic_type, &statistics);
        let max_length = (semantic_type == SemanticType::String).then(|| {
            let padded = (statistics.max_length as f64 * self.config.length_headroom) as usize;
            padded.max(self.config.min_string_length)
        });

        ColumnProfile {
            name: name.to_string(),
            original_name: original_name.to_string(),
            semantic_type,
            max_length,
            nullable: statistics.null_ratio > 0.0,
            constraints,
            quality_score: quality_score(&statistics),
            suggested_index: statistics.unique_ratio > self.config.index_ratio_threshold,
            pattern_hint,
            business_meaning: business_meaning(original_name),
            statistics,
        }
    }

    fn empty_profile(&self, name: &str, original_name: &str, total: usize) -> ColumnProfile {
        let statistics = ColumnStatistics {
            sample_size: total,
            null_ratio: 1.0,
            ..ColumnStatistics::default()
        };
        ColumnProfile {
            name: name.to_string(),
            original_name: original_name.to_string(),
            semantic_type: SemanticType::String,
            max_length: Some(self.config.default_string_length),
            nullable: true,
            constraints: Vec::new(),
            quality_score: quality_score(&statistics),
            suggested_index: false,
            pattern_hint: None,
            business_meaning: business_meaning(original_name),
            statistics,
        }
    }

    fn detect_type(
        &self,
        name: &str,
        present: &[&CellValue],
        texts: &[String],
        statistics: &ColumnStatistics,
    ) -> (SemanticType, Option<PatternHint>) {
        let sample_len = self.config.pattern_sample_size.min(texts.len());

        // Currency and percentage shapes accept plain numbers, so a numeric
        // sample is left to numeric classification for those two.
        let sample_is_numeric = present[..sample_len].iter().all(|v| v.as_f64().is_some());
        let hint = detect_pattern_where(&texts[..sample_len], self.config.pattern_threshold, |hint| {
            !(sample_is_numeric && matches!(hint, PatternHint::Currency | PatternHint::Percentage))
        });
        if let Some(hint) = hint {
            return (hint.semantic_type(), Some(hint));
        }

        let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
        let numeric_ratio = numbers.len() as f64 / present.len() as f64;
        if numeric_ratio >= self.config.numeric_threshold {
            if numbers.iter().all(|n| n.fract() == 0.0) {
                let out_of_range = numbers
                    .iter()
                    .any(|n| *n > i32::MAX as f64 || *n < i32::MIN as f64);
                let semantic_type = if out_of_range {
                    SemanticType::Bigint
                } else {
                    SemanticType::Integer
                };
                return (semantic_type, None);
            }
            return (SemanticType::Float, None);
        }

        let distinct: HashSet<String> = texts.iter().map(|t| t.to_lowercase()).collect();
        if distinct.len() <= 2 && distinct.iter().all(|v| BOOLEAN_TOKENS.contains(&v.as_str())) {
            return (SemanticType::Boolean, None);
        }

        if texts.iter().all(|t| parse_datetime(t).is_some()) {
            return (SemanticType::Datetime, None);
        }

        let json_len = self.config.json_sample_size.min(texts.len());
        let json_hits = texts[..json_len].iter().filter(|t| looks_like_json(t)).count();
        if json_len > 0 && json_hits as f64 / json_len as f64 >= self.config.json_threshold {
            return (SemanticType::Json, None);
        }

        if numeric_ratio > 0.0 {
            debug!(
                kind = "profiling_degraded",
                column = name,
                numeric_ratio,
                "Mixed values, falling back to a textual type"
            );
        }

        if statistics.max_length > self.config.text_max_length
            || statistics.avg_length > self.config.text_avg_length
        {
            (SemanticType::Text, None)
        } else {
            (SemanticType::String, None)
        }
    }

    fn constraints(
        &self,
        semantic_type: SemanticType,
        statistics: &ColumnStatistics,
    ) -> Vec<ColumnConstraint> {
        let mut constraints = Vec::new();
        if statistics.unique_ratio > self.config.unique_ratio_threshold {
            constraints.push(ColumnConstraint::Unique);
        }
        if semantic_type.is_numeric() && statistics.min.is_some_and(|min| min >= 0.0) {
            constraints.push(ColumnConstraint::NonNegative);
        }
        if semantic_type.is_textual() && statistics.max_length > 0 {
            constraints.push(ColumnConstraint::MaxLength(statistics.max_length));
        }
        constraints
    }
}

/// Nulls and whitespace-only strings count as absent
fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn base_statistics(total: usize, texts: &[String]) -> ColumnStatistics {
    let unique_count = texts.iter().collect::<HashSet<_>>().len();
    let lengths: Vec<usize> = texts.iter().map(|t| t.chars().count()).collect();
    let present = texts.len();

    ColumnStatistics {
        sample_size: total,
        null_ratio: if total == 0 {
            1.0
        } else {
            (total - present) as f64 / total as f64
        },
        unique_count,
        unique_ratio: if present == 0 {
            0.0
        } else {
            unique_count as f64 / present as f64
        },
        min_length: lengths.iter().copied().min().unwrap_or(0),
        max_length: lengths.iter().copied().max().unwrap_or(0),
        avg_length: if present == 0 {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / present as f64
        },
        ..ColumnStatistics::default()
    }
}

fn quality_score(statistics: &ColumnStatistics) -> f64 {
    let mut score = 1.0 - statistics.null_ratio * 0.3;
    if statistics.unique_ratio < 0.1 {
        score -= 0.2;
    } else if statistics.unique_ratio > 0.95 {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

fn business_meaning(column_name: &str) -> Option<String> {
    let lower = column_name.to_lowercase();
    BUSINESS_MEANINGS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, meaning)| meaning.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Int(*v)).collect()
    }

    fn strs(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    #[test]
    fn test_integer_column() {
        let profile = ColumnProfiler::new().profile("id", &ints(&[1, 2, 3]));
        assert_eq!(profile.semantic_type, SemanticType::Integer);
        assert!(!profile.nullable);
        assert!(profile.is_unique());
        assert!(profile.constraints.contains(&ColumnConstraint::NonNegative));
        assert_eq!(profile.max_length, None);
        assert_eq!(profile.statistics.min, Some(1.0));
        assert_eq!(profile.statistics.max, Some(3.0));
        assert_eq!(profile.statistics.mean, Some(2.0));
        assert_eq!(profile.business_meaning.as_deref(), Some("identifier"));
    }

    #[test]
    fn test_numeric_strings_become_integers_not_currency() {
        let profile = ColumnProfiler::new().profile("qty", &strs(&["10", "20", "30", "15"]));
        assert_eq!(profile.semantic_type, SemanticType::Integer);
        assert_eq!(profile.pattern_hint, None);
    }

    #[test]
    fn test_digit_only_phones_keep_leading_zeros() {
        let values = strs(&["0812345678", "0898765432", "0823456789", "0911111111"]);
        let profile = ColumnProfiler::new().profile("phone", &values);
        assert_eq!(profile.pattern_hint, Some(PatternHint::Phone));
        assert_eq!(profile.semantic_type, SemanticType::String);
    }

    #[test]
    fn test_bigint_when_out_of_i32_range() {
        let profile = ColumnProfiler::new().profile("big", &ints(&[1, 3_000_000_000]));
        assert_eq!(profile.semantic_type, SemanticType::Bigint);
    }

    #[test]
    fn test_float_column() {
        let values = vec![CellValue::Float(1.5), CellValue::Float(-2.25), CellValue::Int(3)];
        let profile = ColumnProfiler::new().profile("ratio", &values);
        assert_eq!(profile.semantic_type, SemanticType::Float);
        assert!(!profile.constraints.contains(&ColumnConstraint::NonNegative));
        assert!(profile.statistics.std_dev.is_some());
    }

    #[test]
    fn test_email_column() {
        let profile =
            ColumnProfiler::new().profile("email", &strs(&["a@x.com", "b@x.com", "c@x.com"]));
        assert_eq!(profile.semantic_type, SemanticType::String);
        assert_eq!(profile.pattern_hint, Some(PatternHint::Email));
        assert_eq!(profile.max_length, Some(50));
        assert!(profile.constraints.contains(&ColumnConstraint::MaxLength(7)));
        assert_eq!(
            profile.business_meaning.as_deref(),
            Some("contact_information")
        );
    }

    #[test]
    fn test_boolean_column() {
        let profile = ColumnProfiler::new().profile("active", &strs(&["Yes", "no", "yes", "NO"]));
        assert_eq!(profile.semantic_type, SemanticType::Boolean);

        let native = vec![CellValue::Bool(true), CellValue::Bool(false)];
        assert_eq!(
            ColumnProfiler::new().profile("flag", &native).semantic_type,
            SemanticType::Boolean
        );
    }

    #[test]
    fn test_datetime_column() {
        let values = strs(&["15/01/2024 10:30", "16/01/2024 11:00", "Jan 17, 2024"]);
        let profile = ColumnProfiler::new().profile("created", &values);
        assert_eq!(profile.semantic_type, SemanticType::Datetime);
    }

    #[test]
    fn test_iso_date_column() {
        let values = strs(&["2024-01-15", "2024-02-01"]);
        let profile = ColumnProfiler::new().profile("order_date", &values);
        assert_eq!(profile.semantic_type, SemanticType::Date);
        assert_eq!(profile.pattern_hint, Some(PatternHint::DateIso));
        assert_eq!(profile.business_meaning.as_deref(), Some("temporal"));
    }

    #[test]
    fn test_json_column() {
        let values = strs(&[r#"{"a": 1}"#, r#"{"b": [1, 2]}"#, "[]"]);
        let profile = ColumnProfiler::new().profile("payload", &values);
        assert_eq!(profile.semantic_type, SemanticType::Json);
    }

    #[test]
    fn test_text_column() {
        let long = "x".repeat(600);
        let profile = ColumnProfiler::new().profile("notes", &strs(&[&long, "short"]));
        assert_eq!(profile.semantic_type, SemanticType::Text);
        assert_eq!(profile.max_length, None);
    }

    #[test]
    fn test_fully_null_column() {
        let values = vec![CellValue::Null, CellValue::from("  "), CellValue::Null];
        let profile = ColumnProfiler::new().profile("empty", &values);
        assert_eq!(profile.semantic_type, SemanticType::String);
        assert!(profile.nullable);
        assert_eq!(profile.max_length, Some(255));
        assert!(profile.constraints.is_empty());
        assert_eq!(profile.statistics.null_ratio, 1.0);
    }

    #[test]
    fn test_single_distinct_value() {
        let values = strs(&["open"; 12]);
        let profile = ColumnProfiler::new().profile("status", &values);
        assert_eq!(profile.semantic_type, SemanticType::String);
        assert_eq!(profile.statistics.unique_count, 1);
        assert!(!profile.is_unique());
        // unique ratio 1/12 is below 0.1
        assert!((profile.quality_score - 0.8).abs() < 1e-9);
        assert_eq!(profile.business_meaning.as_deref(), Some("categorical"));
    }

    #[test]
    fn test_nullable_and_quality() {
        let values = vec![CellValue::Int(1), CellValue::Null, CellValue::Int(2), CellValue::Int(3)];
        let profile = ColumnProfiler::new().profile("amount", &values);
        assert!(profile.nullable);
        assert!((profile.statistics.null_ratio - 0.25).abs() < 1e-9);
        // 1.0 - 0.25 * 0.3 + 0.1
        assert!((profile.quality_score - 1.0).abs() < 1e-9);
        assert_eq!(profile.business_meaning.as_deref(), Some("financial"));
    }

    #[test]
    fn test_mixed_column_degrades_to_string() {
        let profile = ColumnProfiler::new().profile("code", &strs(&["1", "2", "abc", "def"]));
        assert_eq!(profile.semantic_type, SemanticType::String);
    }

    #[test]
    fn test_profiling_is_pure() {
        let values = strs(&["a@x.com", "b@x.com", "", "c@y.org"]);
        let profiler = ColumnProfiler::new();
        assert_eq!(profiler.profile("Email", &values), profiler.profile("Email", &values));
    }

    #[test]
    fn test_profile_table_cleans_and_dedupes_names() {
        let table = RawTable::from_columns(vec![
            ("Name", strs(&["a", "b"])),
            ("name", strs(&["c", "d"])),
        ]);
        let profiles = ColumnProfiler::new().profile_table(&table);
        assert_eq!(profiles[0].name, "name");
        assert_eq!(profiles[1].name, "name_2");
        assert_eq!(profiles[1].original_name, "name");
    }
}
