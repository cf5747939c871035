//! Column profile model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical type inferred for a column, independent of any SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Bigint,
    Float,
    Decimal,
    Boolean,
    String,
    Text,
    Date,
    Datetime,
    Time,
    Json,
    Uuid,
}

impl SemanticType {
    /// All semantic types, in declaration order
    pub const ALL: [SemanticType; 12] = [
        SemanticType::Integer,
        SemanticType::Bigint,
        SemanticType::Float,
        SemanticType::Decimal,
        SemanticType::Boolean,
        SemanticType::String,
        SemanticType::Text,
        SemanticType::Date,
        SemanticType::Datetime,
        SemanticType::Time,
        SemanticType::Json,
        SemanticType::Uuid,
    ];

    /// Get the lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Bigint => "bigint",
            SemanticType::Float => "float",
            SemanticType::Decimal => "decimal",
            SemanticType::Boolean => "boolean",
            SemanticType::String => "string",
            SemanticType::Text => "text",
            SemanticType::Date => "date",
            SemanticType::Datetime => "datetime",
            SemanticType::Time => "time",
            SemanticType::Json => "json",
            SemanticType::Uuid => "uuid",
        }
    }

    /// Integer, bigint, float or decimal
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer | SemanticType::Bigint | SemanticType::Float | SemanticType::Decimal
        )
    }

    /// String or text
    pub fn is_textual(&self) -> bool {
        matches!(self, SemanticType::String | SemanticType::Text)
    }

    /// Date or datetime
    pub fn is_temporal(&self) -> bool {
        matches!(self, SemanticType::Date | SemanticType::Datetime)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SemanticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemanticType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown semantic type: {s}"))
    }
}

/// Value pattern recognized in a column sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternHint {
    Email,
    Phone,
    Url,
    Uuid,
    IpAddress,
    DateIso,
    DatetimeIso,
    Currency,
    Percentage,
}

impl PatternHint {
    /// Semantic type a column takes when this pattern dominates its sample
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            PatternHint::Email | PatternHint::Phone | PatternHint::IpAddress => SemanticType::String,
            PatternHint::Url => SemanticType::Text,
            PatternHint::Uuid => SemanticType::Uuid,
            PatternHint::DateIso => SemanticType::Date,
            PatternHint::DatetimeIso => SemanticType::Datetime,
            PatternHint::Currency => SemanticType::Decimal,
            PatternHint::Percentage => SemanticType::Float,
        }
    }

    /// Get the camelCase name
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternHint::Email => "email",
            PatternHint::Phone => "phone",
            PatternHint::Url => "url",
            PatternHint::Uuid => "uuid",
            PatternHint::IpAddress => "ipAddress",
            PatternHint::DateIso => "dateIso",
            PatternHint::DatetimeIso => "datetimeIso",
            PatternHint::Currency => "currency",
            PatternHint::Percentage => "percentage",
        }
    }
}

impl fmt::Display for PatternHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Textual rule attached to a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnConstraint {
    /// Values are (nearly) all distinct
    Unique,
    /// Observed numeric minimum is at least zero
    NonNegative,
    /// Observed maximum length for string/text columns
    MaxLength(usize),
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConstraint::Unique => write!(f, "UNIQUE"),
            ColumnConstraint::NonNegative => write!(f, "CHECK (value >= 0)"),
            ColumnConstraint::MaxLength(n) => write!(f, "CHECK (LENGTH(value) <= {n})"),
        }
    }
}

/// Sample statistics for a column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStatistics {
    /// Number of values in the sample, nulls included
    pub sample_size: usize,
    pub null_ratio: f64,
    pub unique_count: usize,
    /// Distinct non-null values over non-null values
    pub unique_ratio: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub avg_length: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Everything inferred about one column from its sample
///
/// Built once by the profiler and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    /// Cleaned identifier
    pub name: String,
    /// Header as it appeared in the source
    pub original_name: String,
    pub semantic_type: SemanticType,
    /// Only set for `string` columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub nullable: bool,
    pub constraints: Vec<ColumnConstraint>,
    pub statistics: ColumnStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_hint: Option<PatternHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_meaning: Option<String>,
    /// Data quality score in [0, 1]
    pub quality_score: f64,
    /// Unique ratio above 0.7
    pub suggested_index: bool,
}

impl ColumnProfile {
    /// Whether the profile carries a uniqueness rule
    pub fn is_unique(&self) -> bool {
        self.constraints.contains(&ColumnConstraint::Unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_type_from_str() {
        assert_eq!("BigInt".parse::<SemanticType>().unwrap(), SemanticType::Bigint);
        assert!("varchar".parse::<SemanticType>().is_err());
    }

    #[test]
    fn test_constraint_display() {
        assert_eq!(ColumnConstraint::Unique.to_string(), "UNIQUE");
        assert_eq!(ColumnConstraint::NonNegative.to_string(), "CHECK (value >= 0)");
        assert_eq!(
            ColumnConstraint::MaxLength(12).to_string(),
            "CHECK (LENGTH(value) <= 12)"
        );
    }

    #[test]
    fn test_pattern_semantic_types() {
        assert_eq!(PatternHint::Email.semantic_type(), SemanticType::String);
        assert_eq!(PatternHint::Url.semantic_type(), SemanticType::Text);
        assert_eq!(PatternHint::Currency.semantic_type(), SemanticType::Decimal);
        assert_eq!(
            serde_json::to_string(&PatternHint::IpAddress).unwrap(),
            "\"ipAddress\""
        );
    }
}
