//! Configuration for column profiling

use serde::{Deserialize, Serialize};

/// Configuration for column profiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilerConfig {
    /// Number of leading values scanned for value patterns
    pub pattern_sample_size: usize,

    /// Minimum share of the pattern sample that must match (0.0 - 1.0)
    pub pattern_threshold: f64,

    /// Minimum share of values that must coerce to numbers (0.0 - 1.0)
    pub numeric_threshold: f64,

    /// Number of leading values checked for JSON
    pub json_sample_size: usize,

    /// Minimum share of the JSON sample that must parse (0.0 - 1.0)
    pub json_threshold: f64,

    /// Longest value above which a column is `text`
    pub text_max_length: usize,

    /// Average length above which a column is `text`
    pub text_avg_length: f64,

    /// Unique ratio above which a `UNIQUE` rule is attached
    pub unique_ratio_threshold: f64,

    /// Unique ratio above which a column is flagged for indexing
    pub index_ratio_threshold: f64,

    /// Length reported for a column with no values at all
    pub default_string_length: usize,

    /// Floor for string column lengths
    pub min_string_length: usize,

    /// Multiplier applied to the longest observed value
    pub length_headroom: f64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            pattern_sample_size: 100,
            pattern_threshold: 0.8,
            numeric_threshold: 0.9,
            json_sample_size: 10,
            json_threshold: 0.7,
            text_max_length: 500,
            text_avg_length: 100.0,
            unique_ratio_threshold: 0.95,
            index_ratio_threshold: 0.7,
            default_string_length: 255,
            min_string_length: 50,
            length_headroom: 1.2,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }
}

/// Builder for ProfilerConfig
#[derive(Debug, Default)]
pub struct ProfilerConfigBuilder {
    config: ProfilerConfig,
}

impl ProfilerConfigBuilder {
    /// Set how many values the pattern scan looks at
    pub fn pattern_sample_size(mut self, size: usize) -> Self {
        self.config.pattern_sample_size = size.max(1);
        self
    }

    pub fn pattern_threshold(mut self, threshold: f64) -> Self {
        self.config.pattern_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn numeric_threshold(mut self, threshold: f64) -> Self {
        self.config.numeric_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn json_threshold(mut self, threshold: f64) -> Self {
        self.config.json_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the length limits that separate `string` from `text`
    pub fn text_limits(mut self, max_length: usize, avg_length: f64) -> Self {
        self.config.text_max_length = max_length;
        self.config.text_avg_length = avg_length.max(0.0);
        self
    }

    pub fn unique_ratio_threshold(mut self, threshold: f64) -> Self {
        self.config.unique_ratio_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn min_string_length(mut self, length: usize) -> Self {
        self.config.min_string_length = length;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProfilerConfig {
        self.config
    }
}
