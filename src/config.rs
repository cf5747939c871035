//! TOML settings covering every tunable of the SDK
//!
//! Every section is optional and falls back to its defaults.
//!
//! ```toml
//! historyPath = "generation_history.json"
//!
//! [connection]
//! backend = "postgres"
//! host = "db.internal"
//! database = "warehouse"
//! fallbackDatabase = "postgres"
//!
//! [pool]
//! poolSize = 3
//! maxOverflow = 5
//!
//! [import]
//! chunkSize = 2000
//! maxWorkers = 2
//! failurePolicy = "skip"
//!
//! [assembler.detector]
//! confidenceThreshold = 0.8
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::{ConnectionConfig, PoolConfig};
use crate::error::{ErrorKind, ErrorReport};
use crate::import::ImportConfig;
use crate::schema::{AssemblerConfig, CreateOptions};

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    pub fn user_message(&self) -> String {
        match self {
            ConfigError::FileNotFound(_) => {
                format!("{self}\n\nHint: Pass the path of an existing TOML file.")
            }
            ConfigError::Parse(_) => format!(
                "{self}\n\nHint: Keys are camelCase, e.g. `chunkSize` in the [import] section."
            ),
            _ => self.to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), &self.user_message())
    }
}

/// Aggregated configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub assembler: AssemblerConfig,
    pub connection: ConnectionConfig,
    pub pool: PoolConfig,
    pub create: CreateOptions,
    pub import: ImportConfig,
    /// JSON file receiving generation history records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from TOML text and validate them
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject values the components cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let detector = &self.assembler.detector;
        for (name, value) in [
            ("confidenceThreshold", detector.confidence_threshold),
            ("suggestionThreshold", detector.suggestion_threshold),
            ("selectivityThreshold", self.assembler.advisor.selectivity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.pool.pool_size == 0 {
            return Err(ConfigError::Invalid("poolSize must be at least 1".to_string()));
        }
        if self.pool.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeoutSecs must be at least 1".to_string()));
        }
        self.import.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
