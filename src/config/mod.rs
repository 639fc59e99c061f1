//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::BucketWidth;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Range reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Read the partition files of one query in parallel
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Size of the dedicated read pool (None = rayon's global pool)
    #[serde(default)]
    pub max_threads: Option<usize>,
}

fn default_parallel() -> bool {
    true
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            max_threads: None,
        }
    }
}

/// Logging configuration for host applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs as JSON
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Archive configuration, passed explicitly to the catalog and reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory holding facility/device/location/property subtrees
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Extension of partition files, without the dot
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Bucket width used by `Archive::resample` when none is given (e.g. "6h")
    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    /// Upper bound on points handed to a plot by the decimation path
    #[serde(default = "default_display_points")]
    pub display_points: usize,

    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_root() -> PathBuf {
    PathBuf::from("./XFEL.SYNC")
}

fn default_file_extension() -> String {
    "parquet".to_string()
}

fn default_timestamp_column() -> String {
    "timestamp".to_string()
}

fn default_value_column() -> String {
    "data".to_string()
}

fn default_bucket() -> String {
    "6h".to_string()
}

fn default_display_points() -> usize {
    2000
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            file_extension: default_file_extension(),
            timestamp_column: default_timestamp_column(),
            value_column: default_value_column(),
            default_bucket: default_bucket(),
            display_points: default_display_points(),
            reader: ReaderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ArchiveConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ArchiveConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// The configured default bucket width.
    pub fn default_bucket_width(&self) -> Result<BucketWidth, ConfigError> {
        self.default_bucket.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "default_bucket '{}' is not a duration like \"6h\" or \"1d\"",
                self.default_bucket
            ))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_extension.is_empty() || self.file_extension.starts_with('.') {
            return Err(ConfigError::ValidationError(
                "file_extension must be non-empty and given without a leading dot".to_string(),
            ));
        }

        if self.timestamp_column.is_empty() || self.value_column.is_empty() {
            return Err(ConfigError::ValidationError(
                "timestamp_column and value_column must be set".to_string(),
            ));
        }

        if self.display_points < 2 {
            return Err(ConfigError::ValidationError(
                "display_points must be at least 2".to_string(),
            ));
        }

        if self.reader.max_threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "reader.max_threads must be greater than 0".to_string(),
            ));
        }

        self.default_bucket_width()?;

        Ok(())
    }
}
