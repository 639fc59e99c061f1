//! Error types for archive queries.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::MonthPartition;

/// Errors that abort an archive operation.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive root {root:?} is unusable: {reason}")]
    Catalog { root: PathBuf, reason: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Invalid property path '{0}': expected facility/device/location/property")]
    InvalidPropertyPath(String),

    #[error("Invalid time range: start {start} is after stop {stop}")]
    InvalidRange {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    #[error("Invalid hour of day: {0} (expected 0.0 to 24.0)")]
    InvalidHourOfDay(f64),

    #[error("Invalid bucket width: {0}")]
    InvalidBucketWidth(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A partition file that exists but could not be read.
///
/// These are collected next to a query's results instead of failing it, so
/// one corrupt month does not hide every other month of data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct PartitionReadError {
    pub path: PathBuf,
    pub month: MonthPartition,
    pub reason: String,
}

impl PartitionReadError {
    pub fn new(path: PathBuf, month: MonthPartition, reason: impl Into<String>) -> Self {
        Self {
            path,
            month,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PartitionReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to read partition {} ({:?}): {}",
            self.month, self.path, self.reason
        )
    }
}
