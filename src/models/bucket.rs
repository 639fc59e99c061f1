//! Fixed-width aggregation buckets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArchiveError;
use crate::parse_duration;

/// Width of a resampling bucket, in whole seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketWidth(i64);

impl BucketWidth {
    pub fn from_secs(secs: i64) -> Result<Self, ArchiveError> {
        if secs <= 0 {
            return Err(ArchiveError::InvalidBucketWidth(format!(
                "{} seconds (must be positive)",
                secs
            )));
        }
        Ok(Self(secs))
    }

    pub fn hours(n: i64) -> Result<Self, ArchiveError> {
        Self::scaled(n, 3600, "h")
    }

    pub fn days(n: i64) -> Result<Self, ArchiveError> {
        Self::scaled(n, 86_400, "d")
    }

    fn scaled(n: i64, unit_secs: i64, suffix: &str) -> Result<Self, ArchiveError> {
        let secs = n
            .checked_mul(unit_secs)
            .ok_or_else(|| ArchiveError::InvalidBucketWidth(format!("{}{} overflows", n, suffix)))?;
        Self::from_secs(secs)
    }

    pub fn seconds(&self) -> i64 {
        self.0
    }

    /// Epoch-aligned start of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: f64) -> i64 {
        let w = self.0 as f64;
        ((ts / w).floor() * w) as i64
    }
}

impl FromStr for BucketWidth {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration =
            parse_duration(s).ok_or_else(|| ArchiveError::InvalidBucketWidth(s.to_string()))?;
        let secs = i64::try_from(duration.as_secs())
            .map_err(|_| ArchiveError::InvalidBucketWidth(s.to_string()))?;
        Self::from_secs(secs)
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3600 == 0 {
            write!(f, "{}h", s / 3600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{}s", s)
        }
    }
}
