//! # DOOCS Archive
//!
//! Read-only retrieval core for month-partitioned DOOCS property archives.
//!
//! ## Architecture
//!
//! - **catalog**: Discovery of facility/device/location/property directories
//! - **storage**: Partition resolution and predicate-pushdown Parquet reads
//! - **aggregate**: Mean resampling, min/max decimation, correlation
//! - **archive**: Query facade tying catalog, reader and aggregation together
//! - **models**: Core value types (property paths, months, ranges, tables)
//! - **config**: Configuration loading and validation
//! - **telemetry**: Tracing setup for host applications

pub mod aggregate;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

pub use archive::Archive;
pub use error::{ArchiveError, PartitionReadError};
pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "1d", "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.trim().parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_days() {
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("6h"), Some(Duration::from_secs(21600)));
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_parse_duration_default_seconds() {
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("1w"), None);
    }

    #[test]
    fn test_parse_duration_empty() {
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_eq!(parse_duration("18446744073709551615d"), None);
    }
}
