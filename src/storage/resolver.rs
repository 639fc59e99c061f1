//! Partition resolution: which monthly files can hold a time range.
//!
//! Every month from the month of `start` through the month of `stop` is a
//! candidate, even when the range only clips the edge of a month. Rows
//! outside the range are dropped later by the read predicate, not here.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ArchiveError;
use crate::models::{MonthPartition, PartitionFile, PropertyPath, TimeRange};

/// Months touched by `range`, in chronological order.
pub fn resolve_months(range: &TimeRange) -> Vec<MonthPartition> {
    let last = MonthPartition::containing(range.stop());
    let mut month = MonthPartition::containing(range.start());
    let mut months = vec![month];
    while month < last {
        month = month.succ();
        months.push(month);
    }
    months
}

/// Like [`resolve_months`] but with optional bounds; see [`TimeRange::resolve`].
pub fn resolve_months_open(
    start: Option<DateTime<Utc>>,
    stop: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Vec<MonthPartition>, ArchiveError> {
    let range = TimeRange::resolve(start, stop, now)?;
    Ok(resolve_months(&range))
}

/// Maps resolved months to partition file paths.
#[derive(Debug, Clone)]
pub struct PartitionResolver {
    extension: String,
}

impl PartitionResolver {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Expected partition files for `property` (stored in `dir`) over
    /// `range`. Files are not checked for existence.
    pub fn resolve_partitions(
        &self,
        property: &PropertyPath,
        dir: &Path,
        range: &TimeRange,
    ) -> Vec<PartitionFile> {
        resolve_months(range)
            .into_iter()
            .map(|month| PartitionFile {
                property: property.clone(),
                month,
                path: dir.join(month.file_name(&self.extension)),
            })
            .collect()
    }
}

impl Default for PartitionResolver {
    fn default() -> Self {
        Self::new("parquet")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn names(months: &[MonthPartition]) -> Vec<String> {
        months.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_same_month_yields_one() {
        let range = TimeRange::new(utc(2023, 10, 3, 0), utc(2023, 10, 28, 12)).unwrap();
        assert_eq!(names(&resolve_months(&range)), vec!["2023-10"]);
    }

    #[test]
    fn test_start_equals_stop_yields_one() {
        let t = utc(2023, 10, 15, 6);
        let range = TimeRange::new(t, t).unwrap();
        assert_eq!(resolve_months(&range).len(), 1);
    }

    #[test]
    fn test_mid_month_bounds_include_both_months() {
        let range = TimeRange::new(utc(2023, 10, 15, 0), utc(2023, 11, 10, 0)).unwrap();
        assert_eq!(names(&resolve_months(&range)), vec!["2023-10", "2023-11"]);
    }

    #[test]
    fn test_n_boundaries_yield_n_plus_one() {
        let start = utc(2022, 11, 1, 6);
        for n in 0..30u32 {
            let mut stop_month = MonthPartition::containing(start);
            for _ in 0..n {
                stop_month = stop_month.succ();
            }
            let stop = stop_month.start() + chrono::Duration::days(3);
            let months = resolve_months(&TimeRange::new(start, stop).unwrap());

            assert_eq!(months.len(), n as usize + 1, "n = {}", n);
            assert!(months.windows(2).all(|w| w[0].succ() == w[1]));
        }
    }

    #[test]
    fn test_year_boundary() {
        let range = TimeRange::new(utc(2023, 12, 31, 23), utc(2024, 1, 1, 0)).unwrap();
        assert_eq!(names(&resolve_months(&range)), vec!["2023-12", "2024-01"]);
    }

    #[test]
    fn test_stop_on_month_start_includes_that_month() {
        let range = TimeRange::new(utc(2023, 10, 1, 0), utc(2023, 11, 1, 0)).unwrap();
        assert_eq!(names(&resolve_months(&range)), vec!["2023-10", "2023-11"]);
    }

    #[test]
    fn test_open_bounds_use_now() {
        let now = utc(2024, 3, 9, 12);
        let months = resolve_months_open(None, None, now).unwrap();
        assert_eq!(names(&months), vec!["2024-03"]);

        let months = resolve_months_open(Some(utc(2024, 1, 5, 0)), None, now).unwrap();
        assert_eq!(names(&months), vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_partition_paths() {
        let resolver = PartitionResolver::new("parquet");
        let property: PropertyPath = "A/B/C/D".parse().unwrap();
        let range = TimeRange::new(utc(2023, 10, 15, 0), utc(2023, 11, 10, 0)).unwrap();

        let files = resolver.resolve_partitions(&property, Path::new("/arch/A/B/C/D"), &range);
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/arch/A/B/C/D/2023-10.parquet"),
                PathBuf::from("/arch/A/B/C/D/2023-11.parquet"),
            ]
        );
        assert!(files.iter().all(|f| f.property == property));
    }
}
