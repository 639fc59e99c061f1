//! Calendar-month partitions.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::PropertyPath;

/// One calendar month, the unit the archive is partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPartition {
    year: i32,
    month: u32,
}

impl MonthPartition {
    /// Returns None unless `month` is 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Midnight UTC on the first day of the month.
    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.first_day().and_time(chrono::NaiveTime::MIN))
    }

    /// Start of the next month; the month covers `[start, end)`.
    pub fn end(&self) -> DateTime<Utc> {
        self.succ().start()
    }

    /// File name of this month's partition, e.g. `2023-10.parquet`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self, extension)
    }
}

impl fmt::Display for MonthPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthPartition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("'{}' is not YYYY-MM", s))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("'{}' is not YYYY-MM", s));
        }
        let year: i32 = year.parse().map_err(|_| format!("bad year in '{}'", s))?;
        let month: u32 = month.parse().map_err(|_| format!("bad month in '{}'", s))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

/// A month's partition file for one property. Existence is not implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub property: PropertyPath,
    pub month: MonthPartition,
    pub path: PathBuf,
}

impl PartitionFile {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
