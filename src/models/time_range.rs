//! Query time windows.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::MonthPartition;
use crate::error::ArchiveError;

/// A closed interval `[start, stop]` of wall-clock instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, ArchiveError> {
        if start > stop {
            return Err(ArchiveError::InvalidRange { start, stop });
        }
        Ok(Self { start, stop })
    }

    /// Fill in missing bounds: stop defaults to `now`, start to the first
    /// instant of `now`'s month.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        stop: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ArchiveError> {
        let stop = stop.unwrap_or(now);
        let start = start.unwrap_or_else(|| MonthPartition::containing(now).start());
        Self::new(start, stop)
    }

    /// Combine picker dates with fractional hours of day (e.g. 17.5 = 17:30).
    pub fn from_dates_and_hours(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_hour: f64,
        end_hour: f64,
    ) -> Result<Self, ArchiveError> {
        let start = at_fractional_hour(start_date, start_hour)?;
        let stop = at_fractional_hour(end_date, end_hour)?;
        Self::new(start, stop)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    /// Lower bound in epoch seconds.
    pub fn start_ts(&self) -> f64 {
        epoch_seconds(self.start)
    }

    /// Upper bound in epoch seconds.
    pub fn stop_ts(&self) -> f64 {
        epoch_seconds(self.stop)
    }

    pub fn contains_ts(&self, ts: f64) -> bool {
        ts >= self.start_ts() && ts <= self.stop_ts()
    }
}

fn epoch_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9
}

fn at_fractional_hour(date: NaiveDate, hour: f64) -> Result<DateTime<Utc>, ArchiveError> {
    if !(0.0..=24.0).contains(&hour) {
        return Err(ArchiveError::InvalidHourOfDay(hour));
    }
    let whole = hour.trunc() as i64;
    let minutes = ((hour - hour.trunc()) * 60.0) as i64;
    let midnight = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    Ok(midnight + Duration::hours(whole) + Duration::minutes(minutes))
}
