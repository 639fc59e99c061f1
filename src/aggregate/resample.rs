//! Fixed-width mean resampling.
//!
//! Buckets are aligned to the Unix epoch: a row at `ts` lands in the bucket
//! starting at `floor(ts / w) * w`. Only buckets that received at least one
//! value are emitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, TimestampSecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ArchiveError;
use crate::models::{BucketWidth, RawTable};

/// Mean of the values that fell into one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Epoch seconds of the bucket's first instant
    pub start: i64,
    pub mean: f64,
    pub count: u64,
}

impl Bucket {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start, 0)
    }
}

/// Buckets of one width, sorted by start with at most one per start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    bucket_width: BucketWidth,
    buckets: Vec<Bucket>,
}

impl ResampledSeries {
    pub fn empty(bucket_width: BucketWidth) -> Self {
        Self {
            bucket_width,
            buckets: Vec::new(),
        }
    }

    fn from_map(bucket_width: BucketWidth, map: BTreeMap<i64, Bucket>) -> Self {
        Self {
            bucket_width,
            buckets: map.into_values().collect(),
        }
    }

    pub fn bucket_width(&self) -> BucketWidth {
        self.bucket_width
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket starting at `start`, if any.
    pub fn get(&self, start: i64) -> Option<&Bucket> {
        self.buckets
            .binary_search_by_key(&start, |b| b.start)
            .ok()
            .map(|i| &self.buckets[i])
    }

    pub fn means(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.mean).collect()
    }

    /// `(bucket start, mean)` pairs, ready for plotting or decimation.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.buckets
            .iter()
            .map(|b| (b.start as f64, b.mean))
            .collect()
    }

    /// Columnar form: `timestamp` (seconds, UTC), `data`, `count`.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
                false,
            ),
            Field::new("data", DataType::Float64, false),
            Field::new("count", DataType::UInt64, false),
        ]));

        let ts = TimestampSecondArray::from_iter_values(self.buckets.iter().map(|b| b.start))
            .with_timezone("UTC");
        let data = Float64Array::from_iter_values(self.buckets.iter().map(|b| b.mean));
        let count = UInt64Array::from_iter_values(self.buckets.iter().map(|b| b.count));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ts) as ArrayRef,
                Arc::new(data) as ArrayRef,
                Arc::new(count) as ArrayRef,
            ],
        )
    }

    /// Rows of `{timestamp, data, count}` with RFC 3339 timestamps.
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .buckets
            .iter()
            .map(|b| {
                serde_json::json!({
                    "timestamp": b.start_time().map(|t| t.to_rfc3339()),
                    "data": b.mean,
                    "count": b.count,
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

fn accumulate(table: &RawTable, width: BucketWidth) -> Result<BTreeMap<i64, Bucket>, ArchiveError> {
    let mut sums: BTreeMap<i64, (f64, u64)> = BTreeMap::new();
    for (ts, value) in table.points()? {
        let entry = sums.entry(width.bucket_start(ts)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(start, (sum, count))| {
            (
                start,
                Bucket {
                    start,
                    mean: sum / count as f64,
                    count,
                },
            )
        })
        .collect())
}

/// Mean of the value column per epoch-aligned bucket of `width`.
///
/// Null and NaN values are ignored. Buckets with no values are omitted.
pub fn bucket_mean(table: &RawTable, width: BucketWidth) -> Result<ResampledSeries, ArchiveError> {
    let map = accumulate(table, width)?;
    debug!(
        "Resampled {} rows into {} buckets of {}",
        table.num_rows(),
        map.len(),
        width
    );
    Ok(ResampledSeries::from_map(width, map))
}

/// Add the buckets of `new_rows` to `existing`.
///
/// Buckets are computed from `new_rows` alone. Where a new bucket shares a
/// start with an existing one, the new bucket replaces it.
pub fn extend(
    existing: &ResampledSeries,
    new_rows: &RawTable,
    width: BucketWidth,
) -> Result<ResampledSeries, ArchiveError> {
    if existing.bucket_width != width {
        return Err(ArchiveError::InvalidBucketWidth(format!(
            "cannot extend a {} series with {} buckets",
            existing.bucket_width, width
        )));
    }

    let mut merged: BTreeMap<i64, Bucket> =
        existing.buckets.iter().map(|b| (b.start, *b)).collect();
    let fresh = accumulate(new_rows, width)?;
    let replaced = fresh.keys().filter(|k| merged.contains_key(k)).count();
    merged.extend(fresh);

    debug!(
        "Extended series to {} buckets ({} replaced)",
        merged.len(),
        replaced
    );
    Ok(ResampledSeries::from_map(width, merged))
}
