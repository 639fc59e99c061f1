//! Per-property query results.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// Counters describing how much of the archive a read touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Months the time range resolved to
    pub partitions_resolved: usize,
    /// Resolved months with a file on disk
    pub partitions_present: usize,
    pub row_groups_total: usize,
    /// Row groups whose statistics overlapped the range
    pub row_groups_read: usize,
    /// Rows decoded from surviving row groups, before the row predicate
    pub candidate_rows: usize,
    pub rows_returned: usize,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.partitions_resolved += other.partitions_resolved;
        self.partitions_present += other.partitions_present;
        self.row_groups_total += other.row_groups_total;
        self.row_groups_read += other.row_groups_read;
        self.candidate_rows += other.candidate_rows;
        self.rows_returned += other.rows_returned;
    }
}

/// All rows of one property that fell inside a query's time range.
///
/// Every column of the partition files is kept; aggregation only looks at
/// the timestamp and value columns.
#[derive(Debug, Clone)]
pub struct RawTable {
    batch: RecordBatch,
    timestamp_column: String,
    value_column: String,
    stats: ScanStats,
}

impl RawTable {
    /// A zero-row table with a `timestamp`/`value` Float64 schema.
    pub fn empty(timestamp_column: &str, value_column: &str) -> Self {
        let schema = Arc::new(Schema::new(vec![
            Field::new(timestamp_column, DataType::Float64, true),
            Field::new(value_column, DataType::Float64, true),
        ]));
        Self {
            batch: RecordBatch::new_empty(schema),
            timestamp_column: timestamp_column.to_string(),
            value_column: value_column.to_string(),
            stats: ScanStats::default(),
        }
    }

    /// Concatenate batches that share `schema`.
    pub fn from_batches(
        schema: &SchemaRef,
        batches: &[RecordBatch],
        timestamp_column: &str,
        value_column: &str,
        stats: ScanStats,
    ) -> Result<Self, ArrowError> {
        schema.index_of(timestamp_column)?;
        schema.index_of(value_column)?;
        let batch = concat_batches(schema, batches)?;
        Ok(Self {
            batch,
            timestamp_column: timestamp_column.to_string(),
            value_column: value_column.to_string(),
            stats,
        })
    }

    /// Build a table from `(epoch seconds, value)` pairs.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let schema = Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Float64, true),
            Field::new("data", DataType::Float64, true),
        ]));
        let ts: Float64Array = points.iter().map(|(t, _)| Some(*t)).collect();
        let values: Float64Array = points.iter().map(|(_, v)| Some(*v)).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(ts) as ArrayRef, Arc::new(values) as ArrayRef],
        )
        .unwrap_or_else(|_| RecordBatch::new_empty(schema));
        Self {
            batch,
            timestamp_column: "timestamp".to_string(),
            value_column: "data".to_string(),
            stats: ScanStats::default(),
        }
    }

    pub(crate) fn with_stats(mut self, stats: ScanStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Timestamp column as epoch seconds.
    pub fn timestamps(&self) -> Result<Float64Array, ArrowError> {
        let idx = self.batch.schema().index_of(&self.timestamp_column)?;
        seconds_column(self.batch.column(idx))
    }

    /// Value column as `f64`.
    pub fn values(&self) -> Result<Float64Array, ArrowError> {
        let idx = self.batch.schema().index_of(&self.value_column)?;
        float_column(self.batch.column(idx))
    }

    /// `(timestamp, value)` pairs in row order, skipping nulls and NaNs.
    pub fn points(&self) -> Result<Vec<(f64, f64)>, ArrowError> {
        let ts = self.timestamps()?;
        let values = self.values()?;
        Ok(ts
            .iter()
            .zip(values.iter())
            .filter_map(|(t, v)| match (t, v) {
                (Some(t), Some(v)) if !t.is_nan() && !v.is_nan() => Some((t, v)),
                _ => None,
            })
            .collect())
    }
}

/// Interpret a timestamp column as epoch seconds.
///
/// Accepts any numeric column (already seconds) or an Arrow timestamp of
/// any unit.
pub(crate) fn seconds_column(array: &ArrayRef) -> Result<Float64Array, ArrowError> {
    match array.data_type() {
        DataType::Timestamp(unit, _) => {
            let scale = match unit {
                TimeUnit::Second => 1.0,
                TimeUnit::Millisecond => 1e3,
                TimeUnit::Microsecond => 1e6,
                TimeUnit::Nanosecond => 1e9,
            };
            let raw = cast(array, &DataType::Int64)?;
            Ok(raw
                .as_primitive::<Int64Type>()
                .unary::<_, Float64Type>(|v| v as f64 / scale))
        }
        _ => float_column(array),
    }
}

pub(crate) fn float_column(array: &ArrayRef) -> Result<Float64Array, ArrowError> {
    if !array.data_type().is_numeric() {
        return Err(ArrowError::CastError(format!(
            "expected a numeric column, found {}",
            array.data_type()
        )));
    }
    let cast_array = cast(array, &DataType::Float64)?;
    Ok(cast_array.as_primitive::<Float64Type>().clone())
}
