//! Timestamp range predicate pushed into Parquet reads.
//!
//! Two stages, both applied before any value column is decoded:
//! - row groups whose timestamp statistics lie entirely outside the range
//!   are skipped;
//! - surviving row groups are read through a [`RowFilter`] that decodes the
//!   timestamp column alone and keeps `start_ts <= ts <= stop_ts`.
//!
//! Null timestamps never match.

use arrow::array::{BooleanArray, Float64Array, RecordBatch};
use arrow::compute::kernels::{boolean, cmp};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::error::ArrowError;
use parquet::arrow::arrow_reader::{ArrowPredicateFn, RowFilter};
use parquet::arrow::ProjectionMask;
use parquet::file::metadata::{ParquetMetaData, RowGroupMetaData};
use parquet::file::statistics::Statistics;
use parquet::schema::types::SchemaDescriptor;

use crate::models::{seconds_column, TimeRange};

/// Inclusive `[start_ts, stop_ts]` filter on one timestamp column.
#[derive(Debug, Clone)]
pub struct TimestampPredicate {
    column: String,
    start_ts: f64,
    stop_ts: f64,
}

impl TimestampPredicate {
    pub fn new(column: impl Into<String>, range: &TimeRange) -> Self {
        Self {
            column: column.into(),
            start_ts: range.start_ts(),
            stop_ts: range.stop_ts(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Leaf index of the timestamp column in the Parquet schema.
    pub fn leaf_index(&self, schema: &SchemaDescriptor) -> Option<usize> {
        schema
            .columns()
            .iter()
            .position(|c| c.path().parts().len() == 1 && c.name() == self.column)
    }

    /// Row groups that may hold matching rows, given the arrow type of the
    /// timestamp column.
    ///
    /// Row groups without usable statistics are always kept.
    pub fn prune_row_groups(
        &self,
        metadata: &ParquetMetaData,
        leaf: usize,
        arrow_type: &DataType,
    ) -> Vec<usize> {
        let scale = stats_scale(arrow_type);
        metadata
            .row_groups()
            .iter()
            .enumerate()
            .filter(|(_, rg)| match scale.and_then(|s| row_group_bounds(rg, leaf, s)) {
                Some((min, max)) => max >= self.start_ts && min <= self.stop_ts,
                None => true,
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Row filter evaluating the range on the timestamp column only.
    pub fn row_filter(&self, schema: &SchemaDescriptor, leaf: usize) -> RowFilter {
        let mask = ProjectionMask::leaves(schema, [leaf]);
        let (start, stop) = (self.start_ts, self.stop_ts);
        let predicate = ArrowPredicateFn::new(mask, move |batch: RecordBatch| {
            range_mask(&batch, start, stop)
        });
        RowFilter::new(vec![Box::new(predicate)])
    }
}

/// Evaluate `start <= ts <= stop` on the single column of `batch`.
fn range_mask(batch: &RecordBatch, start: f64, stop: f64) -> Result<BooleanArray, ArrowError> {
    let secs = seconds_column(batch.column(0))?;
    let lower = cmp::gt_eq(&secs, &Float64Array::new_scalar(start))?;
    let upper = cmp::lt_eq(&secs, &Float64Array::new_scalar(stop))?;
    boolean::and(&lower, &upper)
}

/// Divisor turning raw statistics into epoch seconds. None when statistics
/// cannot be compared safely (unsigned or non-numeric columns).
fn stats_scale(arrow_type: &DataType) -> Option<f64> {
    match arrow_type {
        DataType::Timestamp(TimeUnit::Second, _) => Some(1.0),
        DataType::Timestamp(TimeUnit::Millisecond, _) => Some(1e3),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Some(1e6),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Some(1e9),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64 => Some(1.0),
        _ => None,
    }
}

fn row_group_bounds(rg: &RowGroupMetaData, leaf: usize, scale: f64) -> Option<(f64, f64)> {
    let stats = rg.column(leaf).statistics()?;
    let (min, max) = match stats {
        Statistics::Int32(s) => (f64::from(*s.min_opt()?), f64::from(*s.max_opt()?)),
        Statistics::Int64(s) => (*s.min_opt()? as f64, *s.max_opt()? as f64),
        Statistics::Float(s) => (f64::from(*s.min_opt()?), f64::from(*s.max_opt()?)),
        Statistics::Double(s) => (*s.min_opt()?, *s.max_opt()?),
        _ => return None,
    };
    Some((min / scale, max / scale))
}
