//! Archive fixtures for unit tests.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> f64 {
    utc(y, m, d, h).timestamp() as f64
}

/// Create `root/rel` and return it.
pub fn property_dir(root: &Path, rel: &str) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn float_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Float64, false),
        Field::new("data", DataType::Float64, false),
    ]))
}

fn write_batches(path: &Path, schema: &Arc<Schema>, batches: &[RecordBatch]) {
    let file = File::create(path).unwrap();
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props)).unwrap();
    for batch in batches {
        writer.write(batch).unwrap();
        // one row group per batch
        writer.flush().unwrap();
    }
    writer.close().unwrap();
}

fn float_batches(schema: &Arc<Schema>, groups: &[Vec<(f64, f64)>]) -> Vec<RecordBatch> {
    groups
        .iter()
        .map(|points| {
            let ts: Float64Array = points.iter().map(|(t, _)| Some(*t)).collect();
            let values: Float64Array = points.iter().map(|(_, v)| Some(*v)).collect();
            RecordBatch::try_new(
                schema.clone(),
                vec![Arc::new(ts) as ArrayRef, Arc::new(values) as ArrayRef],
            )
            .unwrap()
        })
        .collect()
}

/// Float64 `timestamp`/`data` file, one row group per inner vec.
pub fn write_points_with_row_groups(path: &Path, groups: &[Vec<(f64, f64)>]) {
    let schema = float_schema();
    let batches = float_batches(&schema, groups);
    write_batches(path, &schema, &batches);
}

/// Like [`write_points`], with schema-level key/value metadata.
pub fn write_points_with_metadata(path: &Path, points: &[(f64, f64)], metadata: &[(&str, &str)]) {
    let metadata: HashMap<String, String> = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let schema = Arc::new(float_schema().as_ref().clone().with_metadata(metadata));
    let batches = float_batches(&schema, &[points.to_vec()]);
    write_batches(path, &schema, &batches);
}

/// UTC millisecond timestamps, one row group per inner vec.
pub fn write_millis_points(path: &Path, groups: &[Vec<(i64, f64)>]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
        Field::new("data", DataType::Float64, false),
    ]));
    let batches: Vec<RecordBatch> = groups
        .iter()
        .map(|rows| {
            let ts = TimestampMillisecondArray::from_iter_values(rows.iter().map(|r| r.0))
                .with_timezone("UTC");
            let values = Float64Array::from_iter_values(rows.iter().map(|r| r.1));
            RecordBatch::try_new(
                schema.clone(),
                vec![Arc::new(ts) as ArrayRef, Arc::new(values) as ArrayRef],
            )
            .unwrap()
        })
        .collect();
    write_batches(path, &schema, &batches);
}

pub fn write_points(path: &Path, points: &[(f64, f64)]) {
    write_points_with_row_groups(path, &[points.to_vec()]);
}

/// Integer-second timestamps plus a `bunchID` column.
pub fn write_bunched_points(path: &Path, rows: &[(i64, f64, i64)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Int64, false),
        Field::new("data", DataType::Float64, false),
        Field::new("bunchID", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.1))) as ArrayRef,
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.2))) as ArrayRef,
        ],
    )
    .unwrap();
    write_batches(path, &schema, &[batch]);
}

/// A file with the right name and garbage content.
pub fn write_corrupt(path: &Path) {
    fs::write(path, b"this is not parquet").unwrap();
}
