//! Range reads over monthly Parquet partitions.
//!
//! For each requested property the reader resolves the candidate months,
//! keeps the partition files that exist right now, and reads them with the
//! timestamp predicate pushed into the Parquet decoder. A partition that
//! cannot be read is reported next to the results instead of failing the
//! whole query.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arrow::datatypes::{DataType, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use super::predicate::TimestampPredicate;
use super::resolver::PartitionResolver;
use crate::catalog::Catalog;
use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, PartitionReadError};
use crate::models::{PartitionFile, PropertyPath, RawTable, ScanStats, TimeRange};

/// Shared flag a host can raise to stop a running query between file reads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tables for every requested property, plus partitions that were skipped.
#[derive(Debug, Default)]
pub struct LoadResult {
    pub tables: BTreeMap<PropertyPath, RawTable>,
    pub skipped: Vec<PartitionReadError>,
}

impl LoadResult {
    pub fn get(&self, property: &PropertyPath) -> Option<&RawTable> {
        self.tables.get(property)
    }

    /// True when some partition files could not be read.
    pub fn has_warnings(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Rows read from one partition file.
struct FileScan {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    row_groups_total: usize,
    row_groups_read: usize,
    candidate_rows: usize,
}

/// Reads time ranges of catalogued properties.
pub struct RangeReader<'a> {
    catalog: &'a Catalog,
    resolver: PartitionResolver,
    timestamp_column: String,
    value_column: String,
    parallel: bool,
    pool: Option<Arc<ThreadPool>>,
    cancel: Option<CancelFlag>,
}

impl<'a> RangeReader<'a> {
    pub fn new(catalog: &'a Catalog, config: &ArchiveConfig) -> Self {
        Self {
            catalog,
            resolver: PartitionResolver::new(config.file_extension.clone()),
            timestamp_column: config.timestamp_column.clone(),
            value_column: config.value_column.clone(),
            parallel: config.reader.parallel,
            pool: None,
            cancel: None,
        }
    }

    /// Run parallel file reads on `pool` instead of rayon's global pool.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Read `range` for every property in `properties`.
    ///
    /// Unknown properties fail the call before any file is opened.
    pub fn read_range(
        &self,
        properties: &[PropertyPath],
        range: &TimeRange,
    ) -> Result<LoadResult, ArchiveError> {
        let mut targets = Vec::with_capacity(properties.len());
        for property in properties {
            let dir = self.catalog.lookup(property)?;
            targets.push((property, dir));
        }

        let mut result = LoadResult::default();
        for (property, dir) in targets {
            if result.tables.contains_key(property) {
                continue;
            }
            let (table, skipped) = self.read_property(property, dir, range)?;
            result.skipped.extend(skipped);
            result.tables.insert(property.clone(), table);
        }

        Ok(result)
    }

    fn read_property(
        &self,
        property: &PropertyPath,
        dir: &Path,
        range: &TimeRange,
    ) -> Result<(RawTable, Vec<PartitionReadError>), ArchiveError> {
        let resolved = self.resolver.resolve_partitions(property, dir, range);
        let present: Vec<PartitionFile> = resolved.iter().filter(|f| f.exists()).cloned().collect();

        let mut stats = ScanStats {
            partitions_resolved: resolved.len(),
            partitions_present: present.len(),
            ..Default::default()
        };

        debug!(
            "{}: {} of {} partitions present for {} .. {}",
            property,
            present.len(),
            resolved.len(),
            range.start(),
            range.stop()
        );

        let predicate = TimestampPredicate::new(self.timestamp_column.clone(), range);
        let outcomes = self.read_files(&present, &predicate)?;

        let mut skipped = Vec::new();
        let mut schema: Option<SchemaRef> = None;
        let mut batches = Vec::new();

        // outcomes are in month order, whatever order the reads finished in
        for (file, outcome) in present.iter().zip(outcomes) {
            let scan = match outcome {
                Ok(scan) => scan,
                Err(reason) => {
                    warn!("Skipping partition {:?}: {}", file.path, reason);
                    skipped.push(PartitionReadError::new(file.path.clone(), file.month, reason));
                    continue;
                }
            };

            match &schema {
                Some(expected) if expected.fields() != scan.schema.fields() => {
                    let reason = "schema differs from earlier partitions of this property";
                    warn!("Skipping partition {:?}: {}", file.path, reason);
                    skipped.push(PartitionReadError::new(file.path.clone(), file.month, reason));
                    continue;
                }
                Some(_) => {}
                None => schema = Some(scan.schema.clone()),
            }

            stats.row_groups_total += scan.row_groups_total;
            stats.row_groups_read += scan.row_groups_read;
            stats.candidate_rows += scan.candidate_rows;
            batches.extend(scan.batches);
        }

        let table = match schema {
            Some(schema) => {
                stats.rows_returned = batches.iter().map(|b| b.num_rows()).sum();
                RawTable::from_batches(
                    &schema,
                    &batches,
                    &self.timestamp_column,
                    &self.value_column,
                    stats,
                )?
            }
            None => RawTable::empty(&self.timestamp_column, &self.value_column).with_stats(stats),
        };

        info!(
            "{}: {} rows from {} partitions ({} candidate rows, {} skipped)",
            property,
            table.num_rows(),
            stats.partitions_present,
            stats.candidate_rows,
            skipped.len()
        );

        Ok((table, skipped))
    }

    /// Read every file, in parallel when enabled. Results keep the order of
    /// `files`.
    fn read_files(
        &self,
        files: &[PartitionFile],
        predicate: &TimestampPredicate,
    ) -> Result<Vec<Result<FileScan, String>>, ArchiveError> {
        let read_one = |file: &PartitionFile| -> Result<Result<FileScan, String>, ArchiveError> {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                return Err(ArchiveError::Cancelled);
            }
            Ok(self.read_file(file, predicate))
        };

        let outcomes: Vec<Result<Result<FileScan, String>, ArchiveError>> =
            if self.parallel && files.len() > 1 {
                match &self.pool {
                    Some(pool) => pool.install(|| files.par_iter().map(read_one).collect()),
                    None => files.par_iter().map(read_one).collect(),
                }
            } else {
                files.iter().map(read_one).collect()
            };

        outcomes.into_iter().collect()
    }

    /// Read one partition with row-group pruning and the row filter applied.
    fn read_file(
        &self,
        file: &PartitionFile,
        predicate: &TimestampPredicate,
    ) -> Result<FileScan, String> {
        let handle = File::open(&file.path).map_err(|e| e.to_string())?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(handle).map_err(|e| e.to_string())?;

        // schema-level metadata (e.g. pandas' index range) varies per file
        let schema: SchemaRef = Arc::new(Schema::new(builder.schema().fields().clone()));
        let ts_type = column_type(&schema, &self.timestamp_column)?;
        if !(ts_type.is_numeric() || matches!(ts_type, DataType::Timestamp(_, _))) {
            return Err(format!(
                "column '{}' has non-time type {}",
                self.timestamp_column, ts_type
            ));
        }
        let value_type = column_type(&schema, &self.value_column)?;
        if !value_type.is_numeric() {
            return Err(format!(
                "column '{}' has non-numeric type {}",
                self.value_column, value_type
            ));
        }

        let leaf = predicate
            .leaf_index(builder.parquet_schema())
            .ok_or_else(|| format!("column '{}' is not a top-level leaf", predicate.column()))?;

        let row_groups_total = builder.metadata().num_row_groups();
        let row_groups = predicate.prune_row_groups(builder.metadata(), leaf, &ts_type);
        let candidate_rows: usize = row_groups
            .iter()
            .map(|&i| builder.metadata().row_group(i).num_rows() as usize)
            .sum();
        let row_filter = predicate.row_filter(builder.parquet_schema(), leaf);
        let row_groups_read = row_groups.len();

        let batches = if row_groups.is_empty() {
            Vec::new()
        } else {
            let reader = builder
                .with_row_groups(row_groups)
                .with_row_filter(row_filter)
                .build()
                .map_err(|e| e.to_string())?;
            reader
                .map(|batch| {
                    batch.and_then(|b| RecordBatch::try_new(schema.clone(), b.columns().to_vec()))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())?
        };

        debug!(
            "Read {:?}: {}/{} row groups, {} candidate rows",
            file.path, row_groups_read, row_groups_total, candidate_rows
        );

        Ok(FileScan {
            schema,
            batches,
            row_groups_total,
            row_groups_read,
            candidate_rows,
        })
    }
}

fn column_type(schema: &SchemaRef, name: &str) -> Result<DataType, String> {
    schema
        .field_with_name(name)
        .map(|f| f.data_type().clone())
        .map_err(|_| format!("missing column '{}'", name))
}
