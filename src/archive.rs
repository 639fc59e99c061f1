//! Query facade over one archive root.
//!
//! [`Archive`] owns the configuration, the property catalog and the optional
//! read pool. Every call is synchronous; partition files are re-checked on
//! each load, while the catalog only changes on [`Archive::refresh`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::aggregate::{bucket_mean, decimate_min_max, ResampledSeries};
use crate::catalog::{build_catalog, Catalog};
use crate::config::{ArchiveConfig, ConfigError, ReaderConfig};
use crate::error::ArchiveError;
use crate::models::{BucketWidth, MonthPartition, PropertyPath, RawTable, TimeRange};
use crate::storage::{CancelFlag, LoadResult, RangeReader};

pub struct Archive {
    config: ArchiveConfig,
    catalog: Catalog,
    pool: Option<Arc<ThreadPool>>,
}

fn build_pool(reader: &ReaderConfig) -> Result<Option<Arc<ThreadPool>>, ConfigError> {
    let threads = match (reader.parallel, reader.max_threads) {
        (true, Some(n)) => n,
        _ => return Ok(None),
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("archive-read-{}", i))
        .build()
        .map_err(|e| ConfigError::ValidationError(format!("cannot build read pool: {}", e)))?;
    Ok(Some(Arc::new(pool)))
}

impl Archive {
    /// Validate `config` and catalogue its root.
    pub fn open(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        let catalog = build_catalog(&config.root)?;
        let pool = build_pool(&config.reader)?;
        Ok(Self {
            config,
            catalog,
            pool,
        })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Display key -> canonical directory of every known property.
    pub fn get_catalog(&self) -> BTreeMap<String, PathBuf> {
        self.catalog.by_display()
    }

    /// Rebuild the catalog with a full walk. The old catalog is kept when
    /// the walk fails.
    pub fn refresh(&mut self) -> Result<usize, ArchiveError> {
        let catalog = build_catalog(&self.config.root)?;
        info!(
            "Catalog refreshed: {} -> {} properties",
            self.catalog.len(),
            catalog.len()
        );
        self.catalog = catalog;
        Ok(self.catalog.len())
    }

    /// Months with a partition file on disk for a display key.
    pub fn available_months(&self, display_key: &str) -> Result<Vec<MonthPartition>, ArchiveError> {
        let property = self.catalog.resolve(display_key)?;
        self.catalog
            .available_months(&property, &self.config.file_extension)
    }

    fn reader(&self) -> RangeReader<'_> {
        let reader = RangeReader::new(&self.catalog, &self.config);
        match &self.pool {
            Some(pool) => reader.with_pool(pool.clone()),
            None => reader,
        }
    }

    /// Load display keys over `[start, stop]`.
    ///
    /// A missing `stop` means now; a missing `start` means the first instant
    /// of the current month.
    pub fn load(
        &self,
        display_keys: &[&str],
        start: Option<DateTime<Utc>>,
        stop: Option<DateTime<Utc>>,
    ) -> Result<LoadResult, ArchiveError> {
        self.load_at(display_keys, start, stop, Utc::now())
    }

    /// [`Archive::load`] with an explicit "now".
    pub fn load_at(
        &self,
        display_keys: &[&str],
        start: Option<DateTime<Utc>>,
        stop: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<LoadResult, ArchiveError> {
        let properties = display_keys
            .iter()
            .map(|key| key.parse::<PropertyPath>())
            .collect::<Result<Vec<_>, _>>()?;
        let range = TimeRange::resolve(start, stop, now)?;
        self.load_paths(&properties, &range)
    }

    pub fn load_paths(
        &self,
        properties: &[PropertyPath],
        range: &TimeRange,
    ) -> Result<LoadResult, ArchiveError> {
        self.reader().read_range(properties, range)
    }

    /// Like [`Archive::load_paths`], stopping between files once `cancel`
    /// is raised.
    pub fn load_paths_cancellable(
        &self,
        properties: &[PropertyPath],
        range: &TimeRange,
        cancel: CancelFlag,
    ) -> Result<LoadResult, ArchiveError> {
        self.reader().with_cancel(cancel).read_range(properties, range)
    }

    /// Mean-resample `table`, with the configured bucket when `width` is None.
    pub fn resample(
        &self,
        table: &RawTable,
        width: Option<BucketWidth>,
    ) -> Result<ResampledSeries, ArchiveError> {
        let width = match width {
            Some(width) => width,
            None => self.config.default_bucket_width()?,
        };
        bucket_mean(table, width)
    }

    /// Decimate `table` to the configured display-point budget.
    pub fn decimate(
        &self,
        table: &RawTable,
        view: Option<(f64, f64)>,
    ) -> Result<Vec<(f64, f64)>, ArchiveError> {
        let points = table.points()?;
        Ok(decimate_min_max(&points, view, self.config.display_points))
    }
}
