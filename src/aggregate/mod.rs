//! Aggregation of per-property tables.
//!
//! - Mean resampling into epoch-aligned buckets, with incremental extension
//! - Min/max decimation for plots
//! - Correlation across resampled properties

pub mod correlation;
pub mod decimate;
pub mod resample;

pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use decimate::decimate_min_max;
pub use resample::{bucket_mean, extend, Bucket, ResampledSeries};
