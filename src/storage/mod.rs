//! Read path over the partitioned archive.
//!
//! - `resolver`: maps a time range to candidate monthly partition files
//! - `predicate`: timestamp range pushed into Parquet reads
//! - `parquet`: reads existing partitions into per-property tables

pub mod parquet;
pub mod predicate;
pub mod resolver;

pub use self::parquet::{CancelFlag, LoadResult, RangeReader};
pub use self::predicate::TimestampPredicate;
pub use self::resolver::{resolve_months, resolve_months_open, PartitionResolver};
