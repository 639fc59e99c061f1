//! Core data models for archive queries.

mod bucket;
mod partition;
mod property;
mod table;
mod time_range;

pub use bucket::*;
pub use partition::*;
pub use property::*;
pub use table::*;
pub use time_range::*;

pub(crate) use table::{float_column, seconds_column};
