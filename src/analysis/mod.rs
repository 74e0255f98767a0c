//! Table transformations and summaries
//!
//! Every function takes its input tables by reference and returns a new
//! table, so stages never observe each other's intermediate mutations.

pub mod cleaning;
pub mod derive;
pub mod join;
pub mod statistics;
pub mod summary;
pub mod temporal;

pub use cleaning::{drop_null_rows, fill_null};
pub use join::{JoinType, inner_join, join, left_join};
pub use statistics::{
    DurationSummary, HistogramBin, ValueCount, group_counts, histogram, mean, mean_duration,
    value_counts,
};
pub use summary::{ColumnSummary, dataset_summary};
pub use temporal::{Bucket, BucketCount, Granularity, distinct_count_by_period};
