//! Calendar-bucketed aggregation
//!
//! Timestamps are assigned to the month or year they fall in and a distinct
//! identifier count is computed per bucket. Only observed buckets appear in
//! the output; empty periods are never synthesised.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::schema::date_utils::{days_to_date, seconds_to_timestamp};
use crate::utils::{display_strings, downcast_array, get_column_by_name};

/// Grouping granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Month,
    Year,
}

/// A calendar period used as a grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    /// Yearly period (e.g., 2020)
    Year(i32),
    /// Monthly period (e.g., 2020-01)
    Month(i32, u32), // year, month
}

impl Bucket {
    /// The bucket of `granularity` that contains `date`
    #[must_use]
    pub fn of(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => Self::Month(date.year(), date.month()),
            Granularity::Year => Self::Year(date.year()),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Month(year, month) => write!(f, "{year}-{month:02}"),
        }
    }
}

/// Distinct identifier count of one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCount {
    pub bucket: Bucket,
    pub distinct_count: usize,
}

/// Calendar dates of a timestamp or date column, nulls kept
pub fn column_dates(batch: &RecordBatch, column: &str) -> Result<Vec<Option<NaiveDate>>> {
    let array = get_column_by_name(batch, column)?;
    match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, None) => {
            let values =
                downcast_array::<TimestampSecondArray>(&array, column, "Timestamp(Second)")?;
            Ok(values
                .iter()
                .map(|v| v.and_then(seconds_to_timestamp).map(|ts| ts.date()))
                .collect())
        }
        DataType::Date32 => {
            let values = downcast_array::<Date32Array>(&array, column, "Date32")?;
            Ok(values.iter().map(|v| v.and_then(days_to_date)).collect())
        }
        other => Err(Error::type_mismatch(column, "Timestamp(Second) or Date32", other)),
    }
}

/// Count distinct `id_column` values per calendar bucket of `timestamp_column`
///
/// Rows with a null timestamp are skipped and null identifiers are not
/// counted. Buckets are returned in ascending chronological order.
pub fn distinct_count_by_period(
    batch: &RecordBatch,
    timestamp_column: &str,
    granularity: Granularity,
    id_column: &str,
) -> Result<Vec<BucketCount>> {
    let dates = column_dates(batch, timestamp_column)?;
    let ids = display_strings(&get_column_by_name(batch, id_column)?)?;

    let mut buckets: BTreeMap<Bucket, FxHashSet<&str>> = BTreeMap::new();
    for (date, id) in dates.iter().zip(ids.iter()) {
        let Some(date) = date else { continue };
        let ids_in_bucket = buckets.entry(Bucket::of(*date, granularity)).or_default();
        if let Some(id) = id {
            ids_in_bucket.insert(id);
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(bucket, ids)| BucketCount {
            bucket,
            distinct_count: ids.len(),
        })
        .collect())
}

/// Render bucket counts as a `(label, count)` table
pub fn bucket_counts_to_batch(
    counts: &[BucketCount],
    bucket_label: &str,
    count_label: &str,
) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new(bucket_label, DataType::Utf8, false),
        Field::new(count_label, DataType::Int64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(counts.iter().map(|c| c.bucket.to_string()))),
        Arc::new(Int64Array::from_iter_values(counts.iter().map(|c| c.distinct_count as i64))),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}
