//! Derived columns
//!
//! Each function recomputes its column from the source columns and replaces
//! any existing column of the same name, so calling it again on its own
//! output is a no-op and a stale copy can never survive a source change.

use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;

use crate::analysis::temporal::column_dates;
use crate::error::{Error, Result};
use crate::utils::{downcast_array, get_column_by_name, with_column};

pub const AGE: &str = "AGE";
pub const BIRTH_YEAR: &str = "BIRTH_YEAR";
pub const DURATION_HOURS: &str = "DURATION_HOURS";
pub const YEAR: &str = "YEAR";

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Add `BIRTH_YEAR`, the calendar year of `BIRTHDATE`
pub fn with_birth_year(patients: &RecordBatch) -> Result<RecordBatch> {
    let years = year_values(patients, "BIRTHDATE")?;
    with_column(patients, BIRTH_YEAR, Arc::new(years))
}

/// Add `AGE = reference_year - year(BIRTHDATE)`
pub fn with_age(patients: &RecordBatch, reference_year: i32) -> Result<RecordBatch> {
    let ages: Int64Array = year_values(patients, "BIRTHDATE")?
        .iter()
        .map(|year| year.map(|y| i64::from(reference_year) - y))
        .collect();
    with_column(patients, AGE, Arc::new(ages))
}

/// Add `YEAR`, the calendar year of `source` (usually `START`)
pub fn with_year(batch: &RecordBatch, source: &str) -> Result<RecordBatch> {
    let years = year_values(batch, source)?;
    with_column(batch, YEAR, Arc::new(years))
}

/// Add `DURATION_HOURS = (STOP - START)` in hours
///
/// The duration is null when either timestamp is null.
pub fn with_duration_hours(encounters: &RecordBatch) -> Result<RecordBatch> {
    let start = timestamp_seconds(encounters, "START")?;
    let stop = timestamp_seconds(encounters, "STOP")?;

    let hours: Float64Array = start
        .iter()
        .zip(stop.iter())
        .map(|(start, stop)| match (start, stop) {
            (Some(start), Some(stop)) => Some((stop - start) as f64 / SECONDS_PER_HOUR),
            _ => None,
        })
        .collect();

    with_column(encounters, DURATION_HOURS, Arc::new(hours))
}

fn year_values(batch: &RecordBatch, column: &str) -> Result<Int64Array> {
    Ok(column_dates(batch, column)?
        .into_iter()
        .map(|date| date.map(|d| i64::from(d.year())))
        .collect())
}

fn timestamp_seconds(batch: &RecordBatch, column: &str) -> Result<Vec<Option<i64>>> {
    let array = get_column_by_name(batch, column)?;
    match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, None) => {
            let values = downcast_array::<arrow::array::TimestampSecondArray>(
                &array,
                column,
                "Timestamp(Second)",
            )?;
            Ok(values.iter().collect())
        }
        other => Err(Error::type_mismatch(column, "Timestamp(Second)", other)),
    }
}
