//! Statistical summaries
//!
//! Means, frequency tables, grouped counts and histograms over single
//! columns. Statistics that are undefined for empty input return
//! [`Error::Domain`] instead of a NaN.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::{SortColumn, cast, lexsort_to_indices, take};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::analysis::derive::DURATION_HOURS;
use crate::error::{Error, Result};
use crate::utils::{display_strings, get_column_by_name};

pub const HOURS_PER_DAY: f64 = 24.0;

/// Name of the count column produced by [`group_counts`] and [`value_counts_to_batch`]
pub const COUNT: &str = "COUNT";

/// Average encounter duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSummary {
    pub hours: f64,
    pub days: f64,
}

impl DurationSummary {
    #[must_use]
    pub fn from_hours(hours: f64) -> Self {
        Self {
            hours,
            days: hours / HOURS_PER_DAY,
        }
    }
}

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// One histogram bin; `upper` is exclusive except for the last bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Non-null, non-NaN values of a numeric column as `f64`
pub fn numeric_values(batch: &RecordBatch, column: &str) -> Result<Vec<f64>> {
    let array = get_column_by_name(batch, column)?;
    if !array.data_type().is_numeric() {
        return Err(Error::type_mismatch(column, "numeric", array.data_type()));
    }
    let floats = cast(&array, &DataType::Float64)?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::type_mismatch(column, "Float64", floats.data_type()))?;
    Ok(floats.iter().flatten().filter(|v| !v.is_nan()).collect())
}

/// Arithmetic mean of the non-null, non-NaN values of `column`
pub fn mean(batch: &RecordBatch, column: &str) -> Result<f64> {
    let values = numeric_values(batch, column)?;
    if values.is_empty() {
        return Err(Error::Domain(format!(
            "mean of '{column}' is undefined: no non-null values"
        )));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of `DURATION_HOURS`, in hours and days
pub fn mean_duration(encounters: &RecordBatch) -> Result<DurationSummary> {
    mean(encounters, DURATION_HOURS).map(DurationSummary::from_hours)
}

/// Frequency table of `column`
///
/// Sorted by descending count; equal counts keep the order in which the
/// values were first encountered. Nulls are not counted.
pub fn value_counts(
    batch: &RecordBatch,
    column: &str,
    top_n: Option<usize>,
) -> Result<Vec<ValueCount>> {
    let strings = display_strings(&get_column_by_name(batch, column)?)?;

    let mut positions: FxHashMap<&str, usize> = FxHashMap::default();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in strings.iter().flatten() {
        match positions.get(value) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // sort_by is stable, which keeps first-encountered order on ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(counts
        .into_iter()
        .take(top_n.unwrap_or(usize::MAX))
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect())
}

/// Render a frequency table as a `(value_label, COUNT)` table
pub fn value_counts_to_batch(counts: &[ValueCount], value_label: &str) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new(value_label, DataType::Utf8, false),
        Field::new(COUNT, DataType::Int64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(counts.iter().map(|c| c.value.as_str()))),
        Arc::new(Int64Array::from_iter_values(counts.iter().map(|c| c.count as i64))),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Count rows per combination of `keys`
///
/// Returns the key columns (original types) followed by `COUNT`, sorted by
/// the keys ascending. Rows with a null in any key column are not counted.
pub fn group_counts(batch: &RecordBatch, keys: &[&str]) -> Result<RecordBatch> {
    if keys.is_empty() {
        return Err(Error::InvalidArgument("group_counts needs at least one key".to_string()));
    }

    let key_arrays: Vec<ArrayRef> = keys
        .iter()
        .map(|k| get_column_by_name(batch, k))
        .collect::<Result<_>>()?;
    let key_strings: Vec<StringArray> =
        key_arrays.iter().map(display_strings).collect::<Result<_>>()?;

    let mut groups: FxHashMap<Vec<&str>, usize> = FxHashMap::default();
    let mut first_rows: Vec<u32> = Vec::new();
    let mut counts: Vec<i64> = Vec::new();
    for row in 0..batch.num_rows() {
        let Some(key) = key_strings
            .iter()
            .map(|s| (!s.is_null(row)).then(|| s.value(row)))
            .collect::<Option<Vec<&str>>>()
        else {
            continue;
        };

        match groups.get(&key) {
            Some(&group) => counts[group] += 1,
            None => {
                groups.insert(key, counts.len());
                first_rows.push(u32::try_from(row).map_err(|_| {
                    Error::InvalidArgument(format!("row index {row} exceeds u32 range"))
                })?);
                counts.push(1);
            }
        }
    }

    let first_rows = UInt32Array::from(first_rows);
    let mut columns: Vec<ArrayRef> = key_arrays
        .iter()
        .map(|array| take(array.as_ref(), &first_rows, None))
        .collect::<arrow::error::Result<_>>()?;
    columns.push(Arc::new(Int64Array::from(counts)));

    let sort_columns: Vec<SortColumn> = columns[..keys.len()]
        .iter()
        .map(|values| SortColumn {
            values: values.clone(),
            options: None,
        })
        .collect();
    let order = lexsort_to_indices(&sort_columns, None)?;
    let sorted: Vec<ArrayRef> = columns
        .iter()
        .map(|array| take(array.as_ref(), &order, None))
        .collect::<arrow::error::Result<_>>()?;

    let fields: Vec<Field> = keys
        .iter()
        .zip(&key_arrays)
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .chain(std::iter::once(Field::new(COUNT, DataType::Int64, false)))
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), sorted)?)
}

/// Equal-width histogram of `values`
///
/// The range spans the minimum and maximum value; a constant input is
/// widened to `value ± 0.5`. The last bin includes its upper edge.
pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(Error::InvalidArgument("histogram needs at least one bin".to_string()));
    }
    let Some((min, max)) = values.iter().copied().minmax().into_option() else {
        return Err(Error::Domain("histogram of an empty column is undefined".to_string()));
    };

    let (lower, upper) = if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (upper - lower) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values {
        let idx = (((value - lower) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lower + width * i as f64,
            upper: lower + width * (i + 1) as f64,
            count,
        })
        .collect())
}

/// Render histogram bins as a `(lower, upper, COUNT)` table
pub fn histogram_to_batch(bins: &[HistogramBin]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("lower", DataType::Float64, false),
        Field::new("upper", DataType::Float64, false),
        Field::new(COUNT, DataType::Int64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from_iter_values(bins.iter().map(|b| b.lower))),
        Arc::new(Float64Array::from_iter_values(bins.iter().map(|b| b.upper))),
        Arc::new(Int64Array::from_iter_values(bins.iter().map(|b| b.count as i64))),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}
