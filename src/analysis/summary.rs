//! Per-table column summaries

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::utils::display_strings;

/// Missing and distinct value counts of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub dataset: String,
    pub column: String,
    pub missing_values: usize,
    pub unique_values: usize,
    pub data_type: DataType,
}

/// Summarise every column of `batch`
pub fn summarize_columns(batch: &RecordBatch, name: &str) -> Result<Vec<ColumnSummary>> {
    let schema = batch.schema();
    schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, column)| {
            Ok(ColumnSummary {
                dataset: name.to_string(),
                column: field.name().clone(),
                missing_values: column.logical_null_count() + count_nan(column)?,
                unique_values: count_distinct(column)?,
                data_type: field.data_type().clone(),
            })
        })
        .collect()
}

/// Count the distinct non-null, non-NaN values of a column
pub fn count_distinct(column: &ArrayRef) -> Result<usize> {
    let strings = display_strings(column)?;
    let distinct: FxHashSet<&str> = match nan_mask(column)? {
        Some(nan) => strings
            .iter()
            .zip(nan)
            .filter(|(_, is_nan)| !is_nan)
            .filter_map(|(value, _)| value)
            .collect(),
        None => strings.iter().flatten().collect(),
    };
    Ok(distinct.len())
}

/// Number of NaN cells in a floating point column
fn count_nan(column: &ArrayRef) -> Result<usize> {
    Ok(nan_mask(column)?.map_or(0, |nan| nan.into_iter().filter(|is_nan| *is_nan).count()))
}

/// Per-row NaN flags, or `None` for columns that cannot hold NaN
fn nan_mask(column: &ArrayRef) -> Result<Option<Vec<bool>>> {
    if !matches!(
        column.data_type(),
        DataType::Float16 | DataType::Float32 | DataType::Float64
    ) {
        return Ok(None);
    }
    let floats = cast(column, &DataType::Float64)?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::type_mismatch("<cast>", "Float64", floats.data_type()))?;
    Ok(Some(floats.iter().map(|v| v.is_some_and(f64::is_nan)).collect()))
}

/// Build the summary table of `batch`
///
/// The result has one row per input column with the columns `Dataset`,
/// `Column`, `Missing Values`, `Unique Values` and `Data Type`.
pub fn dataset_summary(batch: &RecordBatch, name: &str) -> Result<RecordBatch> {
    let summaries = summarize_columns(batch, name)?;

    let schema = Schema::new(vec![
        Field::new("Dataset", DataType::Utf8, false),
        Field::new("Column", DataType::Utf8, false),
        Field::new("Missing Values", DataType::Int64, false),
        Field::new("Unique Values", DataType::Int64, false),
        Field::new("Data Type", DataType::Utf8, false),
    ]);

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.dataset.as_str()))),
        Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.column.as_str()))),
        Arc::new(Int64Array::from_iter_values(summaries.iter().map(|s| s.missing_values as i64))),
        Arc::new(Int64Array::from_iter_values(summaries.iter().map(|s| s.unique_values as i64))),
        Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.data_type.to_string()))),
    ];

    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("CITY", DataType::Utf8, true),
            Field::new("PAYER_COVERAGE", DataType::Float64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec![
                    Some("Boston"),
                    None,
                    Some("Boston"),
                    Some("Quincy"),
                ])),
                Arc::new(Float64Array::from(vec![Some(0.0), Some(5.0), None, None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_one_row_per_column() {
        let summary = dataset_summary(&sample(), "Patients").unwrap();
        assert_eq!(summary.num_rows(), 2);
        assert_eq!(summary.num_columns(), 5);
    }

    #[test]
    fn test_missing_and_unique_counts() {
        let summaries = summarize_columns(&sample(), "Patients").unwrap();
        assert_eq!(summaries[0].missing_values, 1);
        assert_eq!(summaries[0].unique_values, 2);
        assert_eq!(summaries[1].missing_values, 2);
        assert_eq!(summaries[1].unique_values, 2);
        assert_eq!(summaries[1].data_type, DataType::Float64);
    }

    #[test]
    fn test_nan_counts_as_missing_and_not_distinct() {
        let schema = Schema::new(vec![Field::new("AMOUNT", DataType::Float64, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Float64Array::from(vec![
                Some(1.0),
                Some(f64::NAN),
                Some(3.0),
                None,
                Some(f64::NAN),
            ]))],
        )
        .unwrap();

        let summaries = summarize_columns(&batch, "Payers").unwrap();
        assert_eq!(summaries[0].missing_values, 3);
        assert_eq!(summaries[0].unique_values, 2);
    }

    #[test]
    fn test_text_nan_is_an_ordinary_value() {
        let column: ArrayRef = Arc::new(StringArray::from(vec!["NaN", "Boston"]));
        assert_eq!(count_distinct(&column).unwrap(), 2);
    }

    #[test]
    fn test_empty_table_yields_empty_summary() {
        let empty = RecordBatch::new_empty(Arc::new(Schema::empty()));
        let summary = dataset_summary(&empty, "Empty").unwrap();
        assert_eq!(summary.num_rows(), 0);
    }
}
