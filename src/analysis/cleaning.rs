//! Null repairs applied once before analysis
//!
//! The two repairs are independent policies on different tables: rows with
//! any null are dropped from patients, while a single encounters column has
//! its nulls replaced by a sentinel.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray};
use arrow::compute::{and, is_not_null};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};
use crate::filter::core::filter_record_batch;
use crate::utils::{get_column_index, with_column};

/// Remove every row that has at least one null cell
pub fn drop_null_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for column in batch.columns() {
        if column.logical_null_count() == 0 {
            continue;
        }
        mask = and(&mask, &is_not_null(column.as_ref())?)?;
    }

    let cleaned = filter_record_batch(batch, &mask)?;
    log::debug!(
        "Dropped {} of {} rows containing nulls",
        batch.num_rows() - cleaned.num_rows(),
        batch.num_rows()
    );
    Ok(cleaned)
}

/// Replace nulls in the string column `column` with `sentinel`
///
/// All other columns are returned unchanged.
pub fn fill_null(batch: &RecordBatch, column: &str, sentinel: &str) -> Result<RecordBatch> {
    let idx = get_column_index(batch, column)?;
    let array = batch.column(idx);
    let strings = match array.data_type() {
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::type_mismatch(column, "Utf8", array.data_type()))?,
        other => return Err(Error::type_mismatch(column, "Utf8", other)),
    };

    if strings.null_count() == 0 {
        return Ok(batch.clone());
    }

    let filled: StringArray = strings
        .iter()
        .map(|value| Some(value.unwrap_or(sentinel)))
        .collect();
    log::debug!("Filled {} nulls in '{column}' with '{sentinel}'", strings.null_count());

    with_column(batch, column, Arc::new(filled) as ArrayRef)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};

    fn sample() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("Id", DataType::Utf8, true),
            Field::new("MARITAL", DataType::Utf8, true),
            Field::new("INCOME", DataType::Int64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec![Some("p1"), Some("p2"), Some("p3")])),
                Arc::new(StringArray::from(vec![Some("M"), None, Some("S")])),
                Arc::new(Int64Array::from(vec![Some(1), Some(2), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_drop_null_rows_leaves_no_nulls() {
        let cleaned = drop_null_rows(&sample()).unwrap();
        assert_eq!(cleaned.num_rows(), 1);
        assert!(cleaned.columns().iter().all(|c| c.null_count() == 0));
    }

    #[test]
    fn test_drop_null_rows_may_empty_table() {
        let schema = Schema::new(vec![Field::new("A", DataType::Utf8, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec![None::<&str>, None]))],
        )
        .unwrap();
        assert_eq!(drop_null_rows(&batch).unwrap().num_rows(), 0);
    }

    #[test]
    fn test_fill_null_only_touches_designated_column() {
        let input = sample();
        let filled = fill_null(&input, "MARITAL", "Unknown").unwrap();

        let marital = filled.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(marital.null_count(), 0);
        assert_eq!(marital.value(1), "Unknown");
        assert_eq!(filled.column(0), input.column(0));
        assert_eq!(filled.column(2), input.column(2));
    }

    #[test]
    fn test_fill_null_rejects_non_string_column() {
        let err = fill_null(&sample(), "INCOME", "0").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
