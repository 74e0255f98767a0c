//! Key-equality joins between two tables
//!
//! Joins are hash joins keyed on the string rendering of the key cells. Both
//! key columns must share a type; a mismatch is reported instead of quietly
//! producing an empty result.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::utils::{display_strings, get_column_by_name};

/// Suffix appended to left column names that also appear on the right
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix appended to right column names that also appear on the left
pub const RIGHT_SUFFIX: &str = "_y";

/// Join policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only rows whose key matches on both sides
    Inner,
    /// Every left row; right columns are null when nothing matches
    Left,
}

/// Join `left` and `right` on `left.left_on == right.right_on`
///
/// A left key matching several right rows yields one output row per match,
/// in left-row order then right-row order. Null keys never match.
/// Output columns are all left columns followed by all right columns; a name
/// present on both sides is suffixed with `_x` / `_y`.
pub fn join(
    left: &RecordBatch,
    right: &RecordBatch,
    left_on: &str,
    right_on: &str,
    join_type: JoinType,
) -> Result<RecordBatch> {
    let left_key = get_column_by_name(left, left_on)?;
    let right_key = get_column_by_name(right, right_on)?;
    check_key_types(left_on, &left_key, right_on, &right_key)?;

    let left_strings = display_strings(&left_key)?;
    let right_strings = display_strings(&right_key)?;

    let mut index: FxHashMap<&str, Vec<u32>> = FxHashMap::default();
    for (row, key) in right_strings.iter().enumerate() {
        if let Some(key) = key {
            index.entry(key).or_default().push(row_index(row)?);
        }
    }

    let mut left_rows: Vec<u32> = Vec::with_capacity(left.num_rows());
    let mut right_rows: Vec<Option<u32>> = Vec::with_capacity(left.num_rows());
    for (row, key) in left_strings.iter().enumerate() {
        match key.and_then(|k| index.get(k)) {
            Some(matches) => {
                for &right_row in matches {
                    left_rows.push(row_index(row)?);
                    right_rows.push(Some(right_row));
                }
            }
            None if join_type == JoinType::Left => {
                left_rows.push(row_index(row)?);
                right_rows.push(None);
            }
            None => {}
        }
    }

    let left_indices = UInt32Array::from(left_rows);
    let right_indices = UInt32Array::from(right_rows);

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(left.num_columns() + right.num_columns());
    for column in left.columns() {
        columns.push(take(column.as_ref(), &left_indices, None)?);
    }
    for column in right.columns() {
        columns.push(take(column.as_ref(), &right_indices, None)?);
    }

    log::debug!(
        "{join_type:?} join {left_on}={right_on}: {} x {} rows -> {} rows",
        left.num_rows(),
        right.num_rows(),
        left_indices.len()
    );

    Ok(RecordBatch::try_new(
        Arc::new(joined_schema(&left.schema(), &right.schema())),
        columns,
    )?)
}

/// Inner join, keeping only matched rows
pub fn inner_join(
    left: &RecordBatch,
    right: &RecordBatch,
    left_on: &str,
    right_on: &str,
) -> Result<RecordBatch> {
    join(left, right, left_on, right_on, JoinType::Inner)
}

/// Left join, keeping every left row
pub fn left_join(
    left: &RecordBatch,
    right: &RecordBatch,
    left_on: &str,
    right_on: &str,
) -> Result<RecordBatch> {
    join(left, right, left_on, right_on, JoinType::Left)
}

fn check_key_types(left_on: &str, left: &ArrayRef, right_on: &str, right: &ArrayRef) -> Result<()> {
    let compatible = match (left.data_type(), right.data_type()) {
        (l, r) if l == r => true,
        (DataType::Utf8 | DataType::LargeUtf8, DataType::Utf8 | DataType::LargeUtf8) => true,
        (l, r) if l.is_integer() && r.is_integer() => true,
        // An all-null key column carries no type information
        (DataType::Null, _) | (_, DataType::Null) => true,
        _ => false,
    };

    if compatible {
        Ok(())
    } else {
        Err(Error::JoinKeyTypeMismatch {
            left: left_on.to_string(),
            right: right_on.to_string(),
            left_type: left.data_type().clone(),
            right_type: right.data_type().clone(),
        })
    }
}

fn joined_schema(left: &Schema, right: &Schema) -> Schema {
    let renamed = |field: &Field, other: &Schema, suffix: &str| {
        let name = if other.index_of(field.name()).is_ok() {
            format!("{}{suffix}", field.name())
        } else {
            field.name().clone()
        };
        Field::new(name, field.data_type().clone(), true)
    };

    let fields: Vec<Field> = left
        .fields()
        .iter()
        .map(|f| renamed(f, right, LEFT_SUFFIX))
        .chain(right.fields().iter().map(|f| renamed(f, left, RIGHT_SUFFIX)))
        .collect();
    Schema::new(fields)
}

fn row_index(row: usize) -> Result<u32> {
    u32::try_from(row)
        .map_err(|_| Error::InvalidArgument(format!("row index {row} exceeds u32 range")))
}
