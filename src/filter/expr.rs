//! Expression-based filtering
//!
//! This module provides an expression-based filtering system that
//! allows filtering Arrow record batches based on column values.

use arrow::array::{Array, ArrayRef, BooleanArray, Datum, Float64Array, StringArray};
use arrow::compute::kernels::cmp;
use arrow::compute::{and, cast, not, or};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};
use crate::filter::core::{BatchFilter, filter_record_batch};
use crate::utils::get_column_by_name;

/// Represents a filter expression over the columns of a table
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column equals a literal value
    Eq(String, LiteralValue),

    /// Column not equals a literal value
    NotEq(String, LiteralValue),

    /// Column is greater than a literal value
    Gt(String, LiteralValue),

    /// Column is greater than or equal to a literal value
    GtEq(String, LiteralValue),

    /// Column is less than a literal value
    Lt(String, LiteralValue),

    /// Column is less than or equal to a literal value
    LtEq(String, LiteralValue),

    /// Column is in a set of values
    In(String, Vec<LiteralValue>),

    /// Column is null
    IsNull(String),

    /// Column is not null
    IsNotNull(String),

    /// Logical AND of expressions
    And(Vec<Expr>),

    /// Logical OR of expressions
    Or(Vec<Expr>),

    /// Logical NOT of an expression
    Not(Box<Expr>),
}

/// Represents a literal value that can be used in filter expressions
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer value
    Int(i64),

    /// Floating point value
    Float(f64),

    /// String value
    String(String),
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl Expr {
    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::Gt(column.into(), value.into())
    }

    /// `column = value`
    pub fn equals(column: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    /// `column IN (values)`
    pub fn is_in<V: Into<LiteralValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }
}

/// Evaluate an expression against a record batch
///
/// The returned mask has no nulls: a comparison against a null cell is false.
pub fn evaluate_expr(batch: &RecordBatch, expr: &Expr) -> Result<BooleanArray> {
    match expr {
        Expr::Eq(col, value) => compare(batch, col, value, CmpOp::Eq),
        Expr::NotEq(col, value) => compare(batch, col, value, CmpOp::NotEq),
        Expr::Gt(col, value) => compare(batch, col, value, CmpOp::Gt),
        Expr::GtEq(col, value) => compare(batch, col, value, CmpOp::GtEq),
        Expr::Lt(col, value) => compare(batch, col, value, CmpOp::Lt),
        Expr::LtEq(col, value) => compare(batch, col, value, CmpOp::LtEq),
        Expr::In(col, values) => {
            let mut mask = BooleanArray::from(vec![false; batch.num_rows()]);
            for value in values {
                mask = or(&mask, &compare(batch, col, value, CmpOp::Eq)?)?;
            }
            Ok(mask)
        }
        Expr::IsNull(col) => Ok(arrow::compute::is_null(get_column_by_name(batch, col)?.as_ref())?),
        Expr::IsNotNull(col) => Ok(arrow::compute::is_not_null(
            get_column_by_name(batch, col)?.as_ref(),
        )?),
        Expr::And(exprs) => {
            let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
            for expr in exprs {
                mask = and(&mask, &evaluate_expr(batch, expr)?)?;
            }
            Ok(mask)
        }
        Expr::Or(exprs) => {
            let mut mask = BooleanArray::from(vec![false; batch.num_rows()]);
            for expr in exprs {
                mask = or(&mask, &evaluate_expr(batch, expr)?)?;
            }
            Ok(mask)
        }
        Expr::Not(expr) => Ok(not(&evaluate_expr(batch, expr)?)?),
    }
}

/// Count the rows of `batch` satisfying `expr`
pub fn count_matching(batch: &RecordBatch, expr: &Expr) -> Result<usize> {
    Ok(evaluate_expr(batch, expr)?.true_count())
}

fn compare(
    batch: &RecordBatch,
    col: &str,
    value: &LiteralValue,
    op: CmpOp,
) -> Result<BooleanArray> {
    let column = get_column_by_name(batch, col)?;

    let result = match value {
        LiteralValue::Int(v) => {
            let values = numeric_column(col, &column)?;
            apply_cmp(op, &values, &Float64Array::new_scalar(*v as f64))?
        }
        LiteralValue::Float(v) => {
            let values = numeric_column(col, &column)?;
            apply_cmp(op, &values, &Float64Array::new_scalar(*v))?
        }
        LiteralValue::String(s) => {
            if column.data_type() != &DataType::Utf8 {
                return Err(Error::type_mismatch(col, "Utf8", column.data_type()));
            }
            apply_cmp(op, &column, &StringArray::new_scalar(s.as_str()))?
        }
    };

    Ok(nulls_as_false(&result))
}

fn apply_cmp(op: CmpOp, lhs: &dyn Datum, rhs: &dyn Datum) -> Result<BooleanArray> {
    let result = match op {
        CmpOp::Eq => cmp::eq(lhs, rhs),
        CmpOp::NotEq => cmp::neq(lhs, rhs),
        CmpOp::Gt => cmp::gt(lhs, rhs),
        CmpOp::GtEq => cmp::gt_eq(lhs, rhs),
        CmpOp::Lt => cmp::lt(lhs, rhs),
        CmpOp::LtEq => cmp::lt_eq(lhs, rhs),
    }?;
    Ok(result)
}

fn numeric_column(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Float64 => Ok(column.clone()),
        dt if dt.is_numeric() => Ok(cast(column, &DataType::Float64)?),
        other => Err(Error::type_mismatch(name, "numeric", other)),
    }
}

fn nulls_as_false(mask: &BooleanArray) -> BooleanArray {
    if mask.null_count() == 0 {
        return mask.clone();
    }
    mask.iter().map(|v| Some(v.unwrap_or(false))).collect()
}

/// A filter that evaluates an expression against a record batch
#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expr: Expr,
}

impl ExpressionFilter {
    /// Create a new expression filter
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl BatchFilter for ExpressionFilter {
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = evaluate_expr(batch, &self.expr)?;
        filter_record_batch(batch, &mask)
    }

    fn count(&self, batch: &RecordBatch) -> Result<usize> {
        count_matching(batch, &self.expr)
    }
}
