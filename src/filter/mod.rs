//! Expression-based row filtering
//!
//! Predicates are written as [`Expr`] trees and evaluated against a record
//! batch into a boolean mask. Null cells never satisfy a comparison.

pub mod core;
pub mod expr;

pub use self::core::{BatchFilter, filter_record_batch};
pub use self::expr::{Expr, ExpressionFilter, LiteralValue, count_matching, evaluate_expr};
