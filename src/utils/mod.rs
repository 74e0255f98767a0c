//! Shared utilities for arrow column access and logging

pub mod arrow;
pub mod logging;

pub use self::arrow::array_utils::{
    display_strings, downcast_array, get_column_by_name, get_column_index, with_column,
};
