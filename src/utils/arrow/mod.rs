//! Arrow helpers

pub mod array_utils;
