//! Error handling for the aggregation pipeline.

use std::io;
use std::path::PathBuf;

use arrow_schema::{ArrowError, DataType};

pub mod util;

/// Errors raised while loading, transforming or reporting healthcare tables
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input file does not exist
    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error raised by an arrow kernel
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// A CSV row could not be parsed (usually an inconsistent field count)
    #[error("Malformed row in {}: {message}", .path.display())]
    MalformedRow { path: PathBuf, message: String },

    /// A table does not match its declared schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// A referenced column does not exist
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// A column exists but has the wrong type for the operation
    #[error("Column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: DataType,
    },

    /// Join key columns have incompatible types
    #[error(
        "Join key type mismatch: '{left}' ({left_type}) \
         cannot be joined with '{right}' ({right_type})"
    )]
    JoinKeyTypeMismatch {
        left: String,
        right: String,
        left_type: DataType,
        right_type: DataType,
    },

    /// A statistic is undefined for its input (e.g. the mean of an empty column)
    #[error("Domain error: {0}")]
    Domain(String),

    /// An argument is outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pipeline stage was run before one of its inputs was produced
    #[error("Stage '{stage}' requires artifact '{artifact}' which has not been produced")]
    MissingArtifact { stage: String, artifact: String },

    /// No stage with the given name is registered
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Error raised by a chart sink
    #[error("Chart output error: {0}")]
    Chart(String),
}

impl Error {
    /// Shorthand for a missing column
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Shorthand for a column of unexpected type
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: &DataType,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            actual: actual.clone(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Chart(error.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
