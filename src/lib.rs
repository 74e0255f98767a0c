//! Exploratory analysis of tabular healthcare records
//!
//! Loads the encounter, patient, organization, payer, procedure and data
//! dictionary CSV files into Arrow record batches, then runs a pipeline of
//! named stages computing summaries, joins, calendar aggregates and
//! frequency tables. Results are printed and handed to a chart sink.

pub mod analysis;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod utils;

// Core types
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use pipeline::{Artifacts, Pipeline, Stage, StageContext, healthcare_pipeline};
pub use schema::{TableId, TableSchema};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Filtering capabilities
pub use filter::{Expr, LiteralValue, evaluate_expr, filter_record_batch};

// Loading
pub use loader::{load_all, load_table, read_csv};

// Output
pub use report::{ChartKind, ChartSink, ChartSpec, JsonChartSink, LogChartSink, RecordingChartSink};
