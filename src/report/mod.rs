//! Output collaborators: console tables and chart sinks
//!
//! Both are terminal sinks. Nothing they receive is fed back into the
//! pipeline.

pub mod chart;
pub mod console;

pub use chart::{
    ChartKind, ChartSink, ChartSpec, JsonChartSink, LogChartSink, RecordingChartSink,
};
pub use console::{
    print_count, print_duration_summary, print_table, print_value_counts, value_count_lines,
};
