//! Console output utilities
//!
//! This module provides utilities for formatted console output.

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::analysis::{DurationSummary, ValueCount};
use crate::error::Result;

/// Print a titled table
pub fn print_table(title: &str, batch: &RecordBatch) -> Result<()> {
    println!("\n{title}");
    println!("{}", pretty_format_batches(std::slice::from_ref(batch))?);
    Ok(())
}

/// Print a frequency table as `value    count` lines
pub fn print_value_counts(title: &str, counts: &[ValueCount]) {
    println!("\n{title}:");
    for line in value_count_lines(counts) {
        println!("{line}");
    }
}

/// Frequency table lines with values padded to a common character width
#[must_use]
pub fn value_count_lines(counts: &[ValueCount]) -> Vec<String> {
    let width = counts.iter().map(|c| c.value.chars().count()).max().unwrap_or(0);
    counts
        .iter()
        .map(|count| format!("{:<width$}  {}", count.value, count.count))
        .collect()
}

/// Print a labelled count line
pub fn print_count(label: &str, count: usize) {
    println!("\n{}", count_line(label, count));
}

fn count_line(label: &str, count: usize) -> String {
    format!("{label}: {count}")
}

/// Print the average stay line
pub fn print_duration_summary(summary: &DurationSummary) {
    println!(
        "\nAverage hospital stay duration: {:.2} hours ({:.2} days)",
        summary.hours, summary.days
    );
}
