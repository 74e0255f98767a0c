//! Chart hand-off
//!
//! Rendering is external. The pipeline describes each chart with a
//! [`ChartSpec`] and passes it, together with its data table, to a
//! [`ChartSink`].

use std::io::Write;

use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::error::{Error, Result};

/// Kind of chart requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    Histogram,
    /// Bar chart with one frame per value of `frame`
    AnimatedBar { frame: String },
}

/// Description of one chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    /// Column plotted on the x axis
    pub x: String,
    /// Column plotted on the y axis
    pub y: String,
}

impl ChartSpec {
    pub fn new(
        title: impl Into<String>,
        kind: ChartKind,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            kind,
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Receiver of finished chart data
pub trait ChartSink {
    /// Render `data` as described by `chart`
    fn render(&mut self, chart: &ChartSpec, data: &RecordBatch) -> Result<()>;
}

/// Sink that only logs what would have been drawn
#[derive(Debug, Default)]
pub struct LogChartSink;

impl ChartSink for LogChartSink {
    fn render(&mut self, chart: &ChartSpec, data: &RecordBatch) -> Result<()> {
        log::info!(
            "Chart '{}' ({:?}): {} x {} over {} rows",
            chart.title,
            chart.kind,
            chart.x,
            chart.y,
            data.num_rows()
        );
        Ok(())
    }
}

/// Sink writing one JSON document per chart to a writer
///
/// Each line holds `{"chart": <spec>, "rows": [<row objects>]}` for an
/// external renderer to consume.
#[derive(Debug)]
pub struct JsonChartSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonChartSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChartSink for JsonChartSink<W> {
    fn render(&mut self, chart: &ChartSpec, data: &RecordBatch) -> Result<()> {
        let mut rows_writer = ArrayWriter::new(Vec::new());
        rows_writer.write(data)?;
        rows_writer.finish()?;
        let buffer = rows_writer.into_inner();

        let rows: serde_json::Value = if buffer.is_empty() {
            serde_json::Value::Array(Vec::new())
        } else {
            serde_json::from_slice(&buffer)?
        };

        let document = serde_json::json!({ "chart": chart, "rows": rows });
        serde_json::to_writer(&mut self.writer, &document)?;
        writeln!(self.writer).map_err(|e| Error::Chart(e.to_string()))?;
        Ok(())
    }
}

/// Sink that keeps every chart in memory
#[derive(Debug, Default)]
pub struct RecordingChartSink {
    pub charts: Vec<(ChartSpec, RecordBatch)>,
}

impl RecordingChartSink {
    /// Find a recorded chart by title
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&(ChartSpec, RecordBatch)> {
        self.charts.iter().find(|(spec, _)| spec.title == title)
    }
}

impl ChartSink for RecordingChartSink {
    fn render(&mut self, chart: &ChartSpec, data: &RecordBatch) -> Result<()> {
        self.charts.push((chart.clone(), data.clone()));
        Ok(())
    }
}
