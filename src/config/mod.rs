//! Configuration for the analysis pipeline.

use std::path::PathBuf;

use chrono::Datelike;

use crate::schema::date_utils::DateFormatConfig;

/// Default number of rows per CSV record batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Configuration for the healthcare analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Directory holding the six input CSV files
    pub data_dir: PathBuf,
    /// Year that `AGE` is measured against; `None` uses the current year
    pub reference_year: Option<i32>,
    /// Value written into missing `REASONDESCRIPTION` cells
    pub fill_sentinel: String,
    /// Number of bins in the age histogram
    pub histogram_bins: usize,
    /// Number of cities shown in the top cities ranking
    pub top_cities: usize,
    /// Number of diagnoses shown in the top diagnoses ranking
    pub top_diagnoses: usize,
    /// Rows per record batch when reading CSV files
    pub batch_size: usize,
    /// Maximum records read for schema inference (`None` reads the whole file)
    pub infer_schema_records: Option<usize>,
    /// Date format configuration for parsing temporal columns
    pub date_format_config: DateFormatConfig,
}

impl AnalysisConfig {
    /// Resolve the year used for age derivation
    #[must_use]
    pub fn effective_reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./Data"),
            reference_year: None,
            fill_sentinel: "Unknown".to_string(),
            histogram_bins: 20,
            top_cities: 5,
            top_diagnoses: 10,
            batch_size: DEFAULT_BATCH_SIZE,
            infer_schema_records: None,
            date_format_config: DateFormatConfig::default(),
        }
    }
}
