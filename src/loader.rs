//! CSV table loading

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::config::AnalysisConfig;
use crate::error::util::safe_open_file;
use crate::error::{Error, Result};
use crate::schema::{TableId, TableSchema};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Read a CSV file into a single record batch conforming to `schema`
///
/// Column types are inferred from the file, declared columns are then forced
/// to their declared type. Empty fields are read as nulls.
pub fn read_csv(path: &Path, schema: &TableSchema, config: &AnalysisConfig) -> Result<RecordBatch> {
    log_operation_start("Reading", path);
    let start = Instant::now();

    let file = safe_open_file(path, "inferring CSV schema")?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(file, config.infer_schema_records)
        .map_err(|e| csv_error(path, e))?;

    let reader_schema = Arc::new(schema.reader_schema(&inferred)?);

    let file = safe_open_file(path, "reading CSV records")?;
    let reader = ReaderBuilder::new(reader_schema.clone())
        .with_header(true)
        .with_batch_size(config.batch_size)
        .build(file)
        .map_err(|e| csv_error(path, e))?;

    let mut batches = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| csv_error(path, e))?;
        batches.push(schema.apply(&batch, &config.date_format_config)?);
    }

    let table = if batches.is_empty() {
        schema.apply(&RecordBatch::new_empty(reader_schema), &config.date_format_config)?
    } else {
        concat_batches(&batches[0].schema(), &batches)?
    };
    schema.validate(&table)?;

    log_operation_complete("read", path, table.num_rows(), Some(start.elapsed()));
    Ok(table)
}

/// Load one input table from the data directory
pub fn load_table(table: TableId, config: &AnalysisConfig) -> Result<RecordBatch> {
    let path = config.data_dir.join(table.file_name());
    read_csv(&path, &table.schema(), config)
}

/// Load every input table, failing on the first missing or malformed file
pub fn load_all(config: &AnalysisConfig) -> Result<Vec<(TableId, RecordBatch)>> {
    TableId::ALL
        .iter()
        .map(|&table| load_table(table, config).map(|batch| (table, batch)))
        .collect()
}

fn csv_error(path: &Path, error: ArrowError) -> Error {
    match error {
        ArrowError::CsvError(message) | ArrowError::ParseError(message) => Error::MalformedRow {
            path: path.to_path_buf(),
            message,
        },
        ArrowError::IoError(_, source) => Error::Io(source),
        other => Error::Arrow(other),
    }
}
