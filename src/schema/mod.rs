//! Declared table schemas
//!
//! Every input table carries an explicit [`TableSchema`]. Loading infers the
//! remaining columns from the CSV file, then forces declared columns to their
//! declared type so type problems surface at load time instead of at first use.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};

pub mod date_utils;
pub mod tables;

use date_utils::{
    DateFormatConfig, date_to_days, parse_date_string, parse_timestamp_string, timestamp_to_seconds,
};

pub use tables::TableId;

/// Logical type of a declared column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text or identifiers
    Text,
    /// 64-bit floating point
    Float,
    /// Instant with second precision (UTC)
    Timestamp,
    /// Calendar date
    Date,
}

impl ColumnKind {
    /// Arrow type of the column after loading
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::Text => DataType::Utf8,
            Self::Float => DataType::Float64,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Second, None),
            Self::Date => DataType::Date32,
        }
    }

    /// Arrow type the CSV reader should produce before conversion
    ///
    /// Temporal columns are read as text and parsed with chrono afterwards.
    #[must_use]
    pub fn read_type(self) -> DataType {
        match self {
            Self::Text | Self::Timestamp | Self::Date => DataType::Utf8,
            Self::Float => DataType::Float64,
        }
    }
}

/// A declared column
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Whether the column must be present in the input file
    pub required: bool,
}

impl ColumnSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Declared schema of one input table
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: TableId,
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Find a declared column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Build the schema handed to the CSV reader
    ///
    /// Undeclared columns keep their inferred type. Declared columns are
    /// replaced with their read type; a missing required column is an error.
    pub fn reader_schema(&self, inferred: &Schema) -> Result<Schema> {
        self.check_required(inferred)?;

        let fields: Vec<Field> = inferred
            .fields()
            .iter()
            .map(|field| match self.column(field.name()) {
                Some(spec) => Field::new(field.name(), spec.kind.read_type(), true),
                None => Field::new(field.name(), field.data_type().clone(), true),
            })
            .collect();

        Ok(Schema::new(fields))
    }

    /// Convert freshly read columns into their declared types
    pub fn apply(&self, batch: &RecordBatch, config: &DateFormatConfig) -> Result<RecordBatch> {
        self.check_required(batch.schema().as_ref())?;

        let schema = batch.schema();
        let mut fields = Vec::with_capacity(batch.num_columns());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let converted = match self.column(field.name()) {
                Some(spec) => self.convert_column(field.name(), spec.kind, column, config)?,
                None => column.clone(),
            };
            fields.push(Field::new(field.name(), converted.data_type().clone(), true));
            columns.push(converted);
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Check that every declared column present in `batch` has its declared type
    pub fn validate(&self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.check_required(schema.as_ref())?;

        for spec in &self.columns {
            if let Ok(field) = schema.field_with_name(spec.name) {
                let expected = spec.kind.data_type();
                if field.data_type() != &expected {
                    return Err(Error::type_mismatch(
                        spec.name,
                        expected.to_string(),
                        field.data_type(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_required(&self, schema: &Schema) -> Result<()> {
        for spec in self.columns.iter().filter(|c| c.required) {
            if schema.index_of(spec.name).is_err() {
                return Err(Error::Schema(format!(
                    "{} is missing required column '{}'",
                    self.table.display_name(),
                    spec.name
                )));
            }
        }
        Ok(())
    }

    fn convert_column(
        &self,
        name: &str,
        kind: ColumnKind,
        column: &ArrayRef,
        config: &DateFormatConfig,
    ) -> Result<ArrayRef> {
        let target = kind.data_type();
        if column.data_type() == &target {
            return Ok(column.clone());
        }

        match kind {
            ColumnKind::Timestamp | ColumnKind::Date => {
                let strings = column
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::type_mismatch(name, "Utf8", column.data_type()))?;
                self.parse_temporal(name, kind, strings, config)
            }
            ColumnKind::Text | ColumnKind::Float => {
                if matches!(column.data_type(), DataType::Null) || kind == ColumnKind::Text {
                    Ok(arrow::compute::cast(column, &target)?)
                } else {
                    Err(Error::type_mismatch(name, target.to_string(), column.data_type()))
                }
            }
        }
    }

    fn parse_temporal(
        &self,
        name: &str,
        kind: ColumnKind,
        strings: &StringArray,
        config: &DateFormatConfig,
    ) -> Result<ArrayRef> {
        let unparseable = |row: usize, value: &str| {
            Error::Schema(format!(
                "{}: cannot parse '{value}' in column '{name}' (row {row}) as {kind:?}",
                self.table.display_name()
            ))
        };

        match kind {
            ColumnKind::Date => {
                let mut values = Vec::with_capacity(strings.len());
                for (row, value) in strings.iter().enumerate() {
                    values.push(match value.map(str::trim).filter(|v| !v.is_empty()) {
                        Some(v) => Some(date_to_days(
                            parse_date_string(v, config).ok_or_else(|| unparseable(row, v))?,
                        )),
                        None => None,
                    });
                }
                Ok(Arc::new(Date32Array::from(values)))
            }
            _ => {
                let mut values = Vec::with_capacity(strings.len());
                for (row, value) in strings.iter().enumerate() {
                    values.push(match value.map(str::trim).filter(|v| !v.is_empty()) {
                        Some(v) => Some(timestamp_to_seconds(
                            parse_timestamp_string(v, config).ok_or_else(|| unparseable(row, v))?,
                        )),
                        None => None,
                    });
                }
                Ok(Arc::new(TimestampSecondArray::from(values)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_batch(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    #[test]
    fn test_apply_parses_temporal_columns() {
        let schema = TableId::Patients.schema();
        let batch = text_batch(&[
            ("Id", vec![Some("p1"), Some("p2")]),
            ("BIRTHDATE", vec![Some("1989-05-25"), None]),
            ("GENDER", vec![Some("F"), Some("M")]),
            ("RACE", vec![Some("white"), Some("asian")]),
            ("ETHNICITY", vec![Some("nonhispanic"), Some("hispanic")]),
            ("CITY", vec![Some("Boston"), Some("Quincy")]),
        ]);

        let applied = schema.apply(&batch, &DateFormatConfig::default()).unwrap();
        assert_eq!(applied.column(1).data_type(), &DataType::Date32);
        assert_eq!(applied.column(1).null_count(), 1);
        schema.validate(&applied).unwrap();
    }

    #[test]
    fn test_missing_required_column_fails() {
        let schema = TableId::Procedures.schema();
        let batch = text_batch(&[("CODE", vec![Some("123")])]);

        let err = schema.apply(&batch, &DateFormatConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_unparseable_timestamp_fails_at_load() {
        let schema = TableId::Encounters.schema();
        let batch = text_batch(&[
            ("Id", vec![Some("e1")]),
            ("PATIENT", vec![Some("p1")]),
            ("START", vec![Some("yesterday")]),
            ("STOP", vec![Some("2024-01-01T10:00:00Z")]),
            ("ENCOUNTERCLASS", vec![Some("ambulatory")]),
            ("REASONDESCRIPTION", vec![None]),
        ]);

        let err = schema.apply(&batch, &DateFormatConfig::default()).unwrap_err();
        assert!(err.to_string().contains("START"));
    }
}
