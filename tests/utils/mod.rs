use std::fs;
use std::path::Path;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use healthcare_eda::{AnalysisConfig, TableId};
use tempfile::TempDir;

/// Reference year used for every `AGE` computed in tests
pub const REFERENCE_YEAR: i32 = 2025;

pub const PATIENTS_CSV: &str = "\
Id,BIRTHDATE,DEATHDATE,GENDER,RACE,ETHNICITY,CITY,MARITAL
p1,1990-06-01,,F,white,nonhispanic,Boston,M
p2,1985-03-15,,M,black,hispanic,Worcester,S
p3,2000-11-30,,F,white,nonhispanic,Boston,
p4,1970-01-01,2020-05-05,M,asian,nonhispanic,Springfield,M
";

// p9 has no patient record; e2 has no diagnosis
pub const ENCOUNTERS_CSV: &str = "\
Id,START,STOP,PATIENT,ORGANIZATION,PAYER,ENCOUNTERCLASS,REASONDESCRIPTION,PAYER_COVERAGE
e1,2024-01-05T08:00:00Z,2024-01-05T09:00:00Z,p1,o1,y1,ambulatory,Hypertension,0
e2,2024-01-20T08:00:00Z,2024-01-20T10:00:00Z,p2,o1,y1,emergency,,5
e3,2024-02-01T08:00:00Z,2024-02-01T11:00:00Z,p1,o1,y1,ambulatory,Hypertension,-1
e4,2023-07-10T08:00:00Z,2023-07-10T10:00:00Z,p9,o1,y1,wellness,Asthma,10
";

// ex references an encounter that does not exist
pub const PROCEDURES_CSV: &str = "\
START,STOP,PATIENT,ENCOUNTER,CODE,DESCRIPTION,BASE_COST
2024-01-05T08:00:00Z,2024-01-05T08:30:00Z,p1,e1,1001,Blood pressure check,25.5
2024-01-20T08:00:00Z,2024-01-20T08:30:00Z,p2,e2,1002,Triage,80.0
2024-02-01T08:00:00Z,2024-02-01T08:30:00Z,p1,e3,1001,Blood pressure check,25.5
2023-07-10T08:00:00Z,2023-07-10T08:30:00Z,p9,e4,1003,Spirometry,120.0
2024-01-20T09:00:00Z,2024-01-20T09:30:00Z,p2,e2,1004,Chest x-ray,210.0
2024-03-01T08:00:00Z,2024-03-01T08:30:00Z,p3,ex,1001,Blood pressure check,25.5
";

pub const ORGANIZATIONS_CSV: &str = "\
Id,NAME,CITY
o1,General Hospital,Boston
";

pub const PAYERS_CSV: &str = "\
Id,NAME
y1,Medicare
";

pub const DATA_DICTIONARY_CSV: &str = "\
Table,Field,Description
encounters,Id,Encounter identifier
patients,Id,Patient identifier
";

/// Write `contents` as the CSV file of `table` in `dir`
pub fn write_table(dir: &Path, table: TableId, contents: &str) {
    fs::write(dir.join(table.file_name()), contents).expect("write fixture CSV");
}

/// Create a temporary data directory holding all six input tables
#[must_use]
pub fn fixture_dataset() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (table, contents) in [
        (TableId::DataDictionary, DATA_DICTIONARY_CSV),
        (TableId::Encounters, ENCOUNTERS_CSV),
        (TableId::Organizations, ORGANIZATIONS_CSV),
        (TableId::Patients, PATIENTS_CSV),
        (TableId::Payers, PAYERS_CSV),
        (TableId::Procedures, PROCEDURES_CSV),
    ] {
        write_table(dir.path(), table, contents);
    }
    dir
}

/// Configuration reading from `dir` with a fixed reference year
#[must_use]
pub fn test_config(dir: &Path) -> AnalysisConfig {
    AnalysisConfig {
        data_dir: dir.to_path_buf(),
        reference_year: Some(REFERENCE_YEAR),
        ..Default::default()
    }
}

/// Values of a string column, nulls as `None`
pub fn strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array = batch.column_by_name(column).expect("column exists");
    let array = array
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Utf8 column");
    array.iter().map(|v| v.map(str::to_string)).collect()
}

/// Values of a non-null Int64 column
pub fn ints(batch: &RecordBatch, column: &str) -> Vec<i64> {
    let array = batch.column_by_name(column).expect("column exists");
    let array = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("Int64 column");
    assert_eq!(array.null_count(), 0, "{column} has nulls");
    array.values().to_vec()
}

/// First value of a Float64 column
pub fn first_float(batch: &RecordBatch, column: &str) -> f64 {
    let array = batch.column_by_name(column).expect("column exists");
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Float64 column")
        .value(0)
}
