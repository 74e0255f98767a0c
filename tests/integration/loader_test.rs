use arrow::datatypes::{DataType, TimeUnit};
use healthcare_eda::analysis::{dataset_summary, mean};
use healthcare_eda::{Error, TableId, load_all, load_table};

use crate::utils::{fixture_dataset, ints, strings, test_config, write_table};

#[test]
fn test_load_all_tables_with_declared_types() -> healthcare_eda::Result<()> {
    let dir = fixture_dataset();
    let tables = load_all(&test_config(dir.path()))?;

    let ids: Vec<TableId> = tables.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, TableId::ALL.to_vec());

    for (table, batch) in &tables {
        table.schema().validate(batch)?;
    }

    let (_, encounters) = &tables[1];
    let schema = encounters.schema();
    assert_eq!(
        schema.field_with_name("START").unwrap().data_type(),
        &DataType::Timestamp(TimeUnit::Second, None)
    );
    assert_eq!(
        schema.field_with_name("PAYER_COVERAGE").unwrap().data_type(),
        &DataType::Float64
    );

    let (_, patients) = &tables[3];
    assert_eq!(
        patients.schema().field_with_name("BIRTHDATE").unwrap().data_type(),
        &DataType::Date32
    );
    assert_eq!(
        strings(patients, "MARITAL"),
        vec![Some("M".to_string()), Some("S".to_string()), None, Some("M".to_string())]
    );
    Ok(())
}

#[test]
fn test_missing_required_column_is_a_schema_error() {
    let dir = fixture_dataset();
    write_table(
        dir.path(),
        TableId::Patients,
        "Id,BIRTHDATE,GENDER,RACE,ETHNICITY\np1,1990-06-01,F,white,nonhispanic\n",
    );

    let err = load_table(TableId::Patients, &test_config(dir.path())).unwrap_err();
    assert!(matches!(err, Error::Schema(ref message) if message.contains("CITY")));
}

#[test]
fn test_unparseable_date_fails_at_load() {
    let dir = fixture_dataset();
    write_table(
        dir.path(),
        TableId::Patients,
        "Id,BIRTHDATE,GENDER,RACE,ETHNICITY,CITY\np1,not a date,F,white,nonhispanic,Boston\n",
    );

    let err = load_table(TableId::Patients, &test_config(dir.path())).unwrap_err();
    assert!(matches!(err, Error::Schema(_)), "unexpected error: {err}");
}

#[test]
fn test_space_separated_timestamps_are_accepted() {
    let dir = fixture_dataset();
    write_table(
        dir.path(),
        TableId::Encounters,
        "Id,START,STOP,PATIENT,ENCOUNTERCLASS,REASONDESCRIPTION\n\
         e1,2024-01-05 08:00:00,2024-01-05 09:30:00,p1,ambulatory,Hypertension\n",
    );

    let encounters = load_table(TableId::Encounters, &test_config(dir.path())).unwrap();
    assert_eq!(encounters.num_rows(), 1);
    assert!(encounters.column_by_name("PAYER_COVERAGE").is_none());
}

#[test]
fn test_nan_cells_are_missing_in_summary_and_mean() -> healthcare_eda::Result<()> {
    let dir = fixture_dataset();
    write_table(dir.path(), TableId::Payers, "Id,AMOUNT\np1,1.0\np2,NaN\np3,3.0\n");

    let payers = load_table(TableId::Payers, &test_config(dir.path()))?;
    let summary = dataset_summary(&payers, "Payers")?;
    assert_eq!(strings(&summary, "Column")[1].as_deref(), Some("AMOUNT"));
    assert_eq!(ints(&summary, "Missing Values"), vec![0, 1]);
    assert_eq!(ints(&summary, "Unique Values"), vec![3, 2]);

    assert!((mean(&payers, "AMOUNT")? - 2.0).abs() < 1e-12);
    Ok(())
}
