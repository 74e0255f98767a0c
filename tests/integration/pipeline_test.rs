use healthcare_eda::pipeline::stages::names;
use healthcare_eda::{
    Artifacts, ChartKind, Error, JsonChartSink, RecordingChartSink, StageContext,
    healthcare_pipeline,
};

use crate::utils::{first_float, fixture_dataset, ints, strings, test_config};

fn run_fixture() -> (Artifacts, RecordingChartSink) {
    let dir = fixture_dataset();
    let config = test_config(dir.path());
    let mut sink = RecordingChartSink::default();
    let artifacts = {
        let mut ctx = StageContext::new(&config, &mut sink).quiet();
        healthcare_pipeline().run(&mut ctx).expect("pipeline runs")
    };
    (artifacts, sink)
}

fn some(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some((*v).to_string())).collect()
}

#[test]
fn test_every_declared_output_is_produced() {
    let (artifacts, _) = run_fixture();
    let pipeline = healthcare_pipeline();

    for name in pipeline.stage_names() {
        let stage = pipeline.stage(name).unwrap();
        for output in stage.outputs() {
            assert!(artifacts.contains(output), "{name} did not produce {output}");
        }
    }
}

#[test]
fn test_summaries_cover_every_column() {
    let (artifacts, _) = run_fixture();
    let summaries = artifacts.get(names::SUMMARIES).unwrap();

    let expected: usize = names::RAW_TABLES
        .iter()
        .map(|table| artifacts.get(table).unwrap().num_columns())
        .sum();
    assert_eq!(summaries.num_rows(), expected);
}

#[test]
fn test_cleaning_outputs() {
    let (artifacts, _) = run_fixture();

    // only p4 has neither a missing DEATHDATE nor a missing MARITAL
    let cleaned = artifacts.get(names::PATIENTS_CLEANED).unwrap();
    assert_eq!(strings(cleaned, "Id"), some(&["p4"]));

    let filled = artifacts.get(names::ENCOUNTERS_FILLED).unwrap();
    assert_eq!(
        strings(filled, "REASONDESCRIPTION"),
        some(&["Hypertension", "Unknown", "Hypertension", "Asthma"])
    );

    // the raw table is left untouched
    let raw = artifacts.get(names::ENCOUNTERS).unwrap();
    assert_eq!(raw.column_by_name("REASONDESCRIPTION").unwrap().null_count(), 1);
}

#[test]
fn test_encounters_without_patient_are_dropped() {
    let (artifacts, _) = run_fixture();
    let merged = artifacts.get(names::ENCOUNTER_PATIENTS).unwrap();

    assert_eq!(merged.num_rows(), 3);
    assert_eq!(strings(merged, "Id_x"), some(&["e1", "e2", "e3"]));
    assert_eq!(strings(merged, "GENDER"), some(&["F", "M", "F"]));
}

#[test]
fn test_admissions_by_month() {
    let (artifacts, _) = run_fixture();
    let months = artifacts.get(names::ADMISSIONS_BY_MONTH).unwrap();

    assert_eq!(strings(months, "Month"), some(&["2023-07", "2024-01", "2024-02"]));
    assert_eq!(ints(months, "Unique Patients"), vec![1, 2, 1]);
}

#[test]
fn test_average_stay() {
    let (artifacts, _) = run_fixture();
    let stay = artifacts.get(names::AVERAGE_STAY).unwrap();

    // durations of 1h, 2h, 3h and 2h
    assert!((first_float(stay, "average_hours") - 2.0).abs() < 1e-9);
    assert!((first_float(stay, "average_days") - 0.0833).abs() < 1e-4);
}

#[test]
fn test_covered_procedures_after_left_join() {
    let (artifacts, _) = run_fixture();

    let merged = artifacts.get(names::PROCEDURE_ENCOUNTERS).unwrap();
    assert_eq!(merged.num_rows(), 6);

    let covered = artifacts.get(names::COVERED_PROCEDURES).unwrap();
    assert_eq!(ints(covered, "covered_procedures"), vec![3]);
}

#[test]
fn test_frequency_tables() {
    let (artifacts, _) = run_fixture();

    let classes = artifacts.get(names::ENCOUNTER_CLASS_COUNTS).unwrap();
    assert_eq!(
        strings(classes, "ENCOUNTERCLASS"),
        some(&["ambulatory", "emergency", "wellness"])
    );
    assert_eq!(ints(classes, "COUNT"), vec![2, 1, 1]);

    let diagnoses = artifacts.get(names::TOP_DIAGNOSES).unwrap();
    assert_eq!(
        strings(diagnoses, "REASONDESCRIPTION"),
        some(&["Hypertension", "Unknown", "Asthma"])
    );

    let cities = artifacts.get(names::TOP_CITIES).unwrap();
    assert_eq!(strings(cities, "CITY"), some(&["Boston", "Worcester", "Springfield"]));
    assert_eq!(ints(cities, "COUNT"), vec![2, 1, 1]);

    // p3 has no marital status
    let marital = artifacts.get(names::MARITAL_STATUS).unwrap();
    assert_eq!(ints(marital, "COUNT").iter().sum::<i64>(), 3);
}

#[test]
fn test_yearly_breakdowns() {
    let (artifacts, _) = run_fixture();

    let diagnoses = artifacts.get(names::DIAGNOSES_BY_YEAR).unwrap();
    assert_eq!(ints(diagnoses, "YEAR"), vec![2023, 2024, 2024]);
    assert_eq!(
        strings(diagnoses, "REASONDESCRIPTION"),
        some(&["Asthma", "Hypertension", "Unknown"])
    );
    assert_eq!(ints(diagnoses, "COUNT"), vec![1, 2, 1]);

    let classes = artifacts.get(names::ENCOUNTER_CLASSES_BY_YEAR).unwrap();
    assert_eq!(ints(classes, "COUNT").iter().sum::<i64>(), 4);

    let genders = artifacts.get(names::GENDER_BY_BIRTH_YEAR).unwrap();
    assert_eq!(ints(genders, "BIRTH_YEAR"), vec![1970, 1985, 1990, 2000]);
}

#[test]
fn test_charts_are_handed_to_the_sink() {
    let (_, sink) = run_fixture();
    assert_eq!(sink.charts.len(), 14);

    let (spec, bins) = sink.get("Patient Age Distribution").unwrap();
    assert_eq!(spec.kind, ChartKind::Histogram);
    assert_eq!(bins.num_rows(), 20);
    assert_eq!(ints(bins, "COUNT").iter().sum::<i64>(), 4);

    let (spec, _) = sink.get("Top 10 Diagnostics Year-Wise").unwrap();
    assert_eq!(
        spec.kind,
        ChartKind::AnimatedBar {
            frame: "YEAR".to_string()
        }
    );
}

#[test]
fn test_verbose_covered_procedures_stage() {
    let dir = fixture_dataset();
    let config = test_config(dir.path());
    let mut sink = RecordingChartSink::default();
    let artifacts = {
        let mut ctx = StageContext::new(&config, &mut sink).quiet();
        healthcare_pipeline().run(&mut ctx).unwrap()
    };

    let mut ctx = StageContext::new(&config, &mut sink);
    assert!(ctx.verbose);
    let updated = healthcare_pipeline()
        .run_stage("covered_procedures", &artifacts, &mut ctx)
        .unwrap();
    let covered = updated.get(names::COVERED_PROCEDURES).unwrap();
    assert_eq!(ints(covered, "covered_procedures"), vec![3]);
}

#[test]
fn test_rerun_single_stage_from_cached_artifacts() {
    let dir = fixture_dataset();
    let mut config = test_config(dir.path());
    let mut sink = RecordingChartSink::default();

    let artifacts = {
        let mut ctx = StageContext::new(&config, &mut sink).quiet();
        healthcare_pipeline().run(&mut ctx).unwrap()
    };

    // the input files are no longer needed
    drop(dir);
    config.top_diagnoses = 1;

    let mut ctx = StageContext::new(&config, &mut sink).quiet();
    let updated = healthcare_pipeline()
        .run_stage("top_diagnoses", &artifacts, &mut ctx)
        .unwrap();

    let top = updated.get(names::TOP_DIAGNOSES).unwrap();
    assert_eq!(strings(top, "REASONDESCRIPTION"), some(&["Hypertension"]));
    assert_eq!(artifacts.get(names::TOP_DIAGNOSES).unwrap().num_rows(), 3);
}

#[test]
fn test_stage_without_upstream_artifacts_fails() {
    let config = test_config(std::path::Path::new("."));
    let mut sink = RecordingChartSink::default();
    let mut ctx = StageContext::new(&config, &mut sink).quiet();

    let err = healthcare_pipeline()
        .run_stage("average_stay", &Artifacts::new(), &mut ctx)
        .unwrap_err();
    assert!(matches!(err, Error::MissingArtifact { .. }));
}

#[test]
fn test_json_chart_sink_writes_one_line_per_chart() {
    let dir = fixture_dataset();
    let config = test_config(dir.path());
    let mut sink = JsonChartSink::new(Vec::new());
    {
        let mut ctx = StageContext::new(&config, &mut sink).quiet();
        healthcare_pipeline().run(&mut ctx).unwrap();
    }

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let documents: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(documents.len(), 14);
    assert_eq!(documents[0]["chart"]["title"], "Patient Age Distribution");
    assert_eq!(documents[0]["rows"].as_array().unwrap().len(), 20);
}

#[test]
fn test_missing_input_file_aborts_the_run() {
    let dir = fixture_dataset();
    std::fs::remove_file(dir.path().join("payers.csv")).unwrap();
    let config = test_config(dir.path());
    let mut sink = RecordingChartSink::default();
    let mut ctx = StageContext::new(&config, &mut sink).quiet();

    let err = healthcare_pipeline().run(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
    assert!(sink.charts.is_empty());
}
