//! The healthcare analysis as a sequence of named stages
//!
//! Stages that need a derived column (`AGE`, `YEAR`, `DURATION_HOURS`,
//! `BIRTH_YEAR`) recompute it from the source columns of their inputs.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::analysis::derive::{self, AGE, BIRTH_YEAR, DURATION_HOURS, YEAR};
use crate::analysis::join::RIGHT_SUFFIX;
use crate::analysis::statistics::{self, COUNT, histogram_to_batch, value_counts_to_batch};
use crate::analysis::temporal::bucket_counts_to_batch;
use crate::analysis::{
    Granularity, dataset_summary, distinct_count_by_period, drop_null_rows, fill_null, histogram,
    inner_join, left_join, mean_duration, value_counts,
};
use crate::error::{Error, Result};
use crate::filter::{BatchFilter, Expr, ExpressionFilter, count_matching};
use crate::loader::load_all;
use crate::pipeline::{Artifacts, FnStage, Pipeline, StageContext, StageOutput};
use crate::report::{
    ChartKind, ChartSpec, print_count, print_duration_summary, print_value_counts,
};
use crate::schema::TableId;

/// Artifact names
pub mod names {
    pub const DATA_DICTIONARY: &str = "data_dictionary";
    pub const ENCOUNTERS: &str = "encounters";
    pub const ORGANIZATIONS: &str = "organizations";
    pub const PATIENTS: &str = "patients";
    pub const PAYERS: &str = "payers";
    pub const PROCEDURES: &str = "procedures";

    pub const SUMMARIES: &str = "summaries";
    pub const PATIENTS_CLEANED: &str = "patients_cleaned";
    pub const ENCOUNTERS_FILLED: &str = "encounters_filled";
    pub const ENCOUNTER_PATIENTS: &str = "encounter_patients";
    pub const PATIENTS_WITH_AGE: &str = "patients_with_age";
    pub const AGE_HISTOGRAM: &str = "age_histogram";
    pub const ENCOUNTER_CLASS_COUNTS: &str = "encounter_class_counts";
    pub const ADMISSIONS_BY_MONTH: &str = "admissions_by_month";
    pub const ENCOUNTER_DURATIONS: &str = "encounter_durations";
    pub const AVERAGE_STAY: &str = "average_stay";
    pub const PROCEDURE_ENCOUNTERS: &str = "procedure_encounters";
    pub const COVERED_PROCEDURES: &str = "covered_procedures";
    pub const GENDER_DISTRIBUTION: &str = "gender_distribution";
    pub const RACE_DISTRIBUTION: &str = "race_distribution";
    pub const ETHNICITY_DISTRIBUTION: &str = "ethnicity_distribution";
    pub const GENDER_BY_BIRTH_YEAR: &str = "gender_by_birth_year";
    pub const RACE_BY_BIRTH_YEAR: &str = "race_by_birth_year";
    pub const ETHNICITY_BY_BIRTH_YEAR: &str = "ethnicity_by_birth_year";
    pub const TOP_CITIES: &str = "top_cities";
    pub const MARITAL_STATUS: &str = "marital_status";
    pub const TOP_DIAGNOSES: &str = "top_diagnoses";
    pub const DIAGNOSES_BY_YEAR: &str = "diagnoses_by_year";
    pub const ENCOUNTER_CLASSES_BY_YEAR: &str = "encounter_classes_by_year";

    pub const RAW_TABLES: [&str; 6] = [
        DATA_DICTIONARY,
        ENCOUNTERS,
        ORGANIZATIONS,
        PATIENTS,
        PAYERS,
        PROCEDURES,
    ];
}

use names::*;

const REASON: &str = "REASONDESCRIPTION";
const ENCOUNTER_CLASS: &str = "ENCOUNTERCLASS";
const PAYER_COVERAGE: &str = "PAYER_COVERAGE";

/// Build the full healthcare analysis pipeline
#[must_use]
pub fn healthcare_pipeline() -> Pipeline {
    Pipeline::new()
        .with_stage(FnStage::new("load", &[], &RAW_TABLES, load_tables))
        .with_stage(FnStage::new("summaries", &RAW_TABLES, &[SUMMARIES], summarize_tables))
        .with_stage(FnStage::new(
            "clean",
            &[PATIENTS, ENCOUNTERS],
            &[PATIENTS_CLEANED, ENCOUNTERS_FILLED],
            clean_tables,
        ))
        .with_stage(FnStage::new(
            "encounter_patients",
            &[ENCOUNTERS_FILLED, PATIENTS],
            &[ENCOUNTER_PATIENTS],
            join_encounter_patients,
        ))
        .with_stage(FnStage::new(
            "age_distribution",
            &[PATIENTS],
            &[PATIENTS_WITH_AGE, AGE_HISTOGRAM],
            age_distribution,
        ))
        .with_stage(FnStage::new(
            "encounter_classes",
            &[ENCOUNTERS_FILLED],
            &[ENCOUNTER_CLASS_COUNTS],
            encounter_classes,
        ))
        .with_stage(FnStage::new(
            "admissions_over_time",
            &[ENCOUNTERS_FILLED],
            &[ADMISSIONS_BY_MONTH],
            admissions_over_time,
        ))
        .with_stage(FnStage::new(
            "average_stay",
            &[ENCOUNTERS_FILLED],
            &[ENCOUNTER_DURATIONS, AVERAGE_STAY],
            average_stay,
        ))
        .with_stage(FnStage::new(
            "covered_procedures",
            &[PROCEDURES, ENCOUNTERS_FILLED],
            &[PROCEDURE_ENCOUNTERS, COVERED_PROCEDURES],
            covered_procedures,
        ))
        .with_stage(FnStage::new(
            "demographics",
            &[PATIENTS_WITH_AGE],
            &[GENDER_DISTRIBUTION, RACE_DISTRIBUTION, ETHNICITY_DISTRIBUTION],
            demographics,
        ))
        .with_stage(FnStage::new(
            "demographics_by_birth_year",
            &[PATIENTS],
            &[GENDER_BY_BIRTH_YEAR, RACE_BY_BIRTH_YEAR, ETHNICITY_BY_BIRTH_YEAR],
            demographics_by_birth_year,
        ))
        .with_stage(FnStage::new("top_cities", &[PATIENTS], &[TOP_CITIES], top_cities))
        .with_stage(FnStage::new(
            "marital_status",
            &[PATIENTS],
            &[MARITAL_STATUS],
            marital_status,
        ))
        .with_stage(FnStage::new(
            "top_diagnoses",
            &[ENCOUNTERS_FILLED],
            &[TOP_DIAGNOSES],
            top_diagnoses,
        ))
        .with_stage(FnStage::new(
            "diagnoses_by_year",
            &[ENCOUNTERS_FILLED],
            &[DIAGNOSES_BY_YEAR],
            diagnoses_by_year,
        ))
        .with_stage(FnStage::new(
            "encounter_classes_by_year",
            &[ENCOUNTERS_FILLED],
            &[ENCOUNTER_CLASSES_BY_YEAR],
            encounter_classes_by_year,
        ))
}

fn load_tables(_: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    Ok(load_all(ctx.config)?
        .into_iter()
        .map(|(table, batch)| (table.artifact(), batch))
        .collect())
}

fn summarize_tables(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let mut summaries = Vec::with_capacity(TableId::ALL.len());
    for table in TableId::ALL {
        let batch = artifacts.require("summaries", table.artifact())?;
        let summary = dataset_summary(&batch, table.display_name())?;
        ctx.show(&format!("{table} summary"), &summary)?;
        summaries.push(summary);
    }

    let combined = concat_batches(&summaries[0].schema(), &summaries)?;
    Ok(vec![(SUMMARIES, combined)])
}

fn clean_tables(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let patients = artifacts.require("clean", PATIENTS)?;
    let encounters = artifacts.require("clean", ENCOUNTERS)?;

    let cleaned = drop_null_rows(&patients)?;
    log::info!(
        "Patients without missing values: {} of {}",
        cleaned.num_rows(),
        patients.num_rows()
    );
    let filled = fill_null(&encounters, REASON, &ctx.config.fill_sentinel)?;

    Ok(vec![(PATIENTS_CLEANED, cleaned), (ENCOUNTERS_FILLED, filled)])
}

fn join_encounter_patients(artifacts: &Artifacts, _: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("encounter_patients", ENCOUNTERS_FILLED)?;
    let patients = artifacts.require("encounter_patients", PATIENTS)?;

    let merged = inner_join(&encounters, &patients, "PATIENT", "Id")?;
    log::info!("Encounters matched to patients: {}", merged.num_rows());
    Ok(vec![(ENCOUNTER_PATIENTS, merged)])
}

fn age_distribution(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let patients = artifacts.require("age_distribution", PATIENTS)?;
    let with_age = derive::with_age(&patients, ctx.config.effective_reference_year())?;

    let ages = statistics::numeric_values(&with_age, AGE)?;
    let bins = histogram_to_batch(&histogram(&ages, ctx.config.histogram_bins)?)?;
    ctx.chart(
        ChartSpec::new("Patient Age Distribution", ChartKind::Histogram, "lower", COUNT),
        &bins,
    )?;

    Ok(vec![(PATIENTS_WITH_AGE, with_age), (AGE_HISTOGRAM, bins)])
}

fn encounter_classes(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("encounter_classes", ENCOUNTERS_FILLED)?;
    let counts = value_counts(&encounters, ENCOUNTER_CLASS, None)?;
    if ctx.verbose {
        print_value_counts("Total Encounters by Class", &counts);
    }

    let table = value_counts_to_batch(&counts, ENCOUNTER_CLASS)?;
    ctx.chart(
        ChartSpec::new("Total Encounters by Class", ChartKind::Bar, ENCOUNTER_CLASS, COUNT),
        &table,
    )?;
    Ok(vec![(ENCOUNTER_CLASS_COUNTS, table)])
}

fn admissions_over_time(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("admissions_over_time", ENCOUNTERS_FILLED)?;
    let counts = distinct_count_by_period(&encounters, "START", Granularity::Month, "PATIENT")?;
    let table = bucket_counts_to_batch(&counts, "Month", "Unique Patients")?;

    ctx.show("Patients admitted or readmitted per month", &table)?;
    ctx.chart(
        ChartSpec::new(
            "Number of Patients Admitted or Readmitted Over Time",
            ChartKind::Line,
            "Month",
            "Unique Patients",
        ),
        &table,
    )?;
    Ok(vec![(ADMISSIONS_BY_MONTH, table)])
}

fn average_stay(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("average_stay", ENCOUNTERS_FILLED)?;
    let with_duration = derive::with_duration_hours(&encounters)?;
    let summary = mean_duration(&with_duration)?;
    if ctx.verbose {
        print_duration_summary(&summary);
    }

    let schema = Schema::new(vec![
        Field::new("average_hours", DataType::Float64, false),
        Field::new("average_days", DataType::Float64, false),
    ]);
    let table = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from(vec![summary.hours])) as ArrayRef,
            Arc::new(Float64Array::from(vec![summary.days])),
        ],
    )?;

    log::debug!("{DURATION_HOURS} derived for {} encounters", with_duration.num_rows());
    Ok(vec![(ENCOUNTER_DURATIONS, with_duration), (AVERAGE_STAY, table)])
}

/// Resolve a column of a joined table, preferring the right-hand copy on a name clash
fn joined_column(batch: &RecordBatch, name: &str) -> Result<String> {
    let schema = batch.schema();
    [name.to_string(), format!("{name}{RIGHT_SUFFIX}")]
        .into_iter()
        .find(|candidate| schema.index_of(candidate).is_ok())
        .ok_or_else(|| Error::column_not_found(name))
}

fn covered_procedures(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let procedures = artifacts.require("covered_procedures", PROCEDURES)?;
    let encounters = artifacts.require("covered_procedures", ENCOUNTERS_FILLED)?;

    let merged = left_join(&procedures, &encounters, "ENCOUNTER", "Id")?;
    let coverage = joined_column(&merged, PAYER_COVERAGE)?;
    let covered = count_matching(&merged, &Expr::gt(coverage, 0.0))?;

    if ctx.verbose {
        print_count("Number of procedures covered by insurance", covered);
    }

    let schema = Schema::new(vec![Field::new("covered_procedures", DataType::Int64, false)]);
    let table = RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(Int64Array::from(vec![covered as i64])) as ArrayRef],
    )?;
    Ok(vec![(PROCEDURE_ENCOUNTERS, merged), (COVERED_PROCEDURES, table)])
}

fn demographics(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let patients = artifacts.require("demographics", PATIENTS_WITH_AGE)?;

    let mut outputs = Vec::with_capacity(3);
    for (column, title, artifact) in [
        ("GENDER", "Gender Distribution", GENDER_DISTRIBUTION),
        ("RACE", "Race Distribution", RACE_DISTRIBUTION),
        ("ETHNICITY", "Ethnicity Distribution", ETHNICITY_DISTRIBUTION),
    ] {
        let counts = value_counts(&patients, column, None)?;
        if ctx.verbose {
            print_value_counts(title, &counts);
        }
        let table = value_counts_to_batch(&counts, column)?;
        ctx.chart(ChartSpec::new(title, ChartKind::Bar, column, COUNT), &table)?;
        outputs.push((artifact, table));
    }
    Ok(outputs)
}

fn demographics_by_birth_year(
    artifacts: &Artifacts,
    ctx: &mut StageContext<'_>,
) -> Result<StageOutput> {
    let patients = artifacts.require("demographics_by_birth_year", PATIENTS)?;
    let patients = derive::with_birth_year(&patients)?;

    let mut outputs = Vec::with_capacity(3);
    for (column, title, artifact) in [
        ("GENDER", "Gender Distribution by Birth Year", GENDER_BY_BIRTH_YEAR),
        ("RACE", "Race Distribution by Birth Year", RACE_BY_BIRTH_YEAR),
        ("ETHNICITY", "Ethnicity Distribution by Birth Year", ETHNICITY_BY_BIRTH_YEAR),
    ] {
        let table = statistics::group_counts(&patients, &[BIRTH_YEAR, column])?;
        ctx.chart(
            ChartSpec::new(
                title,
                ChartKind::AnimatedBar {
                    frame: BIRTH_YEAR.to_string(),
                },
                column,
                COUNT,
            ),
            &table,
        )?;
        outputs.push((artifact, table));
    }
    Ok(outputs)
}

fn top_cities(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let patients = artifacts.require("top_cities", PATIENTS)?;
    let title = format!("Top {} Cities by Patient Count", ctx.config.top_cities);
    let counts = value_counts(&patients, "CITY", Some(ctx.config.top_cities))?;
    if ctx.verbose {
        print_value_counts(&title, &counts);
    }

    let table = value_counts_to_batch(&counts, "CITY")?;
    ctx.chart(ChartSpec::new(title, ChartKind::Bar, "CITY", COUNT), &table)?;
    Ok(vec![(TOP_CITIES, table)])
}

fn marital_status(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let patients = artifacts.require("marital_status", PATIENTS)?;
    let counts = value_counts(&patients, "MARITAL", None)?;
    if ctx.verbose {
        print_value_counts("Marital Status Distribution", &counts);
    }

    let table = value_counts_to_batch(&counts, "MARITAL")?;
    ctx.chart(
        ChartSpec::new("Marital Status Distribution", ChartKind::Bar, "MARITAL", COUNT),
        &table,
    )?;
    Ok(vec![(MARITAL_STATUS, table)])
}

fn top_diagnoses(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("top_diagnoses", ENCOUNTERS_FILLED)?;
    let title = format!("Top {} Diagnostics", ctx.config.top_diagnoses);
    let counts = value_counts(&encounters, REASON, Some(ctx.config.top_diagnoses))?;
    if ctx.verbose {
        print_value_counts(&title, &counts);
    }

    let table = value_counts_to_batch(&counts, REASON)?;
    ctx.chart(ChartSpec::new(title, ChartKind::HorizontalBar, REASON, COUNT), &table)?;
    Ok(vec![(TOP_DIAGNOSES, table)])
}

fn diagnoses_by_year(artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
    let encounters = artifacts.require("diagnoses_by_year", ENCOUNTERS_FILLED)?;
    let encounters = derive::with_year(&encounters, "START")?;

    let top: Vec<String> = value_counts(&encounters, REASON, Some(ctx.config.top_diagnoses))?
        .into_iter()
        .map(|c| c.value)
        .collect();
    let by_year = statistics::group_counts(&encounters, &[YEAR, REASON])?;
    let table = ExpressionFilter::new(Expr::is_in(REASON, top)).filter(&by_year)?;

    ctx.chart(
        ChartSpec::new(
            format!("Top {} Diagnostics Year-Wise", ctx.config.top_diagnoses),
            ChartKind::AnimatedBar {
                frame: YEAR.to_string(),
            },
            REASON,
            COUNT,
        ),
        &table,
    )?;
    Ok(vec![(DIAGNOSES_BY_YEAR, table)])
}

fn encounter_classes_by_year(
    artifacts: &Artifacts,
    ctx: &mut StageContext<'_>,
) -> Result<StageOutput> {
    let encounters = artifacts.require("encounter_classes_by_year", ENCOUNTERS_FILLED)?;
    let encounters = derive::with_year(&encounters, "START")?;
    let table = statistics::group_counts(&encounters, &[YEAR, ENCOUNTER_CLASS])?;

    ctx.chart(
        ChartSpec::new(
            "Total Encounters by Class (Interactive Year Slice)",
            ChartKind::AnimatedBar {
                frame: YEAR.to_string(),
            },
            ENCOUNTER_CLASS,
            COUNT,
        ),
        &table,
    )?;
    Ok(vec![(ENCOUNTER_CLASSES_BY_YEAR, table)])
}
