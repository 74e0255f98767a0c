//! Named analysis stages with declared inputs and outputs
//!
//! Stages read immutable tables from an [`Artifacts`] store and return new
//! tables; nothing is mutated in place. Because every stage declares what it
//! consumes, any stage can be re-run on its own from cached upstream
//! artifacts with [`Pipeline::run_stage`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use indicatif::ProgressBar;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::report::{ChartSink, ChartSpec, print_table};
use crate::utils::logging::{create_stage_progress_bar, finish_progress_bar, log_stage};

pub mod stages;

pub use stages::healthcare_pipeline;

/// Immutable table snapshot shared between stages
pub type Artifact = Arc<RecordBatch>;

/// Named tables produced so far
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    tables: BTreeMap<String, Artifact>,
}

impl Artifacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an artifact by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.tables.get(name)
    }

    /// Look up an artifact a stage depends on
    pub fn require(&self, stage: &str, name: &str) -> Result<Artifact> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingArtifact {
                stage: stage.to_string(),
                artifact: name.to_string(),
            })
    }

    /// Store an artifact, replacing any previous table of the same name
    pub fn insert(&mut self, name: impl Into<String>, table: RecordBatch) {
        self.tables.insert(name.into(), Arc::new(table));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Names of all stored artifacts, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Services available to a running stage
pub struct StageContext<'a> {
    pub config: &'a AnalysisConfig,
    pub charts: &'a mut dyn ChartSink,
    /// Print tables and show progress on the console
    pub verbose: bool,
}

impl<'a> StageContext<'a> {
    pub fn new(config: &'a AnalysisConfig, charts: &'a mut dyn ChartSink) -> Self {
        Self {
            config,
            charts,
            verbose: true,
        }
    }

    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    /// Print a table when running verbosely
    pub fn show(&self, title: &str, batch: &RecordBatch) -> Result<()> {
        if self.verbose {
            print_table(title, batch)?;
        }
        Ok(())
    }

    /// Hand a table to the chart sink
    pub fn chart(&mut self, spec: ChartSpec, data: &RecordBatch) -> Result<()> {
        self.charts.render(&spec, data)
    }
}

/// Tables returned by a stage, keyed by artifact name
pub type StageOutput = Vec<(&'static str, RecordBatch)>;

/// One step of the analysis
pub trait Stage {
    /// Unique stage name
    fn name(&self) -> &'static str;

    /// Artifacts the stage reads
    fn inputs(&self) -> &[&'static str];

    /// Artifacts the stage produces
    fn outputs(&self) -> &[&'static str];

    /// Compute the outputs from `artifacts`
    fn run(&self, artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput>;
}

/// Signature of a stage body
pub type StageFn = fn(&Artifacts, &mut StageContext<'_>) -> Result<StageOutput>;

/// A stage backed by a plain function
#[derive(Debug, Clone)]
pub struct FnStage {
    name: &'static str,
    inputs: Vec<&'static str>,
    outputs: Vec<&'static str>,
    body: StageFn,
}

impl FnStage {
    #[must_use]
    pub fn new(
        name: &'static str,
        inputs: &[&'static str],
        outputs: &[&'static str],
        body: StageFn,
    ) -> Self {
        Self {
            name,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            body,
        }
    }
}

impl Stage for FnStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn inputs(&self) -> &[&'static str] {
        &self.inputs
    }

    fn outputs(&self) -> &[&'static str] {
        &self.outputs
    }

    fn run(&self, artifacts: &Artifacts, ctx: &mut StageContext<'_>) -> Result<StageOutput> {
        (self.body)(artifacts, ctx)
    }
}

/// Ordered list of stages
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|s| s.name())
    }

    /// Find a stage by name
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&dyn Stage> {
        self.stages.iter().find(|s| s.name() == name).map(|s| &**s)
    }

    /// Check that every stage input is produced by an earlier stage
    pub fn validate(&self) -> Result<()> {
        let mut available: Vec<&str> = Vec::new();
        for stage in &self.stages {
            if let Some(missing) = stage.inputs().iter().find(|i| !available.contains(i)) {
                return Err(Error::MissingArtifact {
                    stage: stage.name().to_string(),
                    artifact: (*missing).to_string(),
                });
            }
            available.extend(stage.outputs());
        }
        Ok(())
    }

    /// Run every stage in order from an empty artifact store
    pub fn run(&self, ctx: &mut StageContext<'_>) -> Result<Artifacts> {
        self.validate()?;

        let progress = if ctx.verbose {
            create_stage_progress_bar(self.stages.len() as u64, Some("Running analysis"))
        } else {
            ProgressBar::hidden()
        };

        let mut artifacts = Artifacts::new();
        for stage in &self.stages {
            progress.set_message(stage.name());
            Self::execute(stage.as_ref(), &mut artifacts, ctx)?;
            progress.inc(1);
        }

        finish_progress_bar(&progress, Some("Analysis complete"));
        Ok(artifacts)
    }

    /// Re-run a single stage against previously produced artifacts
    ///
    /// Returns a new store with the stage's outputs replaced; `artifacts`
    /// itself is left untouched.
    pub fn run_stage(
        &self,
        name: &str,
        artifacts: &Artifacts,
        ctx: &mut StageContext<'_>,
    ) -> Result<Artifacts> {
        let stage = self
            .stage(name)
            .ok_or_else(|| Error::UnknownStage(name.to_string()))?;

        let mut updated = artifacts.clone();
        Self::execute(stage, &mut updated, ctx)?;
        Ok(updated)
    }

    fn execute(
        stage: &dyn Stage,
        artifacts: &mut Artifacts,
        ctx: &mut StageContext<'_>,
    ) -> Result<()> {
        for input in stage.inputs() {
            artifacts.require(stage.name(), input)?;
        }

        let start = Instant::now();
        let outputs = stage.run(artifacts, ctx)?;

        for declared in stage.outputs() {
            if !outputs.iter().any(|(name, _)| name == declared) {
                return Err(Error::MissingArtifact {
                    stage: stage.name().to_string(),
                    artifact: (*declared).to_string(),
                });
            }
        }

        let names: Vec<&str> = outputs.iter().map(|(name, _)| *name).collect();
        log_stage(stage.name(), &names, start.elapsed());

        for (name, table) in outputs {
            if !stage.outputs().contains(&name) {
                return Err(Error::InvalidArgument(format!(
                    "stage '{}' produced undeclared artifact '{name}'",
                    stage.name()
                )));
            }
            artifacts.insert(name, table);
        }
        Ok(())
    }
}
