use std::time::Instant;

use anyhow::Context;
use healthcare_eda::utils::logging::log_warning;
use healthcare_eda::{AnalysisConfig, LogChartSink, StageContext, healthcare_pipeline};
use log::info;

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AnalysisConfig::default();
    if !config.data_dir.exists() {
        log_warning("Data directory not found", Some(&config.data_dir));
    }
    info!("Loading healthcare records from: {}", config.data_dir.display());

    let mut charts = LogChartSink;
    let mut ctx = StageContext::new(&config, &mut charts);

    let start = Instant::now();
    let artifacts = healthcare_pipeline()
        .run(&mut ctx)
        .context("healthcare analysis failed")?;

    info!(
        "Produced {} artifacts in {:?}",
        artifacts.len(),
        start.elapsed()
    );
    Ok(())
}
