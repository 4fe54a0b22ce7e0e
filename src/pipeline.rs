//! The merge run: load, clean, aggregate, join, export.

use crate::config::PipelineConfig;
use crate::daioe::prepare_daioe_level;
use crate::error::{PipelineError, Result};
use crate::export::{export_parquet, ExportReport};
use crate::inspect::inspect;
use crate::merge::merge_months_with_daioe;
use crate::scb::clean_scb_months;
use crate::source::open_source;
use std::time::Instant;
use tracing::{debug, info};

const STEPS: usize = 7;

fn step(k: usize, description: &str) {
    println!("Step {}/{}: {}", k, STEPS, description);
}

/// Create the data directory and return the output file path.
pub fn setup_paths(config: &PipelineConfig) -> Result<std::path::PathBuf> {
    std::fs::create_dir_all(&config.data_dir).map_err(|e| {
        PipelineError::sink(&config.data_dir, format!("cannot create data directory: {}", e))
    })?;
    Ok(config.output_path())
}

pub fn run(config: &PipelineConfig) -> Result<ExportReport> {
    config.validate()?;
    let started = Instant::now();

    step(1, "Setup paths");
    let output_path = setup_paths(config)?;

    step(2, "Load DAIOE and SCB sources");
    let daioe = open_source("DAIOE", &config.daioe_source)?;
    let scb = open_source("SCB", &config.scb_source)?;

    step(3, "Quick raw-data preview");
    println!("DAIOE preview:");
    println!("{}", daioe.preview(config.preview_rows)?);
    println!("SCB preview:");
    println!("{}", scb.preview(config.preview_rows)?);

    step(4, "Clean SCB monthly data");
    let scb_clean = clean_scb_months(&scb)?.relabel("Clean SCB");
    inspect("Clean SCB", &scb_clean)?;

    step(5, &format!("Prepare DAIOE {} aggregates", config.level));
    let daioe_level = prepare_daioe_level(&daioe, &config.level)?.relabel("DAIOE level");
    inspect(&format!("DAIOE {}", config.level), &daioe_level)?;

    step(6, "Merge cleaned SCB with DAIOE");
    let merged = merge_months_with_daioe(&scb_clean, &daioe_level)?.relabel("Merged output");
    inspect("Merged output", &merged)?;
    debug!("Merged plan: {}", merged.plan_json()?);

    step(7, "Export parquet");
    let report = export_parquet(&merged, &output_path)?;
    println!("Saved: {}", report.path.display());

    info!(
        "Pipeline finished in {:.2?} ({})",
        started.elapsed(),
        if report.streamed { "streamed" } else { "collected" }
    );
    Ok(report)
}
