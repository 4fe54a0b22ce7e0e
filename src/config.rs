use crate::daioe::DEFAULT_LEVEL;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DAIOE_SOURCE: &str = "https://raw.githubusercontent.com/joseph-data/AI_Econ_daioe_years/development/data/daioe_scb_years_all_levels.parquet";

pub const SCB_SOURCE: &str = "https://raw.githubusercontent.com/joseph-data/AI_Econ_daioe_months/daioe_pull/data/scb_months.parquet";

pub const OUTPUT_NAME: &str = "scb_months_lvl1.parquet";

/// Settings for one merge run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub daioe_source: String,
    pub scb_source: String,
    pub data_dir: PathBuf,
    pub output_name: String,
    pub level: String,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            daioe_source: DAIOE_SOURCE.to_string(),
            scb_source: SCB_SOURCE.to_string(),
            data_dir: PathBuf::from("data"),
            output_name: OUTPUT_NAME.to_string(),
            level: DEFAULT_LEVEL.to_string(),
            preview_rows: 5,
        }
    }
}

impl PipelineConfig {
    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daioe_source.trim().is_empty() || self.scb_source.trim().is_empty() {
            return Err(PipelineError::Config("source references must not be empty".to_string()));
        }
        if self.level.trim().is_empty() {
            return Err(PipelineError::Config("classification level must not be empty".to_string()));
        }
        if !self.output_name.ends_with(".parquet") {
            return Err(PipelineError::Config(format!(
                "output name '{}' must end in .parquet",
                self.output_name
            )));
        }
        Ok(())
    }
}
