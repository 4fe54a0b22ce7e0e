use anyhow::Result;
use clap::Parser;
use daioe_merge::config::PipelineConfig;
use daioe_merge::pipeline;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daioe-merge")]
#[command(about = "Merge SCB monthly occupation data with yearly DAIOE exposure aggregates")]
struct Args {
    /// DAIOE parquet URL or path (or set DAIOE_SOURCE)
    #[arg(long)]
    daioe_source: Option<String>,

    /// SCB monthly parquet URL or path (or set SCB_SOURCE)
    #[arg(long)]
    scb_source: Option<String>,

    /// Directory the merged file is written to
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// File name of the merged output
    #[arg(short, long, default_value = daioe_merge::config::OUTPUT_NAME)]
    output_name: String,

    /// DAIOE classification level to aggregate
    #[arg(long, default_value = daioe_merge::daioe::DEFAULT_LEVEL)]
    level: String,

    /// Rows shown in the raw-data preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            daioe_source: self
                .daioe_source
                .or_else(|| std::env::var("DAIOE_SOURCE").ok())
                .unwrap_or(defaults.daioe_source),
            scb_source: self
                .scb_source
                .or_else(|| std::env::var("SCB_SOURCE").ok())
                .unwrap_or(defaults.scb_source),
            data_dir: self.data_dir,
            output_name: self.output_name,
            level: self.level,
            preview_rows: self.preview_rows,
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config();
    info!("Config: {}", serde_json::to_string(&config)?);

    if let Err(e) = pipeline::run(&config) {
        error!("Pipeline failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
