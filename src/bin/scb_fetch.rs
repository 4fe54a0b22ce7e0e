use anyhow::{anyhow, Result};
use clap::Parser;
use daioe_merge::statistics::{self, client::SCB_API_BASE, FetchOptions, PxWebClient, UnmappedPolicy};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scb-fetch")]
#[command(about = "Fetch monthly occupation-by-sex statistics from the SCB API into parquet")]
struct Args {
    /// Table path below the API base, e.g. AM/AM0401/<table>
    table: String,

    /// PxWeb API base URL (or set SCB_API_BASE)
    #[arg(long)]
    base_url: Option<String>,

    /// Output parquet file
    #[arg(short, long, default_value = "data/scb_months.parquet")]
    output: PathBuf,

    /// Restrict a variable to some codes: CODE=v1,v2 (repeatable)
    #[arg(long = "select")]
    selections: Vec<String>,

    /// Output column name for a variable: CODE=name (repeatable)
    #[arg(long = "column")]
    renames: Vec<String>,

    /// Add a label column for this variable (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Handling of codes without a label
    #[arg(long, value_enum, default_value_t = UnmappedPolicy::Null)]
    unmapped: UnmappedPolicy,
}

fn split_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected CODE=value, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

impl Args {
    fn fetch_options(&self) -> Result<FetchOptions> {
        let mut selections = BTreeMap::new();
        for raw in &self.selections {
            let (code, values) = split_pair(raw)?;
            let values = values
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            selections.insert(code, values);
        }
        let renames = self
            .renames
            .iter()
            .map(|raw| split_pair(raw))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(FetchOptions {
            selections,
            renames,
            label_dimensions: self.labels.clone(),
            unmapped: self.unmapped,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = args.fetch_options()?;
    let base_url = args
        .base_url
        .clone()
        .or_else(|| std::env::var("SCB_API_BASE").ok())
        .unwrap_or_else(|| SCB_API_BASE.to_string());

    let client = PxWebClient::new(base_url);
    let mut df = statistics::fetch_table(&client, &args.table, &options).await?;
    println!("{}", df.head(Some(5)));

    statistics::write_frame(&mut df, &args.output)?;
    println!("Saved: {}", args.output.display());
    info!("{} rows x {} columns", df.height(), df.width());
    Ok(())
}
