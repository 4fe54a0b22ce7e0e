//! Fetching monthly occupation-by-sex statistics into a flat parquet table.
//!
//! This is the upstream producer of the SCB monthly extract the merge
//! pipeline reads; it never runs as part of that pipeline.

pub mod client;
pub mod labels;
pub mod reshape;

pub use client::{PxWebClient, StatisticsApi, TableMetadata, TableQuery};
pub use labels::{LabelMap, UnmappedPolicy};
pub use reshape::{observations_to_frame, ReshapeOptions};

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub selections: BTreeMap<String, Vec<String>>,
    pub renames: BTreeMap<String, String>,
    /// Dimensions that get a `<column>_label` column.
    pub label_dimensions: Vec<String>,
    pub unmapped: UnmappedPolicy,
}

/// Fetch one table and reshape it into a frame.
pub async fn fetch_table(
    api: &dyn StatisticsApi,
    table: &str,
    options: &FetchOptions,
) -> Result<DataFrame> {
    let metadata = api.table_metadata(table).await?;
    info!(
        "Table '{}' has {} variables",
        metadata.title,
        metadata.variables.len()
    );

    let labels = options
        .label_dimensions
        .iter()
        .map(|code| {
            metadata
                .variable(code)
                .map(|v| LabelMap::from_variable(v, options.unmapped))
                .ok_or_else(|| {
                    PipelineError::Config(format!("table '{}' has no variable '{}'", table, code))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let query = TableQuery::build(&metadata, &options.selections)?;
    let response = api.query(table, &query).await?;
    info!("Received {} observations", response.data.len());

    observations_to_frame(
        &response,
        &ReshapeOptions {
            renames: options.renames.clone(),
            labels,
        },
    )
}

/// Write `df` to `path`, creating the parent directory first.
pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::sink(path, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::sink(path, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| PipelineError::sink(path, e))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
