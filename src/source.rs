use crate::error::{PipelineError, Result};
use crate::view::View;
use polars::prelude::*;
use std::path::PathBuf;
use tracing::info;

/// Where a dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Remote(String),
    Local(PathBuf),
}

impl SourceRef {
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceRef::Remote(trimmed.to_string())
        } else {
            SourceRef::Local(PathBuf::from(trimmed))
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            SourceRef::Remote(url) => url.clone(),
            SourceRef::Local(path) => path.display().to_string(),
        }
    }
}

/// Open `reference` as a lazy parquet scan. Remote references are read
/// through the engine's HTTP object store, so only the footer is fetched
/// here; row groups are requested when a later stage executes the plan.
///
/// The schema is resolved once so that an unreachable or non-parquet source
/// fails here rather than mid-pipeline.
pub fn open_source(label: &str, reference: &str) -> Result<View> {
    let source = SourceRef::parse(reference);
    let reference = source.as_str();
    if let SourceRef::Local(path) = &source {
        if !path.exists() {
            return Err(PipelineError::source_unavailable(
                &reference,
                format!("file not found: {}", path.display()),
            ));
        }
    }

    let frame = LazyFrame::scan_parquet(&reference, ScanArgsParquet::default())
        .map_err(|e| PipelineError::source_unavailable(&reference, e))?;
    let view = View::scan(label, &reference, frame);
    let width = view
        .width()
        .map_err(|e| PipelineError::source_unavailable(&reference, e))?;

    info!("Opened {} ({} columns) from {}", label, width, reference);
    Ok(view)
}
