use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Marker the year-derivation UDF puts in its compute error so the failure
/// can be told apart from other engine errors once it surfaces from `collect`.
pub const MALFORMED_MARKER: &str = "malformed record";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source unavailable: {reference}: {reason}")]
    SourceUnavailable { reference: String, reason: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Sink write failure: {}: {reason}", path.display())]
    SinkWriteFailure { path: PathBuf, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Statistics API error: {0}")]
    Api(String),

    #[error("No label for code '{code}' in dimension '{dimension}'")]
    UnmappedCode { dimension: String, code: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn source_unavailable(reference: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::SinkWriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify an error raised while executing a plan.
    pub fn from_execution(err: PolarsError) -> Self {
        let message = err.to_string();
        match message.find(MALFORMED_MARKER) {
            Some(idx) => PipelineError::MalformedRecord(
                message[idx + MALFORMED_MARKER.len()..]
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches(':')
                    .trim()
                    .to_string(),
            ),
            None => PipelineError::Polars(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_compute_error_becomes_malformed_record() {
        let err = PolarsError::ComputeError(
            format!("{}: month token 'x' has no 4-digit year", MALFORMED_MARKER).into(),
        );
        match PipelineError::from_execution(err) {
            PipelineError::MalformedRecord(msg) => {
                assert_eq!(msg, "month token 'x' has no 4-digit year");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_other_engine_errors_stay_polars() {
        let err = PolarsError::ColumnNotFound("month".into());
        assert!(matches!(
            PipelineError::from_execution(err),
            PipelineError::Polars(_)
        ));
    }
}
