use crate::error::{PipelineError, Result};
use crate::view::View;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: u64,
    pub columns: usize,
    pub streamed: bool,
}

/// Sibling file the plan is written to before being renamed into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.partial", name))
}

/// Execute `view` and write it to `path` as parquet.
///
/// The streaming engine is tried first; plans it cannot run are collected
/// instead. Output goes to a `.partial` sibling and is renamed on success,
/// so a failed export never leaves a truncated file at `path`.
pub fn export_parquet(view: &View, path: &Path) -> Result<ExportReport> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(PipelineError::sink(
            path,
            format!("parent directory {} does not exist", parent.display()),
        ));
    }

    let partial = partial_path(path);
    let written = write_partial(view, &partial).and_then(|streamed| {
        let report = read_back(&partial, path, streamed)?;
        std::fs::rename(&partial, path).map_err(|e| PipelineError::sink(path, e))?;
        Ok(report)
    });

    let report = match written {
        Ok(report) => report,
        Err(e) => {
            if partial.exists() {
                if let Err(rm) = std::fs::remove_file(&partial) {
                    warn!("Could not remove {}: {}", partial.display(), rm);
                }
            }
            return Err(e);
        }
    };

    info!(
        "Wrote {} rows x {} columns to {}",
        report.rows,
        report.columns,
        path.display()
    );
    Ok(report)
}

fn write_partial(view: &View, partial: &Path) -> Result<bool> {
    match view
        .lazy()
        .sink_parquet(partial.to_path_buf(), ParquetWriteOptions::default())
    {
        Ok(()) => Ok(true),
        Err(e) => match PipelineError::from_execution(e) {
            PipelineError::Polars(e) if is_unsupported_by_streaming(&e) => {
                warn!(
                    "Streaming engine cannot run the {} plan ({}); collecting instead",
                    view.label(),
                    e
                );
                let mut df = view.collect()?;
                let file = File::create(partial).map_err(|e| PipelineError::sink(partial, e))?;
                ParquetWriter::new(file)
                    .finish(&mut df)
                    .map_err(|e| PipelineError::sink(partial, e))?;
                Ok(false)
            }
            PipelineError::Polars(e) if is_io(&e) => Err(PipelineError::sink(partial, e)),
            other => Err(other),
        },
    }
}

fn is_unsupported_by_streaming(err: &PolarsError) -> bool {
    let message = err.to_string();
    message.contains("not yet supported") || message.contains("standard engine")
}

fn is_io(err: &PolarsError) -> bool {
    match err {
        PolarsError::IO { .. } => true,
        PolarsError::Context { error, .. } => is_io(error),
        _ => false,
    }
}

/// Re-scan the written `partial` file; the report names the final `path`.
fn read_back(partial: &Path, path: &Path, streamed: bool) -> Result<ExportReport> {
    let reference = partial.display().to_string();
    let frame = LazyFrame::scan_parquet(partial, ScanArgsParquet::default())
        .map_err(|e| PipelineError::sink(path, e))?;
    let view = View::scan("export", reference, frame);
    let shape = crate::inspect::shape(&view).map_err(|e| PipelineError::sink(path, e))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        rows: shape.rows,
        columns: shape.columns,
        streamed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daioe_merge_export_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        assert_eq!(
            partial_path(Path::new("data/out.parquet")),
            PathBuf::from("data/.out.parquet.partial")
        );
    }

    #[test]
    fn test_export_writes_file_and_reports_shape() {
        let dir = test_dir("ok");
        let path = dir.join("out.parquet");
        let df = df![
            "code_1" => ["1", "2"],
            "year" => [2020i64, 2021]
        ]
        .unwrap();

        let report = export_parquet(&View::from_frame("t", df), &path).unwrap();
        assert!(path.exists());
        assert!(!partial_path(&path).exists());
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, 2);
    }

    #[test]
    fn test_missing_parent_is_sink_write_failure() {
        let path = test_dir("missing_parent").join("nope").join("out.parquet");
        let df = df!["a" => [1i64]].unwrap();
        let err = export_parquet(&View::from_frame("t", df), &path).unwrap_err();
        assert!(matches!(err, PipelineError::SinkWriteFailure { .. }));
    }

    #[test]
    fn test_failed_execution_leaves_no_file() {
        let dir = test_dir("failed");
        let path = dir.join("out.parquet");
        let df = df!["code_1" => ["1"], "month" => ["bad"]].unwrap();
        let cleaned = crate::scb::clean_scb_months(&View::from_frame("scb", df)).unwrap();

        let err = export_parquet(&cleaned, &path).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord(_)), "{:?}", err);
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_plan_error_is_not_reported_as_sink_failure() {
        let dir = test_dir("plan_error");
        let path = dir.join("out.parquet");
        let df = df!["a" => [1i64]].unwrap();
        let broken = View::from_frame("t", df).then(
            crate::view::PlanStep::Select {
                columns: vec!["missing".to_string()],
            },
            |lf| lf.select([col("missing")]),
        );

        let err = export_parquet(&broken, &path).unwrap_err();
        assert!(matches!(err, PipelineError::Polars(_)), "{:?}", err);
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_partial_is_sink_write_failure() {
        let dir = test_dir("unwritable");
        let path = dir.join("out.parquet");
        // a directory squatting on the partial path makes the file create fail
        std::fs::create_dir_all(partial_path(&path)).unwrap();
        let df = df!["a" => [1i64, 2]].unwrap();

        let err = export_parquet(&View::from_frame("t", df), &path).unwrap_err();
        assert!(matches!(err, PipelineError::SinkWriteFailure { .. }), "{:?}", err);
        assert!(!path.exists());
    }
}
