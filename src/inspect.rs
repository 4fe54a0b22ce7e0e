use crate::error::{PipelineError, Result};
use crate::view::View;
use polars::prelude::*;

/// Row and column count of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: u64,
    pub columns: usize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rows x {} columns", self.rows, self.columns)
    }
}

/// Count rows with a `len()`-only plan and read the width from the schema.
///
/// The count is read by position: a bare parquet scan is answered by the
/// fast-count path, which names its output column `len` regardless of alias.
pub fn shape(view: &View) -> Result<Shape> {
    let counted = view
        .lazy()
        .select([len().alias("rows")])
        .collect()
        .map_err(PipelineError::from_execution)?;
    let rows = counted
        .get_columns()
        .first()
        .ok_or_else(|| PipelineError::Schema(format!("row count of {} returned no column", view.label())))?
        .cast(&DataType::UInt64)?
        .u64()?
        .get(0)
        .unwrap_or(0);

    Ok(Shape {
        rows,
        columns: view.width()?,
    })
}

/// Print `"{label}: {rows} rows x {cols} columns"` to stdout.
pub fn inspect(label: &str, view: &View) -> Result<Shape> {
    let shape = shape(view)?;
    println!("{}: {}", label, shape);
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_counts_rows_and_columns() {
        let df = df![
            "a" => [1i64, 2, 3, 4],
            "b" => ["w", "x", "y", "z"],
            "c" => [0.1, 0.2, 0.3, 0.4]
        ]
        .unwrap();
        let shape = shape(&View::from_frame("t", df)).unwrap();
        assert_eq!(shape, Shape { rows: 4, columns: 3 });
        assert_eq!(shape.to_string(), "4 rows x 3 columns");
    }

    #[test]
    fn test_shape_of_empty_view() {
        let df = df!["a" => Vec::<i64>::new()].unwrap();
        let shape = shape(&View::from_frame("t", df)).unwrap();
        assert_eq!(shape, Shape { rows: 0, columns: 1 });
    }

    #[test]
    fn test_shape_of_scanned_parquet() {
        let dir = std::env::temp_dir().join("daioe_merge_inspect_scan");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scb.parquet");
        let mut df = df![
            "code_1" => ["1", "2", "3"],
            "month" => ["2023M01", "2023M02", "2023M03"]
        ]
        .unwrap();
        ParquetWriter::new(std::fs::File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let view = crate::source::open_source("SCB", path.to_str().unwrap()).unwrap();
        assert_eq!(shape(&view).unwrap(), Shape { rows: 3, columns: 2 });
    }
}
