//! Flatten a PxWeb query response into a table.

use crate::error::{PipelineError, Result};
use crate::statistics::client::{QueryResponse, ResponseColumn};
use crate::statistics::labels::LabelMap;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::warn;

/// PxWeb placeholders for suppressed or missing cells.
const MISSING_MARKERS: [&str; 4] = ["..", ".", "-", ""];

#[derive(Debug, Clone, Default)]
pub struct ReshapeOptions {
    /// Output column name per dimension/content code. Unnamed codes are lower-cased.
    pub renames: BTreeMap<String, String>,
    /// Label dictionaries; each adds a `<column>_label` column.
    pub labels: Vec<LabelMap>,
}

impl ReshapeOptions {
    fn column_name(&self, code: &str) -> String {
        self.renames
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_lowercase())
    }
}

fn parse_value(raw: &str, column: &str, row: usize) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return Ok(None);
    }
    trimmed.parse::<f64>().map(Some).map_err(|_| {
        PipelineError::MalformedRecord(format!(
            "value '{}' for {} in observation {} is not numeric",
            raw, column, row
        ))
    })
}

/// One string column per dimension (plus requested label columns) and one
/// Float64 column per content variable, one row per observation.
pub fn observations_to_frame(response: &QueryResponse, options: &ReshapeOptions) -> Result<DataFrame> {
    let (contents, dimensions): (Vec<&ResponseColumn>, Vec<&ResponseColumn>) =
        response.columns.iter().partition(|c| c.is_content());

    for label in &options.labels {
        if !dimensions.iter().any(|d| d.code == label.dimension()) {
            return Err(PipelineError::Config(format!(
                "cannot label '{}': not a dimension of the response",
                label.dimension()
            )));
        }
    }

    let rows = response.data.len();
    let mut keys: Vec<Vec<&str>> = vec![Vec::with_capacity(rows); dimensions.len()];
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(rows); contents.len()];

    for (row, observation) in response.data.iter().enumerate() {
        if observation.key.len() != dimensions.len() || observation.values.len() != contents.len() {
            return Err(PipelineError::MalformedRecord(format!(
                "observation {} has {} keys and {} values, expected {} and {}",
                row,
                observation.key.len(),
                observation.values.len(),
                dimensions.len(),
                contents.len()
            )));
        }
        for (i, code) in observation.key.iter().enumerate() {
            keys[i].push(code.as_str());
        }
        for (i, raw) in observation.values.iter().enumerate() {
            values[i].push(parse_value(raw, &contents[i].code, row)?);
        }
    }

    let mut columns: Vec<Series> = Vec::with_capacity(dimensions.len() * 2 + contents.len());
    for (dimension, codes) in dimensions.iter().zip(&keys) {
        let name = options.column_name(&dimension.code);
        columns.push(Series::new(&name, codes));

        if let Some(map) = options.labels.iter().find(|m| m.dimension() == dimension.code) {
            let labels = map.apply(codes.iter().copied())?;
            let missing = labels.iter().filter(|l| l.is_none()).count();
            if missing > 0 {
                warn!("{} codes in {} have no label", missing, dimension.code);
            }
            columns.push(Series::new(&format!("{}_label", name), labels));
        }
    }
    for (content, vals) in contents.iter().zip(values) {
        columns.push(Series::new(&options.column_name(&content.code), vals));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::client::Observation;
    use crate::statistics::labels::UnmappedPolicy;
    use std::collections::HashMap;

    fn column(code: &str, kind: &str) -> ResponseColumn {
        ResponseColumn {
            code: code.to_string(),
            text: code.to_string(),
            kind: kind.to_string(),
        }
    }

    fn obs(key: &[&str], value: &str) -> Observation {
        Observation {
            key: key.iter().map(|k| k.to_string()).collect(),
            values: vec![value.to_string()],
        }
    }

    fn response() -> QueryResponse {
        QueryResponse {
            columns: vec![
                column("Yrke2012", "d"),
                column("Kon", "d"),
                column("Tid", "t"),
                column("AM0210A1", "c"),
            ],
            data: vec![
                obs(&["1", "1", "2020M01"], "120.5"),
                obs(&["1", "2", "2020M01"], ".."),
                obs(&["2", "3", "2020M02"], "98"),
            ],
        }
    }

    fn options() -> ReshapeOptions {
        let mut renames = BTreeMap::new();
        renames.insert("Yrke2012".to_string(), "code_1".to_string());
        renames.insert("Tid".to_string(), "month".to_string());
        renames.insert("AM0210A1".to_string(), "employed".to_string());
        let sex: HashMap<String, String> = [("1", "men"), ("2", "women")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReshapeOptions {
            renames,
            labels: vec![LabelMap::new("Kon", sex, UnmappedPolicy::Null)],
        }
    }

    #[test]
    fn test_flat_table_layout() {
        let df = observations_to_frame(&response(), &options()).unwrap();
        assert_eq!(
            df.get_column_names(),
            vec!["code_1", "kon", "kon_label", "month", "employed"]
        );
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("employed").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_missing_markers_become_null() {
        let df = observations_to_frame(&response(), &options()).unwrap();
        let employed = df.column("employed").unwrap().f64().unwrap();
        assert_eq!(employed.get(0), Some(120.5));
        assert_eq!(employed.get(1), None);
        assert_eq!(employed.get(2), Some(98.0));
    }

    #[test]
    fn test_unmapped_label_is_null() {
        let df = observations_to_frame(&response(), &options()).unwrap();
        let labels = df.column("kon_label").unwrap().str().unwrap();
        assert_eq!(labels.get(0), Some("men"));
        assert_eq!(labels.get(1), Some("women"));
        assert_eq!(labels.get(2), None);
    }

    #[test]
    fn test_short_key_is_malformed() {
        let mut resp = response();
        resp.data.push(obs(&["1", "2020M03"], "1"));
        assert!(matches!(
            observations_to_frame(&resp, &options()),
            Err(PipelineError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_non_numeric_value_is_malformed() {
        let mut resp = response();
        resp.data.push(obs(&["1", "1", "2020M03"], "n/a"));
        assert!(matches!(
            observations_to_frame(&resp, &options()),
            Err(PipelineError::MalformedRecord(_))
        ));
    }
}
