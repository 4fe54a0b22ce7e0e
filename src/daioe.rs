//! Yearly occupation-level aggregates of the DAIOE exposure index.

use crate::error::{PipelineError, Result};
use crate::view::{PlanStep, View};
use polars::prelude::*;
use tracing::{debug, info};

pub const LEVEL_COLUMN: &str = "level";
pub const SSYK_COLUMN: &str = "ssyk_code";
pub const YEAR_COLUMN: &str = "year";
pub const WEIGHT_COLUMN: &str = "weight_sum";

pub const DEFAULT_LEVEL: &str = "SSYK1";

/// Name prefixes of the exposure measures, in output order.
pub const MEASURE_PREFIXES: [&str; 2] = ["daioe_", "pctl_daioe_"];

pub const GROUP_KEYS: [&str; 3] = [LEVEL_COLUMN, SSYK_COLUMN, YEAR_COLUMN];

/// Measure columns found in a live schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureSelection {
    pub columns: Vec<String>,
}

impl MeasureSelection {
    /// Pick every column whose name starts with one of `MEASURE_PREFIXES`,
    /// grouped by prefix and otherwise in schema order.
    pub fn discover(columns: &[String]) -> Self {
        let columns = MEASURE_PREFIXES
            .iter()
            .flat_map(|prefix| columns.iter().filter(move |c| c.starts_with(prefix)))
            .cloned()
            .collect();
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// How each non-key column is reduced within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// Mean, then cast to Int64 (truncates toward zero).
    TruncatedMean,
    Mean,
}

#[derive(Debug, Clone)]
pub struct AggregationSpec {
    pub keys: Vec<String>,
    pub reductions: Vec<(String, Reduction)>,
}

impl AggregationSpec {
    pub fn for_measures(measures: &MeasureSelection) -> Self {
        let mut reductions = vec![(WEIGHT_COLUMN.to_string(), Reduction::TruncatedMean)];
        reductions.extend(
            measures
                .columns
                .iter()
                .map(|c| (c.clone(), Reduction::Mean)),
        );
        Self {
            keys: GROUP_KEYS.iter().map(|k| k.to_string()).collect(),
            reductions,
        }
    }

    pub fn key_exprs(&self) -> Vec<Expr> {
        self.keys.iter().map(|k| col(k)).collect()
    }

    pub fn agg_exprs(&self) -> Vec<Expr> {
        self.reductions
            .iter()
            .map(|(name, reduction)| match reduction {
                Reduction::TruncatedMean => col(name).mean().cast(DataType::Int64).alias(name),
                Reduction::Mean => col(name).mean().alias(name),
            })
            .collect()
    }

    /// Columns in the order they are projected before grouping.
    pub fn projected_columns(&self) -> Vec<String> {
        self.keys
            .iter()
            .chain(self.reductions.iter().map(|(name, _)| name))
            .cloned()
            .collect()
    }
}

/// Keep one classification level and average every measure per
/// (`level`, `ssyk_code`, `year`).
pub fn prepare_daioe_level(daioe: &View, level: &str) -> Result<View> {
    let columns = daioe.column_names()?;
    for required in GROUP_KEYS.iter().chain([WEIGHT_COLUMN].iter()) {
        if !columns.iter().any(|c| c == required) {
            return Err(PipelineError::Schema(format!(
                "{} is missing required column '{}'",
                daioe.label(),
                required
            )));
        }
    }

    let measures = MeasureSelection::discover(&columns);
    if measures.is_empty() {
        return Err(PipelineError::Schema(format!(
            "{} has no columns starting with {}",
            daioe.label(),
            MEASURE_PREFIXES.join(" or ")
        )));
    }
    info!("Discovered {} DAIOE measure columns", measures.columns.len());
    debug!("Measures: {:?}", measures.columns);

    let spec = AggregationSpec::for_measures(&measures);
    let projected = spec.projected_columns();
    let projection: Vec<Expr> = projected
        .iter()
        .map(|name| match name.as_str() {
            // keys are normalised so the join against SCB lines up
            SSYK_COLUMN => col(name).cast(DataType::String),
            YEAR_COLUMN => col(name).cast(DataType::Int64),
            _ => col(name),
        })
        .collect();

    let level_tag = level.to_string();
    let view = daioe
        .then(
            PlanStep::Filter {
                predicate: format!("{} == '{}'", LEVEL_COLUMN, level),
            },
            move |lf| lf.filter(col(LEVEL_COLUMN).eq(lit(level_tag))),
        )
        .then(PlanStep::Select { columns: projected }, |lf| {
            lf.select(projection)
        })
        .then(
            PlanStep::Group {
                by: spec.keys.clone(),
                agg: spec
                    .reductions
                    .iter()
                    .map(|(name, r)| format!("{:?}({})", r, name))
                    .collect(),
            },
            |lf| lf.group_by_stable(spec.key_exprs()).agg(spec.agg_exprs()),
        );

    debug!("DAIOE plan: {}", view.describe());
    Ok(view)
}
