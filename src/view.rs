//! Unmaterialized tabular views.
//!
//! A [`View`] is a label, a polars `LazyFrame` and the ordered list of
//! [`PlanStep`]s recorded while the plan was built. Transformations never
//! touch row data: they return a new view wrapping a longer plan. Only
//! [`View::preview`], [`View::collect`] and the shape/export helpers run it.

use crate::error::{PipelineError, Result};
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;

/// A recorded transformation, kept alongside the lazy plan for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op")]
pub enum PlanStep {
    #[serde(rename = "scan")]
    Scan { source: String },
    #[serde(rename = "filter")]
    Filter { predicate: String },
    #[serde(rename = "derive")]
    Derive { from: String, r#as: String },
    #[serde(rename = "select")]
    Select { columns: Vec<String> },
    #[serde(rename = "group")]
    Group { by: Vec<String>, agg: Vec<String> },
    #[serde(rename = "join")]
    Join {
        with: String,
        left_on: Vec<String>,
        right_on: Vec<String>,
        #[serde(rename = "type")]
        join_type: String,
    },
    #[serde(rename = "drop")]
    Drop { columns: Vec<String> },
}

impl std::fmt::Display for PlanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStep::Scan { source } => write!(f, "scan({})", source),
            PlanStep::Filter { predicate } => write!(f, "filter({})", predicate),
            PlanStep::Derive { from, r#as } => write!(f, "derive({} -> {})", from, r#as),
            PlanStep::Select { columns } => write!(f, "select({})", columns.join(", ")),
            PlanStep::Group { by, agg } => {
                write!(f, "group([{}]; {} aggs)", by.join(", "), agg.len())
            }
            PlanStep::Join {
                with,
                left_on,
                right_on,
                join_type,
            } => write!(
                f,
                "{}_join({}; [{}] = [{}])",
                join_type,
                with,
                left_on.join(", "),
                right_on.join(", ")
            ),
            PlanStep::Drop { columns } => write!(f, "drop({})", columns.join(", ")),
        }
    }
}

#[derive(Clone)]
pub struct View {
    label: String,
    frame: LazyFrame,
    steps: Vec<PlanStep>,
}

impl View {
    /// Wrap a freshly scanned frame.
    pub fn scan(label: impl Into<String>, source: impl Into<String>, frame: LazyFrame) -> Self {
        Self {
            label: label.into(),
            frame,
            steps: vec![PlanStep::Scan {
                source: source.into(),
            }],
        }
    }

    /// Build from an already materialized frame. Used by tests and the fetcher.
    pub fn from_frame(label: impl Into<String>, df: DataFrame) -> Self {
        Self::scan(label, "in-memory", df.lazy())
    }

    /// Return a new view whose plan is this plan followed by `step`.
    pub fn then(&self, step: PlanStep, f: impl FnOnce(LazyFrame) -> LazyFrame) -> View {
        let mut steps = self.steps.clone();
        steps.push(step);
        View {
            label: self.label.clone(),
            frame: f(self.frame.clone()),
            steps,
        }
    }

    /// Same plan, new label.
    pub fn relabel(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone()
    }

    /// Resolve the output schema from plan metadata. No rows are read.
    pub fn schema(&self) -> Result<SchemaRef> {
        self.frame.schema().map_err(PipelineError::from)
    }

    pub fn column_names(&self) -> Result<Vec<String>> {
        Ok(self.schema()?.iter_names().map(|n| n.to_string()).collect())
    }

    pub fn width(&self) -> Result<usize> {
        Ok(self.schema()?.len())
    }

    /// Execute only the first `n` rows of the plan.
    pub fn preview(&self, n: usize) -> Result<DataFrame> {
        self.frame
            .clone()
            .limit(n as IdxSize)
            .collect()
            .map_err(PipelineError::from_execution)
    }

    /// Execute the whole plan into memory.
    pub fn collect(&self) -> Result<DataFrame> {
        self.frame
            .clone()
            .collect()
            .map_err(PipelineError::from_execution)
    }

    pub fn describe(&self) -> String {
        self.steps.iter().map(|s| s.to_string()).join(" -> ")
    }

    /// Recorded steps as a JSON array, for debug logs.
    pub fn plan_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.steps)?)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("label", &self.label)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> View {
        let df = df![
            "a" => [1i64, 2, 3],
            "b" => ["x", "y", "z"]
        ]
        .unwrap();
        View::from_frame("sample", df)
    }

    #[test]
    fn test_then_leaves_input_plan_untouched() {
        let base = sample();
        let filtered = base.then(
            PlanStep::Filter {
                predicate: "a > 1".to_string(),
            },
            |lf| lf.filter(col("a").gt(lit(1i64))),
        );

        assert_eq!(base.steps.len(), 1);
        assert_eq!(filtered.steps.len(), 2);
        assert_eq!(base.collect().unwrap().height(), 3);
        assert_eq!(filtered.collect().unwrap().height(), 2);
    }

    #[test]
    fn test_schema_without_execution() {
        let view = sample();
        assert_eq!(view.column_names().unwrap(), vec!["a", "b"]);
        assert_eq!(view.width().unwrap(), 2);
    }

    #[test]
    fn test_preview_limits_rows() {
        assert_eq!(sample().preview(2).unwrap().height(), 2);
    }

    #[test]
    fn test_describe_lists_steps_in_order() {
        let view = sample().then(
            PlanStep::Drop {
                columns: vec!["b".to_string()],
            },
            |lf| lf.drop(["b"]),
        );
        assert_eq!(view.describe(), "scan(in-memory) -> drop(b)");
    }

    #[test]
    fn test_plan_json_tags_each_step() {
        let view = sample().then(
            PlanStep::Drop {
                columns: vec!["b".to_string()],
            },
            |lf| lf.drop(["b"]),
        );
        let plan: serde_json::Value = serde_json::from_str(&view.plan_json().unwrap()).unwrap();
        assert_eq!(plan[0]["op"], "scan");
        assert_eq!(plan[1]["op"], "drop");
        assert_eq!(plan[1]["columns"][0], "b");
    }
}
