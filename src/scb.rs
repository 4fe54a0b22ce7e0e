//! Cleaning of the SCB monthly occupation extract.

use crate::error::{PipelineError, Result, MALFORMED_MARKER};
use crate::view::{PlanStep, View};
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

pub const CODE_COLUMN: &str = "code_1";
pub const MONTH_COLUMN: &str = "month";
pub const YEAR_COLUMN: &str = "year";

/// Occupation codes starting with this prefix are military and dropped.
pub const MILITARY_PREFIX: &str = "0";

lazy_static! {
    static ref MONTH_YEAR: Regex = Regex::new(r"^(\d{4})").unwrap();
}

/// Parse the year out of a month token such as `2020M01`.
pub fn year_from_month(token: &str) -> Option<i64> {
    MONTH_YEAR
        .captures(token)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

fn malformed_month(token: Option<&str>, row: usize) -> PolarsError {
    let shown = match token {
        Some(t) => format!("'{}'", t),
        None => "null".to_string(),
    };
    PolarsError::ComputeError(
        format!(
            "{}: month token {} at row {} has no 4-digit year prefix",
            MALFORMED_MARKER, shown, row
        )
        .into(),
    )
}

/// Filter predicate over `[code_1, month]`. Military and null codes are
/// dropped; every kept row must carry a parseable month, so a bad token
/// fails any plan that evaluates the filter, row counts included.
fn keep_civilian_row(columns: &mut [Series]) -> PolarsResult<Option<Series>> {
    let codes = columns[0].cast(&DataType::String)?;
    let months = columns[1].cast(&DataType::String)?;

    let mut keep: Vec<bool> = Vec::with_capacity(codes.len());
    for (row, (code, token)) in codes.str()?.into_iter().zip(months.str()?).enumerate() {
        let civilian = code.map_or(false, |c| !c.starts_with(MILITARY_PREFIX));
        if civilian && token.and_then(year_from_month).is_none() {
            return Err(malformed_month(token, row));
        }
        keep.push(civilian);
    }

    Ok(Some(Series::new(CODE_COLUMN, keep)))
}

/// Column UDF behind the `year` derivation.
fn derive_year(months: Series) -> PolarsResult<Option<Series>> {
    let months = months.cast(&DataType::String)?;
    let tokens = months.str()?;

    let mut years: Vec<i64> = Vec::with_capacity(tokens.len());
    for (row, token) in tokens.into_iter().enumerate() {
        match token.and_then(year_from_month) {
            Some(year) => years.push(year),
            None => return Err(malformed_month(token, row)),
        }
    }

    Ok(Some(Series::new(YEAR_COLUMN, years)))
}

/// Drop military rows and derive an integer `year` from `month`.
pub fn clean_scb_months(scb: &View) -> Result<View> {
    let columns = scb.column_names()?;
    for required in [CODE_COLUMN, MONTH_COLUMN] {
        if !columns.iter().any(|c| c == required) {
            return Err(PipelineError::Schema(format!(
                "{} is missing required column '{}'",
                scb.label(),
                required
            )));
        }
    }

    let cleaned = scb
        .then(
            PlanStep::Filter {
                predicate: format!(
                    "not {} starts_with '{}' and {} has year",
                    CODE_COLUMN, MILITARY_PREFIX, MONTH_COLUMN
                ),
            },
            |lf| {
                lf.filter(map_multiple(
                    keep_civilian_row,
                    [col(CODE_COLUMN), col(MONTH_COLUMN)],
                    GetOutput::from_type(DataType::Boolean),
                ))
            },
        )
        .then(
            PlanStep::Derive {
                from: MONTH_COLUMN.to_string(),
                r#as: YEAR_COLUMN.to_string(),
            },
            |lf| {
                lf.with_columns([col(MONTH_COLUMN)
                    .map(derive_year, GetOutput::from_type(DataType::Int64))
                    .alias(YEAR_COLUMN)])
            },
        );

    debug!("Clean SCB plan: {}", cleaned.describe());
    Ok(cleaned)
}
