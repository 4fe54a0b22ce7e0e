use crate::daioe::{LEVEL_COLUMN, SSYK_COLUMN};
use crate::error::Result;
use crate::scb::{CODE_COLUMN, YEAR_COLUMN};
use crate::view::{PlanStep, View};
use polars::prelude::*;
use tracing::debug;

/// Left-join cleaned SCB months to the yearly DAIOE aggregates on
/// (`code_1`, `year`) = (`ssyk_code`, `year`), then drop the constant `level`.
///
/// Every SCB row is kept; rows without a matching aggregate get nulls in
/// every measure column. The aggregate side must be unique on its keys.
pub fn merge_months_with_daioe(scb_clean: &View, daioe_level: &View) -> Result<View> {
    let left_on = vec![CODE_COLUMN.to_string(), YEAR_COLUMN.to_string()];
    let right_on = vec![SSYK_COLUMN.to_string(), YEAR_COLUMN.to_string()];
    let right = daioe_level.lazy();

    let merged = scb_clean
        .then(
            PlanStep::Join {
                with: daioe_level.label().to_string(),
                left_on: left_on.clone(),
                right_on: right_on.clone(),
                join_type: "left".to_string(),
            },
            |lf| {
                lf.join(
                    right,
                    [col(CODE_COLUMN), col(YEAR_COLUMN)],
                    [col(SSYK_COLUMN), col(YEAR_COLUMN)],
                    JoinArgs::new(JoinType::Left),
                )
            },
        )
        .then(
            PlanStep::Drop {
                columns: vec![LEVEL_COLUMN.to_string()],
            },
            |lf| lf.drop([LEVEL_COLUMN]),
        );

    debug!("Merged plan: {}", merged.describe());
    Ok(merged)
}
