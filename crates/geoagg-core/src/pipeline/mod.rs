//! Module: pipeline
//! Responsibility: the two-pass aggregate pipeline and the per-feature
//! refactor-fields pipeline, plus the grouping substrate they share.
//! Does not own: expression semantics (see `expr`) or output storage (see
//! `layer`).
//! Boundary: every configured expression is parsed and prepared before the
//! first feature is read; any failure aborts the run and the sink is never
//! finished.

mod aggregate;
mod group;
mod refactor;

#[cfg(test)]
mod tests;

use crate::{
    config::ProjectSettings,
    error::ExecutionError,
    expr::{Expression, ExpressionContext},
    geometry::{Crs, DistanceArea},
    obs::PipelineKind,
};
use serde::Serialize;

// re-exports
pub use aggregate::{AggregatePipeline, aggregate_expression};
pub use group::{Group, GroupKey, GroupTable, StableHash, stable_hash_from_digest};
pub use refactor::{ROW_NUMBER, RefactorPipeline};

///
/// RunSummary
///
/// Counts reported by one successful run.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct RunSummary {
    pub pipeline: PipelineKind,
    pub features_read: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<u64>,
    pub features_written: u64,
}

/// Calculator bound to every expression of one run: the source CRS with
/// ellipsoidal mode on and the project ellipsoid.
fn run_calculator(source_crs: &Crs, project: &ProjectSettings) -> DistanceArea {
    DistanceArea::new(source_crs.clone())
        .with_ellipsoidal_mode(true)
        .with_ellipsoid(project.ellipsoid.clone())
}

/// Parse, bind, and prepare one expression against the input schema.
fn prepare_expression(
    text: &str,
    calculator: &DistanceArea,
    project: &ProjectSettings,
    ctx: &ExpressionContext<'_>,
) -> Result<Expression, ExecutionError> {
    let mut expression = Expression::parse(text)?
        .with_calculator(calculator.clone())
        .with_units(project.distance_units, project.area_units);
    expression.prepare(ctx)?;

    Ok(expression)
}

fn count_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

fn feature_id(index: usize) -> Result<i64, ExecutionError> {
    i64::try_from(index).map_err(|_| {
        ExecutionError::pipeline_invariant(format!("feature index {index} exceeds the id range"))
    })
}
