//! Module: pipeline::aggregate
//! Responsibility: group input features by one expression, then emit one
//! output feature per group with a merged geometry and aggregate attributes.
//! Does not own: key canonicalization (see `pipeline::group`) or geometry
//! merging (see `geometry::engine`).

use crate::{
    config::{AggregateConfig, AggregateFieldSpec, ProjectSettings},
    error::ExecutionError,
    expr::{AggregateFunction, Expression, ExpressionContext, quote_string},
    feature::{Feature, FieldDef, Fields},
    geometry::{Geometry, GeometryEngine, PlanarEngine},
    layer::{FeatureSink, FeatureSource, OutputSchema},
    obs::{
        MetricsEvent, PipelineKind, ProgressSink,
        progress::scaled,
        sink::{RunSpan, record},
    },
    pipeline::{
        Group, GroupTable, RunSummary, count_u64, feature_id, prepare_expression, run_calculator,
    },
    value::Value,
};
use tracing::{debug, info};

const GROUPING_SPAN: u8 = 50;
const AGGREGATION_BASE: u8 = 50;

/// Build the per-group expression text for one output field.
///
/// `first_value` evaluates the raw input against the group's first member;
/// concatenations carry the filter `TRUE` and the quoted delimiter; every
/// other aggregate is restricted to the current group by `group_by`.
#[must_use]
pub fn aggregate_expression(spec: &AggregateFieldSpec, group_by: &str) -> String {
    let function = spec.aggregate;
    if function == AggregateFunction::FirstValue {
        return spec.input.clone();
    }
    if function.takes_delimiter() {
        return format!(
            "{function}({}, {group_by}, TRUE, {})",
            spec.input,
            quote_string(spec.delimiter())
        );
    }

    format!("{function}({}, {group_by})", spec.input)
}

///
/// AggregatePipeline
///
/// Group-and-aggregate over one feature source. Generic over the geometry
/// engine so callers can swap the union implementation.
///

#[derive(Clone, Debug)]
pub struct AggregatePipeline<E = PlanarEngine> {
    group_by: String,
    fields: Vec<AggregateFieldSpec>,
    project: ProjectSettings,
    engine: E,
}

impl AggregatePipeline {
    #[must_use]
    pub fn new(group_by: impl Into<String>, fields: Vec<AggregateFieldSpec>) -> Self {
        Self {
            group_by: group_by.into(),
            fields,
            project: ProjectSettings::default(),
            engine: PlanarEngine,
        }
    }

    #[must_use]
    pub fn from_config(config: &AggregateConfig) -> Self {
        Self::new(config.group_by.clone(), config.aggregates.clone())
            .with_project(config.project.clone())
    }
}

impl<E: GeometryEngine> AggregatePipeline<E> {
    #[must_use]
    pub fn with_project(mut self, project: ProjectSettings) -> Self {
        self.project = project;
        self
    }

    #[must_use]
    pub fn with_engine<F: GeometryEngine>(self, engine: F) -> AggregatePipeline<F> {
        AggregatePipeline {
            group_by: self.group_by,
            fields: self.fields,
            project: self.project,
            engine,
        }
    }

    #[must_use]
    pub fn group_by(&self) -> &str {
        &self.group_by
    }

    #[must_use]
    pub fn fields(&self) -> &[AggregateFieldSpec] {
        &self.fields
    }

    /// Run both passes: group every source feature, then write one output
    /// feature per group in first-occurrence order.
    pub fn run(
        &self,
        source: &dyn FeatureSource,
        sink: &mut dyn FeatureSink,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, ExecutionError> {
        let span = RunSpan::new(PipelineKind::Aggregate);
        info!(
            pipeline = %PipelineKind::Aggregate,
            input = source.name(),
            group_by = %self.group_by,
            "run started"
        );

        let plan = self.prepare(source)?;
        let features: Vec<Feature> = source.features().collect();
        record(MetricsEvent::FeaturesRead {
            kind: PipelineKind::Aggregate,
            count: count_u64(features.len()),
        });

        let groups = plan.group(source.fields(), &features, progress)?;
        record(MetricsEvent::GroupsCreated {
            count: count_u64(groups.len()),
        });
        debug!(
            features = features.len(),
            groups = groups.len(),
            "grouping finished"
        );

        sink.open(OutputSchema {
            fields: Fields::new(plan.fields.iter().map(|(def, _)| def.clone()).collect()),
            geometry_type: source.geometry_type().multi_type(),
            crs: source.crs().clone(),
        })?;

        let total = groups.len();
        for (index, group) in groups.iter().enumerate() {
            let feature = plan.aggregate(index, group, source.fields(), &self.engine)?;
            sink.append(feature)?;
            progress.set_progress(scaled(AGGREGATION_BASE, GROUPING_SPAN, index, total));
        }
        sink.finish()?;

        record(MetricsEvent::FeaturesWritten {
            kind: PipelineKind::Aggregate,
            count: count_u64(total),
        });
        info!(groups = total, "run finished");
        span.succeed();

        Ok(RunSummary {
            pipeline: PipelineKind::Aggregate,
            features_read: count_u64(features.len()),
            groups: Some(count_u64(total)),
            features_written: count_u64(total),
        })
    }

    // Parse and prepare every expression up front so a bad one fails the run
    // before any feature is read or any output is opened.
    fn prepare(&self, source: &dyn FeatureSource) -> Result<AggregatePlan, ExecutionError> {
        let calculator = run_calculator(source.crs(), &self.project);
        let ctx = ExpressionContext::new(source.fields());
        let prepare = |text: &str| prepare_expression(text, &calculator, &self.project, &ctx);

        let group_by = prepare(&self.group_by)?;
        let geometry = prepare(&format!("collect($geometry, {})", self.group_by))?;
        let fields = self
            .fields
            .iter()
            .map(|spec| {
                let expression = prepare(&aggregate_expression(spec, &self.group_by))?;
                Ok((spec.field_def(), expression))
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        Ok(AggregatePlan {
            group_by,
            geometry,
            fields,
        })
    }
}

///
/// AggregatePlan
///
/// Prepared expressions of one run.
///

struct AggregatePlan {
    group_by: Expression,
    geometry: Expression,
    fields: Vec<(FieldDef, Expression)>,
}

impl AggregatePlan {
    fn group(
        &self,
        schema: &Fields,
        features: &[Feature],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<Group>, ExecutionError> {
        let mut table = GroupTable::new();
        let total = features.len();
        for (index, feature) in features.iter().enumerate() {
            let ctx = ExpressionContext::new(schema)
                .with_layer(features)
                .with_feature(feature);
            let value = self.group_by.evaluate(&ctx)?;
            table.insert(value, feature.clone());
            progress.set_progress(scaled(0, GROUPING_SPAN, index + 1, total));
        }

        Ok(table.into_groups())
    }

    fn aggregate<E: GeometryEngine>(
        &self,
        index: usize,
        group: &Group,
        schema: &Fields,
        engine: &E,
    ) -> Result<Feature, ExecutionError> {
        let first = group.first().ok_or_else(|| {
            ExecutionError::pipeline_invariant(format!("group {index} has no members"))
        })?;
        let ctx = ExpressionContext::new(schema)
            .with_layer(group.members())
            .with_feature(first)
            .with_engine(engine);

        let geometry = self.merged_geometry(&ctx, group, engine)?;
        let attributes = self
            .fields
            .iter()
            .map(|(def, expression)| Ok(def.convert(expression.evaluate(&ctx)?)))
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        Ok(Feature::new(feature_id(index)?, attributes).with_geometry(geometry))
    }

    // No geometry when every member's geometry is absent or empty; an empty
    // union of a non-empty collection is fatal.
    fn merged_geometry<E: GeometryEngine>(
        &self,
        ctx: &ExpressionContext<'_>,
        group: &Group,
        engine: &E,
    ) -> Result<Option<Geometry>, ExecutionError> {
        let collected = match self.geometry.evaluate(ctx)? {
            Value::Geometry(geometry) if !geometry.is_empty() => geometry,
            _ => return Ok(None),
        };

        let merged = engine.union(&collected)?;
        if merged.is_empty() {
            return Err(ExecutionError::geometry(format!(
                "Impossible to combine geometries for {} = {}",
                self.group_by.text(),
                group.value()
            )));
        }

        Ok(Some(merged.into_multi()))
    }
}
