//! Module: pipeline::refactor
//! Responsibility: rewrite every input feature into a new schema, one output
//! field per mapping expression, keeping the geometry.

use crate::{
    config::{FieldMapping, ProjectSettings, RefactorConfig},
    error::ExecutionError,
    expr::{Expression, ExpressionContext, Scope},
    feature::{Feature, FieldDef, Fields},
    layer::{FeatureSink, FeatureSource, OutputSchema},
    obs::{
        MetricsEvent, PipelineKind, ProgressSink,
        progress::scaled,
        sink::{RunSpan, record},
    },
    pipeline::{RunSummary, count_u64, prepare_expression, run_calculator},
    value::Value,
};
use tracing::info;

/// Variable holding the 1-based index of the feature being mapped.
pub const ROW_NUMBER: &str = "row_number";

///
/// RefactorPipeline
///

#[derive(Clone, Debug)]
pub struct RefactorPipeline {
    mappings: Vec<FieldMapping>,
    project: ProjectSettings,
}

impl RefactorPipeline {
    #[must_use]
    pub fn new(mappings: Vec<FieldMapping>) -> Self {
        Self {
            mappings,
            project: ProjectSettings::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &RefactorConfig) -> Self {
        Self::new(config.mapping.clone()).with_project(config.project.clone())
    }

    #[must_use]
    pub fn with_project(mut self, project: ProjectSettings) -> Self {
        self.project = project;
        self
    }

    #[must_use]
    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// Map every source feature through the configured expressions.
    pub fn run(
        &self,
        source: &dyn FeatureSource,
        sink: &mut dyn FeatureSink,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, ExecutionError> {
        let span = RunSpan::new(PipelineKind::Refactor);
        info!(
            pipeline = %PipelineKind::Refactor,
            input = source.name(),
            fields = self.mappings.len(),
            "run started"
        );

        let calculator = run_calculator(source.crs(), &self.project);
        let prepare_ctx = ExpressionContext::new(source.fields());
        let mapped = self
            .mappings
            .iter()
            .map(|mapping| {
                let expression =
                    prepare_expression(&mapping.expression, &calculator, &self.project, &prepare_ctx)?;
                Ok((mapping.field_def(), expression))
            })
            .collect::<Result<Vec<(FieldDef, Expression)>, ExecutionError>>()?;

        let features: Vec<Feature> = source.features().collect();
        record(MetricsEvent::FeaturesRead {
            kind: PipelineKind::Refactor,
            count: count_u64(features.len()),
        });

        sink.open(OutputSchema {
            fields: Fields::new(mapped.iter().map(|(def, _)| def.clone()).collect()),
            geometry_type: source.geometry_type(),
            crs: source.crs().clone(),
        })?;

        let total = features.len();
        let mut scope = Scope::new();
        for (index, feature) in features.iter().enumerate() {
            let row_number = i64::try_from(index + 1).unwrap_or(i64::MAX);
            scope.insert(ROW_NUMBER.to_string(), Value::Int(row_number));
            let ctx = ExpressionContext::new(source.fields())
                .with_layer(&features)
                .with_feature(feature)
                .with_scope(&scope);

            let attributes = mapped
                .iter()
                .map(|(def, expression)| Ok(def.convert(expression.evaluate(&ctx)?)))
                .collect::<Result<Vec<_>, ExecutionError>>()?;
            sink.append(
                Feature::new(feature.id, attributes).with_geometry(feature.geometry.clone()),
            )?;
            progress.set_progress(scaled(0, 100, index, total));
        }
        sink.finish()?;

        record(MetricsEvent::FeaturesWritten {
            kind: PipelineKind::Refactor,
            count: count_u64(total),
        });
        info!(features = total, "run finished");
        span.succeed();

        Ok(RunSummary {
            pipeline: PipelineKind::Refactor,
            features_read: count_u64(total),
            groups: None,
            features_written: count_u64(total),
        })
    }
}
