//! ## Crate layout
//! - `core`: values, geometry, expressions, layers, pipelines, and
//!   observability.
//! - `error`: the public, serializable error type.
//!
//! `aggregate` and `refactor` run one configured pipeline from a JSON layer
//! file to a JSON layer file. The `prelude` carries the configuration and
//! value vocabulary.

mod error;

pub use error::{Error, ErrorKind, ErrorOrigin, ExpressionErrorKind};
pub use geoagg_core as core;

use geoagg_core::{
    config::{AggregateConfig, RefactorConfig},
    layer::{JsonLayer, JsonLayerWriter},
    obs::ProgressSink,
    pipeline::{AggregatePipeline, RefactorPipeline, RunSummary},
};
use tracing::debug;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the aggregate pipeline described by `config`.
///
/// The output file is written only when the whole run succeeds.
pub fn aggregate(config: &AggregateConfig, progress: &dyn ProgressSink) -> Result<RunSummary, Error> {
    config.validate()?;
    let source = JsonLayer::open(&config.input)?;
    let mut sink = JsonLayerWriter::new(&config.output);
    debug!(input = %config.input, output = %config.output, "aggregate layers resolved");

    Ok(AggregatePipeline::from_config(config).run(&source, &mut sink, progress)?)
}

/// Run the refactor-fields pipeline described by `config`.
pub fn refactor(config: &RefactorConfig, progress: &dyn ProgressSink) -> Result<RunSummary, Error> {
    config.validate()?;
    let source = JsonLayer::open(&config.input)?;
    let mut sink = JsonLayerWriter::new(&config.output);
    debug!(input = %config.input, output = %config.output, "refactor layers resolved");

    Ok(RefactorPipeline::from_config(config).run(&source, &mut sink, progress)?)
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::{AggregateConfig, AggregateFieldSpec, FieldMapping, ProjectSettings, RefactorConfig},
        expr::AggregateFunction,
        feature::{Feature, FieldDef, FieldType, Fields},
        geometry::{Geometry, GeometryType},
        obs::{NoProgress, ProgressLog, ProgressSink},
        pipeline::RunSummary,
        value::Value,
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use geoagg_core::obs::NoProgress;
    use std::{fs, path::PathBuf};

    const PARCELS: &str = r#"{
        "name": "parcels",
        "crs": { "auth_id": "EPSG:3857", "geographic": false },
        "geometry_type": "polygon",
        "fields": [
            { "name": "name", "type": "string" },
            { "name": "kind", "type": "string" }
        ],
        "features": [
            { "id": 1, "attributes": { "name": "a", "kind": "x" }, "geometry": "POLYGON((0 0,1 0,1 1,0 1,0 0))" },
            { "id": 2, "attributes": { "name": "b", "kind": "y" }, "geometry": "POLYGON((5 5,6 5,6 6,5 6,5 5))" },
            { "id": 3, "attributes": { "name": "c", "kind": "x" }, "geometry": null }
        ]
    }"#;

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geoagg-{test}-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("scratch dir should be created");
        dir
    }

    fn aggregate_config(dir: &std::path::Path, input: &str) -> AggregateConfig {
        let input_path = dir.join("parcels.json");
        fs::write(&input_path, input).expect("input should be written");

        AggregateConfig::from_json(&format!(
            r#"{{ "input": {input}, "output": {output}, "group_by": "kind",
                 "aggregates": [
                    {{ "name": "kind", "type": "string", "aggregate": "first_value", "input": "kind" }},
                    {{ "name": "names", "type": "string", "aggregate": "concatenate", "input": "name", "delimiter": ";" }}
                 ] }}"#,
            input = serde_json_string(&input_path),
            output = serde_json_string(&dir.join("out.json")),
        ))
        .expect("config should load")
    }

    fn serde_json_string(path: &std::path::Path) -> String {
        serde_json::to_string(&path.display().to_string()).expect("path should encode")
    }

    #[test]
    fn aggregate_writes_the_output_layer() {
        let dir = scratch_dir("aggregate");
        let config = aggregate_config(&dir, PARCELS);

        let summary = aggregate(&config, &NoProgress).expect("aggregate should run");
        assert_eq!(summary.features_written, 2);

        let written = JsonLayer::open(&config.output).expect("output should load");
        let layer = written.into_memory();
        assert_eq!(layer.len(), 2);

        let text = fs::read_to_string(&config.output).expect("output should exist");
        assert!(text.contains("\"a;c\""), "{text}");
        assert!(text.contains("\"multi_polygon\""), "{text}");
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failed_aggregate_leaves_no_output_file() {
        let dir = scratch_dir("aggregate-failed");
        let mut config = aggregate_config(&dir, PARCELS);
        config.aggregates[1].input = "name ||".to_string();

        let err = aggregate(&config, &NoProgress).expect_err("bad expression must fail");

        assert_eq!(err.kind, ErrorKind::Expression(ExpressionErrorKind::Parse));
        assert!(!std::path::Path::new(&config.output).exists());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_input_is_a_source_io_error() {
        let dir = scratch_dir("missing-input");
        let mut config = aggregate_config(&dir, PARCELS);
        config.input = dir.join("absent.json").display().to_string();

        let err = aggregate(&config, &NoProgress).expect_err("missing input must fail");

        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.origin, ErrorOrigin::Source);
        fs::remove_dir_all(dir).ok();
    }
}
