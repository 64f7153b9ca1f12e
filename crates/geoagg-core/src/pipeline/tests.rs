use crate::{
    config::{AggregateFieldSpec, FieldMapping},
    error::{ErrorClass, ExecutionError},
    expr::AggregateFunction,
    feature::{Feature, FieldDef, FieldType, Fields},
    geometry::{Geometry, GeometryEngine, GeometryType, PlanarEngine},
    layer::{MemoryLayer, MemorySink, SinkState},
    obs::{
        MetricsEvent, MetricsSink, PipelineKind, ProgressLog,
        sink::with_metrics_sink,
    },
    pipeline::{AggregatePipeline, RefactorPipeline, aggregate_expression},
    value::Value,
};
use geo::Area;
use proptest::prelude::*;
use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
};

fn fields() -> Fields {
    Fields::new(vec![
        FieldDef::new("name", FieldType::String),
        FieldDef::new("kind", FieldType::String),
        FieldDef::new("pop", FieldType::Integer),
    ])
}

fn square(x: i32, y: i32) -> Geometry {
    let (x1, y1) = (x + 1, y + 1);
    Geometry::from_wkt(&format!(
        "POLYGON(({x} {y},{x1} {y},{x1} {y1},{x} {y1},{x} {y}))"
    ))
    .expect("square should parse")
}

fn feature(id: i64, name: &str, kind: &str, pop: Option<i64>) -> Feature {
    Feature::new(id, vec![Value::from(name), Value::from(kind), Value::from(pop)])
}

// kind x: squares (0,0) and (1,0) plus one feature without geometry;
// kind y: one square far away.
fn parcels() -> MemoryLayer {
    MemoryLayer::new("parcels", fields(), GeometryType::Polygon).with_features([
        feature(1, "a", "x", Some(10)).with_geometry(square(0, 0)),
        feature(2, "b", "y", Some(20)).with_geometry(square(5, 5)),
        feature(3, "c", "x", None).with_geometry(square(1, 0)),
        feature(4, "d", "x", Some(5)),
    ])
}

fn summary_specs() -> Vec<AggregateFieldSpec> {
    vec![
        AggregateFieldSpec::new("kind", FieldType::String, AggregateFunction::FirstValue, "kind"),
        AggregateFieldSpec::new("n", FieldType::Integer, AggregateFunction::Count, "name"),
        AggregateFieldSpec::new("total", FieldType::Integer, AggregateFunction::Sum, "pop"),
    ]
}

fn run_aggregate<E: GeometryEngine>(
    pipeline: &AggregatePipeline<E>,
    layer: &MemoryLayer,
) -> Result<MemorySink, ExecutionError> {
    let mut sink = MemorySink::new();
    pipeline.run(layer, &mut sink, &ProgressLog::new())?;

    Ok(sink)
}

///
/// EmptyUnionEngine
///
/// Geometry engine whose union never produces anything.
///

struct EmptyUnionEngine;

impl GeometryEngine for EmptyUnionEngine {
    fn collect(&self, geometries: &[Geometry]) -> Geometry {
        Geometry::collect(geometries)
    }

    fn union(&self, _: &Geometry) -> Result<Geometry, ExecutionError> {
        Ok(Geometry::empty_collection())
    }
}

///
/// CountingEngine
///
/// Planar engine that counts how often it gathers geometries.
///

#[derive(Default)]
struct CountingEngine {
    collects: Rc<Cell<usize>>,
}

impl GeometryEngine for CountingEngine {
    fn collect(&self, geometries: &[Geometry]) -> Geometry {
        self.collects.set(self.collects.get() + 1);
        PlanarEngine.collect(geometries)
    }

    fn union(&self, geometry: &Geometry) -> Result<Geometry, ExecutionError> {
        PlanarEngine.union(geometry)
    }
}

///
/// RecordingSink
///

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

///
/// EXPRESSION BUILDING
///

#[test]
fn aggregate_expressions_follow_the_field_kind() {
    let first = AggregateFieldSpec::new("k", FieldType::String, AggregateFunction::FirstValue, "kind");
    let sum = AggregateFieldSpec::new("t", FieldType::Integer, AggregateFunction::Sum, "pop * 2");
    let concat = AggregateFieldSpec::new("c", FieldType::String, AggregateFunction::Concatenate, "name")
        .with_delimiter("it's");
    let unique =
        AggregateFieldSpec::new("u", FieldType::String, AggregateFunction::ConcatenateUnique, "name");

    assert_eq!(aggregate_expression(&first, "\"kind\""), "kind");
    assert_eq!(aggregate_expression(&sum, "\"kind\""), "sum(pop * 2, \"kind\")");
    assert_eq!(
        aggregate_expression(&concat, "\"kind\""),
        "concatenate(name, \"kind\", TRUE, 'it''s')"
    );
    assert_eq!(
        aggregate_expression(&unique, "NULL"),
        "concatenate_unique(name, NULL, TRUE, ',')"
    );
}

///
/// AGGREGATE
///

#[test]
fn one_output_per_key_in_first_occurrence_order() {
    let sink = run_aggregate(&AggregatePipeline::new("kind", summary_specs()), &parcels())
        .expect("aggregate should run");

    assert!(sink.is_finished());
    let out = sink.features();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].id, 0);
    assert_eq!(
        out[0].attributes,
        vec![Value::from("x"), Value::Int(3), Value::Int(15)]
    );
    assert_eq!(out[1].id, 1);
    assert_eq!(
        out[1].attributes,
        vec![Value::from("y"), Value::Int(1), Value::Int(20)]
    );
}

#[test]
fn output_schema_uses_field_specs_and_multi_geometry_type() {
    let sink = run_aggregate(&AggregatePipeline::new("kind", summary_specs()), &parcels())
        .expect("aggregate should run");
    let schema = sink.schema().expect("sink should be opened");

    let names: Vec<&str> = schema.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, ["kind", "n", "total"]);
    assert_eq!(schema.geometry_type, GeometryType::MultiPolygon);
}

#[test]
fn member_geometries_are_unioned_per_group() {
    let sink = run_aggregate(&AggregatePipeline::new("kind", summary_specs()), &parcels())
        .expect("aggregate should run");

    let merged = sink.features()[0]
        .geometry
        .as_ref()
        .expect("group x should have a geometry");
    assert_eq!(merged.geometry_type(), GeometryType::MultiPolygon);
    assert!((merged.inner().unsigned_area() - 2.0).abs() < 1e-9);

    let single = sink.features()[1]
        .geometry
        .as_ref()
        .expect("group y should have a geometry");
    assert!((single.inner().unsigned_area() - 1.0).abs() < 1e-9);
}

#[test]
fn null_group_by_yields_one_group() {
    let specs = vec![
        AggregateFieldSpec::new("names", FieldType::String, AggregateFunction::Concatenate, "name")
            .with_delimiter(";"),
    ];
    let sink = run_aggregate(&AggregatePipeline::new("NULL", specs), &parcels())
        .expect("aggregate should run");

    assert_eq!(sink.features().len(), 1);
    assert_eq!(sink.features()[0].attributes, vec![Value::from("a;b;c;d")]);
}

#[test]
fn concatenate_uses_the_configured_delimiter() {
    let layer = MemoryLayer::new("pair", fields(), GeometryType::NoGeometry).with_features([
        feature(1, "a", "x", None),
        feature(2, "b", "x", None),
    ]);
    let specs = vec![
        AggregateFieldSpec::new("names", FieldType::String, AggregateFunction::Concatenate, "name")
            .with_delimiter(";"),
    ];

    let sink = run_aggregate(&AggregatePipeline::new("kind", specs), &layer)
        .expect("aggregate should run");

    assert_eq!(sink.features()[0].attributes, vec![Value::from("a;b")]);
}

#[test]
fn first_value_reads_the_first_member() {
    let specs = vec![
        AggregateFieldSpec::new("first", FieldType::String, AggregateFunction::FirstValue, "name"),
        AggregateFieldSpec::new("last", FieldType::String, AggregateFunction::LastValue, "name"),
    ];
    let sink = run_aggregate(&AggregatePipeline::new("kind", specs), &parcels())
        .expect("aggregate should run");

    assert_eq!(
        sink.features()[0].attributes,
        vec![Value::from("a"), Value::from("d")]
    );
    assert_eq!(
        sink.features()[1].attributes,
        vec![Value::from("b"), Value::from("b")]
    );
}

#[test]
fn groups_without_geometry_produce_no_output_geometry() {
    let layer = MemoryLayer::new("bare", fields(), GeometryType::Polygon).with_features([
        feature(1, "a", "x", Some(1)),
        feature(2, "b", "x", Some(2)).with_geometry(Geometry::empty_collection()),
    ]);

    let sink = run_aggregate(&AggregatePipeline::new("kind", summary_specs()), &layer)
        .expect("aggregate should run");

    assert_eq!(sink.features().len(), 1);
    assert!(sink.features()[0].geometry.is_none());
}

#[test]
fn empty_union_of_real_geometry_fails_without_finishing() {
    let pipeline = AggregatePipeline::new("kind", summary_specs()).with_engine(EmptyUnionEngine);
    let mut sink = MemorySink::new();

    let err = pipeline
        .run(&parcels(), &mut sink, &ProgressLog::new())
        .expect_err("empty union must fail");

    assert_eq!(err.class, ErrorClass::Geometry);
    assert_eq!(err.message, "Impossible to combine geometries for kind = 'x'");
    assert_eq!(sink.state(), SinkState::Open);
    assert!(sink.features().is_empty());
}

#[test]
fn degenerate_polygons_fail_to_combine() {
    let sliver = Geometry::from_wkt("POLYGON((0 0,1 1,2 2,0 0))").expect("sliver should parse");
    let layer = MemoryLayer::new("slivers", fields(), GeometryType::Polygon)
        .with_features([feature(1, "a", "x", Some(1)).with_geometry(sliver)]);
    let mut sink = MemorySink::new();

    let err = AggregatePipeline::new("kind", summary_specs())
        .run(&layer, &mut sink, &ProgressLog::new())
        .expect_err("zero-area union must fail");

    assert_eq!(err.class, ErrorClass::Geometry);
    assert_eq!(err.message, "Impossible to combine geometries for kind = 'x'");
    assert!(!sink.is_finished());
}

#[test]
fn member_geometries_are_gathered_by_the_configured_engine() {
    let engine = CountingEngine::default();
    let collects = Rc::clone(&engine.collects);
    let pipeline = AggregatePipeline::new("kind", summary_specs()).with_engine(engine);

    let sink = run_aggregate(&pipeline, &parcels()).expect("aggregate should run");

    assert_eq!(collects.get(), 2);
    assert_eq!(sink.features().len(), 2);
    assert!(sink.features().iter().all(|feature| feature.geometry.is_some()));
}

#[test]
fn malformed_field_expression_fails_before_the_sink_opens() {
    let specs = vec![
        AggregateFieldSpec::new("kind", FieldType::String, AggregateFunction::FirstValue, "kind"),
        AggregateFieldSpec::new("bad", FieldType::Integer, AggregateFunction::Sum, "pop +"),
    ];
    let progress = ProgressLog::new();
    let mut sink = MemorySink::new();

    let err = AggregatePipeline::new("kind", specs)
        .run(&parcels(), &mut sink, &progress)
        .expect_err("malformed expression must fail");

    assert!(err.is_parse_error());
    assert!(
        err.message.starts_with("Parser error in expression \"sum(pop +, kind)\""),
        "{}",
        err.message
    );
    assert_eq!(sink.state(), SinkState::Closed);
    assert!(progress.updates().is_empty());
}

#[test]
fn unknown_group_by_column_is_a_parser_error() {
    let mut sink = MemorySink::new();

    let err = AggregatePipeline::new("missing", summary_specs())
        .run(&parcels(), &mut sink, &ProgressLog::new())
        .expect_err("unknown column must fail");

    assert!(err.is_parse_error());
    assert!(err.message.contains("column 'missing' not found"), "{}", err.message);
    assert_eq!(sink.state(), SinkState::Closed);
}

#[test]
fn group_by_evaluation_error_aborts_before_output() {
    let mut sink = MemorySink::new();

    let err = AggregatePipeline::new("pop / 0", summary_specs())
        .run(&parcels(), &mut sink, &ProgressLog::new())
        .expect_err("division by zero must fail");

    assert_eq!(err.class, ErrorClass::Evaluation);
    assert_eq!(
        err.message,
        "Evaluation error in expression \"pop / 0\": division by zero"
    );
    assert_eq!(sink.state(), SinkState::Closed);
}

#[test]
fn progress_splits_grouping_and_aggregation_halves() {
    let progress = ProgressLog::new();
    let mut sink = MemorySink::new();

    AggregatePipeline::new("kind", summary_specs())
        .run(&parcels(), &mut sink, &progress)
        .expect("aggregate should run");

    assert_eq!(progress.updates(), vec![12, 25, 37, 50, 50, 75]);
}

#[test]
fn run_reports_counts_through_the_metrics_sink() {
    let recorder = RecordingSink::default();
    let mut sink = MemorySink::new();

    let summary = with_metrics_sink(&recorder, || {
        AggregatePipeline::new("kind", summary_specs()).run(
            &parcels(),
            &mut sink,
            &ProgressLog::new(),
        )
    })
    .expect("aggregate should run");

    assert_eq!(summary.features_read, 4);
    assert_eq!(summary.groups, Some(2));
    assert_eq!(summary.features_written, 2);
    assert_eq!(
        *recorder.events.borrow(),
        vec![
            MetricsEvent::RunStart {
                kind: PipelineKind::Aggregate
            },
            MetricsEvent::FeaturesRead {
                kind: PipelineKind::Aggregate,
                count: 4
            },
            MetricsEvent::GroupsCreated { count: 2 },
            MetricsEvent::FeaturesWritten {
                kind: PipelineKind::Aggregate,
                count: 2
            },
        ]
    );
}

#[test]
fn failed_run_is_recorded_as_failed() {
    let recorder = RecordingSink::default();
    let mut sink = MemorySink::new();

    let result = with_metrics_sink(&recorder, || {
        AggregatePipeline::new("kind", summary_specs())
            .with_engine(EmptyUnionEngine)
            .run(&parcels(), &mut sink, &ProgressLog::new())
    });

    assert!(result.is_err());
    assert_eq!(
        recorder.events.borrow().last(),
        Some(&MetricsEvent::RunFailed {
            kind: PipelineKind::Aggregate
        })
    );
}

///
/// REFACTOR
///

#[test]
fn refactor_maps_fields_and_copies_geometry() {
    let mappings = vec![
        FieldMapping::new("row", FieldType::Integer, "@row_number"),
        FieldMapping::new("label", FieldType::String, "upper(name) || '-' || kind"),
        FieldMapping::new("pop2", FieldType::Integer, "pop * 2"),
    ];
    let layer = parcels();
    let progress = ProgressLog::new();
    let mut sink = MemorySink::new();

    let summary = RefactorPipeline::new(mappings)
        .run(&layer, &mut sink, &progress)
        .expect("refactor should run");

    assert_eq!(summary.groups, None);
    assert_eq!(summary.features_written, 4);
    let schema = sink.schema().expect("sink should be opened");
    assert_eq!(schema.geometry_type, GeometryType::Polygon);

    let out = sink.features();
    assert_eq!(
        out[0].attributes,
        vec![Value::Int(1), Value::from("A-x"), Value::Int(20)]
    );
    assert_eq!(
        out[2].attributes,
        vec![Value::Int(3), Value::from("C-x"), Value::Null]
    );
    assert_eq!(out[1].id, 2);
    assert_eq!(out[1].geometry, Some(square(5, 5)));
    assert!(out[3].geometry.is_none());
    assert_eq!(progress.updates(), vec![0, 25, 50, 75]);
}

#[test]
fn refactor_rejects_bad_mapping_before_opening() {
    let mappings = vec![FieldMapping::new("x", FieldType::String, "no_such_fn(name)")];
    let mut sink = MemorySink::new();

    let err = RefactorPipeline::new(mappings)
        .run(&parcels(), &mut sink, &ProgressLog::new())
        .expect_err("unknown function must fail");

    assert!(err.is_parse_error());
    assert_eq!(sink.state(), SinkState::Closed);
}

///
/// PROPERTIES
///

fn keyed_layer(keys: &[i64]) -> MemoryLayer {
    let fields = Fields::new(vec![FieldDef::new("k", FieldType::Integer)]);
    MemoryLayer::new("keys", fields, GeometryType::NoGeometry).with_features(
        keys.iter()
            .zip(1..)
            .map(|(&key, id)| Feature::new(id, vec![Value::Int(key)])),
    )
}

proptest! {
    #[test]
    fn grouping_partitions_input_in_first_occurrence_order(
        keys in prop::collection::vec(0i64..5, 0..30)
    ) {
        let specs = vec![
            AggregateFieldSpec::new("k", FieldType::Integer, AggregateFunction::FirstValue, "k"),
            AggregateFieldSpec::new("n", FieldType::Integer, AggregateFunction::Count, "k"),
        ];
        let sink = run_aggregate(&AggregatePipeline::new("k", specs), &keyed_layer(&keys))
            .expect("aggregate should run");

        let mut seen = BTreeSet::new();
        let expected: Vec<i64> = keys.iter().copied().filter(|key| seen.insert(*key)).collect();
        let emitted: Vec<Value> = sink.features().iter().map(|f| f.attributes[0].clone()).collect();
        prop_assert_eq!(emitted, expected.iter().copied().map(Value::Int).collect::<Vec<_>>());

        let mut covered = 0i64;
        for (out, key) in sink.features().iter().zip(&expected) {
            let members = keys.iter().filter(|k| *k == key).count();
            prop_assert_eq!(&out.attributes[1], &Value::Int(i64::try_from(members).expect("small count")));
            covered += i64::try_from(members).expect("small count");
        }
        prop_assert_eq!(covered, i64::try_from(keys.len()).expect("small count"));
    }
}
