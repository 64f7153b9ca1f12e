//! Module: layer::json
//! Responsibility: JSON layer documents on disk (WKT geometries, attributes
//! keyed by field name).
//! Boundary: conversion between JSON and runtime values happens only here.

use crate::{
    error::ExecutionError,
    feature::{Feature, Fields},
    geometry::{Crs, Geometry, GeometryType},
    layer::{FeatureSink, FeatureSource, MemoryLayer, OutputSchema, SinkState},
    value::Value,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::{
    fs,
    path::{Path, PathBuf},
};

///
/// LayerDocument
///

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct LayerDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    crs: Crs,
    #[serde(default)]
    geometry_type: GeometryType,
    #[serde(default)]
    fields: Fields,
    #[serde(default)]
    features: Vec<FeatureRecord>,
}

///
/// FeatureRecord
///

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct FeatureRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    attributes: Map<String, JsonValue>,
    #[serde(default)]
    geometry: Option<String>,
}

///
/// JsonLayer
///
/// Feature source loaded eagerly from a JSON layer document.
///

#[derive(Clone, Debug)]
pub struct JsonLayer {
    path: Option<PathBuf>,
    layer: MemoryLayer,
}

impl JsonLayer {
    /// Load one layer file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ExecutionError::source_io(format!("cannot read layer '{}': {err}", path.display()))
        })?;
        let mut layer = Self::parse(&text)?;
        if layer.layer.name().is_empty() {
            let stem = path
                .file_stem()
                .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
            layer.layer = layer.layer.renamed(stem);
        }
        layer.path = Some(path.to_path_buf());

        Ok(layer)
    }

    /// Parse one layer document from text.
    pub fn parse(text: &str) -> Result<Self, ExecutionError> {
        let document: LayerDocument = serde_json::from_str(text)
            .map_err(|err| ExecutionError::source_io(format!("invalid layer document: {err}")))?;

        let mut layer = MemoryLayer::new(document.name, document.fields, document.geometry_type)
            .with_crs(document.crs);
        for (position, record) in document.features.into_iter().enumerate() {
            let feature = decode_feature(layer.fields(), record, position)?;
            layer.push(feature);
        }

        Ok(Self { path: None, layer })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn into_memory(self) -> MemoryLayer {
        self.layer
    }
}

impl FeatureSource for JsonLayer {
    fn name(&self) -> &str {
        self.layer.name()
    }

    fn fields(&self) -> &Fields {
        self.layer.fields()
    }

    fn geometry_type(&self) -> GeometryType {
        self.layer.geometry_type()
    }

    fn crs(&self) -> &Crs {
        self.layer.crs()
    }

    fn features(&self) -> Box<dyn ExactSizeIterator<Item = Feature> + '_> {
        self.layer.features()
    }
}

///
/// JsonLayerWriter
///
/// Feature sink that buffers appends and writes the layer document only on
/// `finish`, so an aborted run leaves no file behind.
///

#[derive(Debug)]
pub struct JsonLayerWriter {
    path: PathBuf,
    name: String,
    schema: Option<OutputSchema>,
    records: Vec<FeatureRecord>,
    state: SinkState,
}

impl JsonLayerWriter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());

        Self {
            path,
            name,
            schema: None,
            records: Vec::new(),
            state: SinkState::Closed,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn state(&self) -> SinkState {
        self.state
    }
}

impl FeatureSink for JsonLayerWriter {
    fn open(&mut self, schema: OutputSchema) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Closed, "open")?;
        self.schema = Some(schema);
        self.state = SinkState::Open;

        Ok(())
    }

    fn append(&mut self, feature: Feature) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Open, "append to")?;
        let Some(schema) = self.schema.as_ref() else {
            return Err(ExecutionError::sink_invariant("open sink has no schema"));
        };
        let record = encode_feature(&schema.fields, feature)?;
        self.records.push(record);

        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Open, "finish")?;
        let Some(schema) = self.schema.take() else {
            return Err(ExecutionError::sink_invariant("open sink has no schema"));
        };

        let document = LayerDocument {
            name: self.name.clone(),
            crs: schema.crs,
            geometry_type: schema.geometry_type,
            fields: schema.fields,
            features: std::mem::take(&mut self.records),
        };
        let text = serde_json::to_string_pretty(&document)
            .map_err(|err| ExecutionError::sink_io(format!("cannot encode layer: {err}")))?;
        self.publish(&text)?;
        self.state = SinkState::Finished;

        Ok(())
    }
}

impl JsonLayerWriter {
    /// Sibling file the document is staged in before it replaces `path`.
    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());

        self.path.with_file_name(format!(".{file_name}.partial"))
    }

    // Stage then rename, so the output path only ever holds a complete layer.
    fn publish(&self, text: &str) -> Result<(), ExecutionError> {
        let staging = self.staging_path();
        let result = fs::write(&staging, text).and_then(|()| fs::rename(&staging, &self.path));
        if let Err(err) = result {
            fs::remove_file(&staging).ok();
            return Err(ExecutionError::sink_io(format!(
                "cannot write layer '{}': {err}",
                self.path.display()
            )));
        }

        Ok(())
    }
}

fn decode_feature(
    fields: &Fields,
    mut record: FeatureRecord,
    position: usize,
) -> Result<Feature, ExecutionError> {
    let id = record
        .id
        .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX));

    if let Some(name) = record
        .attributes
        .keys()
        .find(|name| fields.iter().all(|field| field.name != **name))
    {
        return Err(ExecutionError::source_io(format!(
            "feature {id}: attribute '{name}' is not a layer field"
        )));
    }

    let attributes = fields
        .iter()
        .map(|field| {
            let raw = record
                .attributes
                .remove(&field.name)
                .map_or(Value::Null, json_to_value);
            field.convert(raw)
        })
        .collect();

    let geometry = record
        .geometry
        .as_deref()
        .map(Geometry::from_wkt)
        .transpose()
        .map_err(|err| ExecutionError::source_io(format!("feature {id}: {err}")))?;

    Ok(Feature::new(id, attributes).with_geometry(geometry))
}

fn encode_feature(fields: &Fields, feature: Feature) -> Result<FeatureRecord, ExecutionError> {
    let mut attributes = Map::new();
    for (field, value) in fields.iter().zip(feature.attributes) {
        let json = serde_json::to_value(&value)
            .map_err(|err| ExecutionError::sink_io(format!("cannot encode '{}': {err}", field.name)))?;
        attributes.insert(field.name.clone(), json);
    }

    Ok(FeatureRecord {
        id: Some(feature.id),
        attributes,
        geometry: feature.geometry.map(|geometry| geometry.to_wkt()),
    })
}

/// Convert one JSON attribute into a runtime value.
#[must_use]
pub fn json_to_value(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        JsonValue::String(s) => Value::Text(s),
        JsonValue::Array(items) => Value::List(items.into_iter().map(json_to_value).collect()),
        JsonValue::Object(map) => Value::Text(JsonValue::Object(map).to_string()),
    }
}
