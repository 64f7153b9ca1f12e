//! Module: layer
//! Responsibility: feature sources and sinks (read/write sides of layers).
//! Does not own: feature processing; pipelines consume these traits.

mod json;
mod sink;
mod source;


pub use json::{JsonLayer, JsonLayerWriter, json_to_value};
pub use sink::{FeatureSink, MemorySink, OutputSchema, SinkState};
pub use source::{FeatureSource, MemoryLayer};
