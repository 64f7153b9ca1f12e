//! Core runtime for geoagg: values, geometry, the expression language,
//! feature layers, and the aggregate and refactor-fields pipelines.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod error;
pub mod expr;
pub mod feature;
pub mod geometry;
pub mod layer;
pub mod obs;
pub mod pipeline;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        config::{AggregateFieldSpec, FieldMapping, ProjectSettings},
        expr::AggregateFunction,
        feature::{Feature, FieldDef, FieldType, Fields},
        geometry::{Geometry, GeometryType},
        value::Value,
    };
}
