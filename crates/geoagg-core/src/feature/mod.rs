//! Module: feature
//! Responsibility: feature records and layer schemas.
//! Does not own: where features come from or go to (see `layer`).

mod field;

use crate::{geometry::Geometry, value::Value};

// re-exports
pub use field::{FieldDef, FieldType, Fields};

static NULL_VALUE: Value = Value::Null;

///
/// Feature
///
/// One record: ordered attribute values aligned with the owning layer's
/// `Fields`, plus an optional geometry.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: i64,
    pub attributes: Vec<Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    #[must_use]
    pub const fn new(id: i64, attributes: Vec<Value>) -> Self {
        Self {
            id,
            attributes,
            geometry: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: impl Into<Option<Geometry>>) -> Self {
        self.geometry = geometry.into();
        self
    }

    /// Attribute at `index`; out-of-range slots read as NULL.
    #[must_use]
    pub fn attribute(&self, index: usize) -> &Value {
        self.attributes.get(index).unwrap_or(&NULL_VALUE)
    }

    /// True when the feature has a geometry with at least one coordinate.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.geometry.as_ref().is_some_and(|geometry| !geometry.is_empty())
    }
}
