use crate::{
    feature::{Feature, Fields},
    geometry::{Crs, GeometryType},
};

///
/// FeatureSource
///
/// Read side of a vector layer. `features` yields an exact-size stream so
/// pipelines can size their progress steps before iterating.
///

pub trait FeatureSource {
    fn name(&self) -> &str;

    fn fields(&self) -> &Fields;

    fn geometry_type(&self) -> GeometryType;

    fn crs(&self) -> &Crs;

    fn features(&self) -> Box<dyn ExactSizeIterator<Item = Feature> + '_>;
}

///
/// MemoryLayer
///
/// In-memory feature source.
///

#[derive(Clone, Debug)]
pub struct MemoryLayer {
    name: String,
    fields: Fields,
    geometry_type: GeometryType,
    crs: Crs,
    features: Vec<Feature>,
}

impl MemoryLayer {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Fields, geometry_type: GeometryType) -> Self {
        Self {
            name: name.into(),
            fields,
            geometry_type,
            crs: Crs::default(),
            features: Vec::new(),
        }
    }

    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSource for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn features(&self) -> Box<dyn ExactSizeIterator<Item = Feature> + '_> {
        Box::new(self.features.iter().cloned())
    }
}
