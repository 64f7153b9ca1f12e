//! Module: geometry
//! Responsibility: owned geometry values, WKT transport, geometry-type
//! classification, and the engine/measurement seams used by expressions.
//! Does not own: expression semantics or pipeline policy.

mod crs;
mod engine;
mod measure;


use derive_more::Display;
use geo::HasDimensions;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;
use wkt::ToWkt;

// re-exports
pub use crs::Crs;
pub use engine::{GeometryEngine, PlanarEngine};
pub use measure::{AreaUnit, DistanceArea, DistanceUnit, NO_ELLIPSOID};

///
/// GeometryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum GeometryError {
    #[error("invalid WKT '{text}': {reason}")]
    InvalidWkt { text: String, reason: String },
}

///
/// GeometryType
///
/// Layer-level geometry classification. Output layers of the aggregate
/// pipeline use the multi form of the input type.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryType {
    #[default]
    #[display("NoGeometry")]
    NoGeometry,
    #[display("Point")]
    Point,
    #[display("LineString")]
    LineString,
    #[display("Polygon")]
    Polygon,
    #[display("MultiPoint")]
    MultiPoint,
    #[display("MultiLineString")]
    MultiLineString,
    #[display("MultiPolygon")]
    MultiPolygon,
    #[display("GeometryCollection")]
    GeometryCollection,
}

impl GeometryType {
    /// Return the multi-part counterpart of this type.
    #[must_use]
    pub const fn multi_type(self) -> Self {
        match self {
            Self::Point | Self::MultiPoint => Self::MultiPoint,
            Self::LineString | Self::MultiLineString => Self::MultiLineString,
            Self::Polygon | Self::MultiPolygon => Self::MultiPolygon,
            Self::GeometryCollection => Self::GeometryCollection,
            Self::NoGeometry => Self::NoGeometry,
        }
    }

    #[must_use]
    pub const fn has_geometry(self) -> bool {
        !matches!(self, Self::NoGeometry)
    }
}

///
/// Geometry
///
/// Owned planar geometry with `f64` coordinates.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Geometry(geo::Geometry<f64>);

impl Geometry {
    #[must_use]
    pub const fn new(inner: geo::Geometry<f64>) -> Self {
        Self(inner)
    }

    /// Parse one WKT string.
    pub fn from_wkt(text: &str) -> Result<Self, GeometryError> {
        let invalid = |reason: String| GeometryError::InvalidWkt {
            text: text.to_string(),
            reason,
        };
        let parsed = wkt::Wkt::<f64>::from_str(text.trim()).map_err(|err| invalid(err.to_string()))?;
        let inner = geo::Geometry::<f64>::try_from(parsed).map_err(|err| invalid(err.to_string()))?;

        Ok(Self(inner))
    }

    /// Build an empty geometry collection.
    #[must_use]
    pub fn empty_collection() -> Self {
        Self(geo::Geometry::GeometryCollection(geo::GeometryCollection::new_from(
            Vec::new(),
        )))
    }

    /// Gather geometries into one collection, preserving order.
    #[must_use]
    pub fn collect<'a>(geometries: impl IntoIterator<Item = &'a Self>) -> Self {
        let members = geometries
            .into_iter()
            .map(|geometry| geometry.0.clone())
            .collect::<Vec<_>>();

        Self(geo::Geometry::GeometryCollection(
            geo::GeometryCollection::new_from(members),
        ))
    }

    #[must_use]
    pub fn to_wkt(&self) -> String {
        self.0.wkt_string()
    }

    #[must_use]
    pub const fn inner(&self) -> &geo::Geometry<f64> {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> geo::Geometry<f64> {
        self.0
    }

    /// True when the geometry carries no coordinates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn geometry_type(&self) -> GeometryType {
        match &self.0 {
            geo::Geometry::Point(_) => GeometryType::Point,
            geo::Geometry::Line(_) | geo::Geometry::LineString(_) => GeometryType::LineString,
            geo::Geometry::Polygon(_) | geo::Geometry::Rect(_) | geo::Geometry::Triangle(_) => {
                GeometryType::Polygon
            }
            geo::Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            geo::Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            geo::Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            geo::Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Number of top-level parts (1 for single-part geometries).
    #[must_use]
    pub fn num_geometries(&self) -> usize {
        match &self.0 {
            geo::Geometry::MultiPoint(mp) => mp.0.len(),
            geo::Geometry::MultiLineString(ml) => ml.0.len(),
            geo::Geometry::MultiPolygon(mp) => mp.0.len(),
            geo::Geometry::GeometryCollection(gc) => gc.0.len(),
            _ => usize::from(!self.is_empty()),
        }
    }

    /// Coordinates of a single point, if this is one.
    #[must_use]
    pub const fn point_xy(&self) -> Option<(f64, f64)> {
        match &self.0 {
            geo::Geometry::Point(point) => Some((point.0.x, point.0.y)),
            _ => None,
        }
    }

    /// Promote single-part geometries to their multi form.
    #[must_use]
    pub fn into_multi(self) -> Self {
        let inner = match self.0 {
            geo::Geometry::Point(point) => geo::Geometry::MultiPoint(geo::MultiPoint::new(vec![point])),
            geo::Geometry::Line(line) => geo::Geometry::MultiLineString(geo::MultiLineString::new(
                vec![geo::LineString::new(vec![line.start, line.end])],
            )),
            geo::Geometry::LineString(line) => {
                geo::Geometry::MultiLineString(geo::MultiLineString::new(vec![line]))
            }
            geo::Geometry::Polygon(polygon) => {
                geo::Geometry::MultiPolygon(geo::MultiPolygon::new(vec![polygon]))
            }
            geo::Geometry::Rect(rect) => {
                geo::Geometry::MultiPolygon(geo::MultiPolygon::new(vec![rect.to_polygon()]))
            }
            geo::Geometry::Triangle(triangle) => {
                geo::Geometry::MultiPolygon(geo::MultiPolygon::new(vec![triangle.to_polygon()]))
            }
            other => other,
        };

        Self(inner)
    }

    /// Split into point, line, and polygon parts, skipping empty parts.
    #[must_use]
    pub fn parts(&self) -> GeometryParts {
        let mut parts = GeometryParts::default();
        parts.push(&self.0);

        parts
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

impl From<geo::Geometry<f64>> for Geometry {
    fn from(inner: geo::Geometry<f64>) -> Self {
        Self(inner)
    }
}

///
/// GeometryParts
///
/// Flattened, non-empty components of one geometry, grouped by dimension.
///

#[derive(Clone, Debug, Default)]
pub struct GeometryParts {
    pub points: Vec<geo::Point<f64>>,
    pub lines: Vec<geo::LineString<f64>>,
    pub polygons: Vec<geo::Polygon<f64>>,
}

impl GeometryParts {
    fn push(&mut self, geometry: &geo::Geometry<f64>) {
        if geometry.is_empty() {
            return;
        }

        match geometry {
            geo::Geometry::Point(point) => self.points.push(*point),
            geo::Geometry::Line(line) => {
                self.lines.push(geo::LineString::new(vec![line.start, line.end]));
            }
            geo::Geometry::LineString(line) => self.lines.push(line.clone()),
            geo::Geometry::Polygon(polygon) => self.polygons.push(polygon.clone()),
            geo::Geometry::Rect(rect) => self.polygons.push(rect.to_polygon()),
            geo::Geometry::Triangle(triangle) => self.polygons.push(triangle.to_polygon()),
            geo::Geometry::MultiPoint(mp) => self.points.extend(mp.0.iter().copied()),
            geo::Geometry::MultiLineString(ml) => {
                self.lines
                    .extend(ml.0.iter().filter(|line| !line.0.is_empty()).cloned());
            }
            geo::Geometry::MultiPolygon(mp) => {
                self.polygons
                    .extend(mp.0.iter().filter(|polygon| !polygon.is_empty()).cloned());
            }
            geo::Geometry::GeometryCollection(gc) => {
                for member in &gc.0 {
                    self.push(member);
                }
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.polygons.is_empty()
    }
}
