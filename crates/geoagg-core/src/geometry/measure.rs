use crate::geometry::{Crs, Geometry};
use derive_more::Display;
use geo::{Area, EuclideanLength, GeodesicArea, GeodesicLength};
use serde::{Deserialize, Serialize};

/// Ellipsoid acronym that disables ellipsoidal measurement.
pub const NO_ELLIPSOID: &str = "NONE";

///
/// DistanceUnit
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    #[display("meters")]
    Meters,
    #[display("kilometers")]
    Kilometers,
    #[display("feet")]
    Feet,
    #[display("miles")]
    Miles,
}

impl DistanceUnit {
    /// Length of one unit in metres.
    #[must_use]
    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => 1_000.0,
            Self::Feet => 0.3048,
            Self::Miles => 1_609.344,
        }
    }

    #[must_use]
    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }
}

///
/// AreaUnit
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    #[display("square_meters")]
    SquareMeters,
    #[display("square_kilometers")]
    SquareKilometers,
    #[display("hectares")]
    Hectares,
    #[display("acres")]
    Acres,
    #[display("square_feet")]
    SquareFeet,
}

impl AreaUnit {
    /// Area of one unit in square metres.
    #[must_use]
    pub const fn square_meters_per_unit(self) -> f64 {
        match self {
            Self::SquareMeters => 1.0,
            Self::SquareKilometers => 1_000_000.0,
            Self::Hectares => 10_000.0,
            Self::Acres => 4_046.856_422_4,
            Self::SquareFeet => 0.092_903_04,
        }
    }

    #[must_use]
    pub fn from_square_meters(self, square_meters: f64) -> f64 {
        square_meters / self.square_meters_per_unit()
    }
}

///
/// DistanceArea
///
/// Length/area calculator bound to expressions. Measures are geodesic on the
/// WGS 84 ellipsoid when ellipsoidal mode is on, an ellipsoid is configured,
/// and the source CRS is geographic; otherwise they are planar in CRS units,
/// which are taken to be metres.
///

#[derive(Clone, Debug, PartialEq)]
pub struct DistanceArea {
    source_crs: Crs,
    ellipsoidal: bool,
    ellipsoid: String,
}

impl DistanceArea {
    #[must_use]
    pub fn new(source_crs: Crs) -> Self {
        Self {
            source_crs,
            ellipsoidal: false,
            ellipsoid: NO_ELLIPSOID.to_string(),
        }
    }

    #[must_use]
    pub const fn with_ellipsoidal_mode(mut self, enabled: bool) -> Self {
        self.ellipsoidal = enabled;
        self
    }

    #[must_use]
    pub fn with_ellipsoid(mut self, ellipsoid: impl Into<String>) -> Self {
        self.ellipsoid = ellipsoid.into();
        self
    }

    #[must_use]
    pub const fn source_crs(&self) -> &Crs {
        &self.source_crs
    }

    #[must_use]
    pub fn ellipsoid(&self) -> &str {
        &self.ellipsoid
    }

    /// True when measurements run on the ellipsoid.
    #[must_use]
    pub fn will_use_ellipsoid(&self) -> bool {
        self.ellipsoidal
            && self.source_crs.geographic
            && !self.ellipsoid.eq_ignore_ascii_case(NO_ELLIPSOID)
    }

    /// Area of the polygonal parts, in square metres.
    #[must_use]
    pub fn measure_area(&self, geometry: &Geometry) -> f64 {
        let parts = geometry.parts();
        if self.will_use_ellipsoid() {
            parts
                .polygons
                .iter()
                .map(|polygon| polygon.geodesic_area_unsigned())
                .sum()
        } else {
            parts.polygons.iter().map(|polygon| polygon.unsigned_area()).sum()
        }
    }

    /// Length of the linear parts, in metres. Polygons measure zero.
    #[must_use]
    pub fn measure_length(&self, geometry: &Geometry) -> f64 {
        self.sum_lengths(&geometry.parts().lines)
    }

    /// Ring length of the polygonal parts, in metres.
    #[must_use]
    pub fn measure_perimeter(&self, geometry: &Geometry) -> f64 {
        let rings = geometry
            .parts()
            .polygons
            .iter()
            .flat_map(|polygon| {
                std::iter::once(polygon.exterior().clone()).chain(polygon.interiors().iter().cloned())
            })
            .collect::<Vec<_>>();

        self.sum_lengths(&rings)
    }

    fn sum_lengths(&self, lines: &[geo::LineString<f64>]) -> f64 {
        if self.will_use_ellipsoid() {
            lines.iter().map(|line| line.geodesic_length()).sum()
        } else {
            lines.iter().map(|line| line.euclidean_length()).sum()
        }
    }
}
