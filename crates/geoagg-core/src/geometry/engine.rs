//! Module: geometry::engine
//! Responsibility: gather geometries into collections and merge them.
//! Boundary: the aggregate pipeline only talks to `GeometryEngine`; the planar
//! implementation is one choice among many.

use crate::{error::ExecutionError, geometry::Geometry};
use geo::{BooleanOps, Intersects};

///
/// GeometryEngine
///

pub trait GeometryEngine {
    /// Gather geometries into one collection, preserving order.
    fn collect(&self, geometries: &[Geometry]) -> Geometry;

    /// Merge every part of `geometry` into one geometry.
    ///
    /// An empty result signals that nothing could be combined; callers decide
    /// whether that is fatal.
    fn union(&self, geometry: &Geometry) -> Result<Geometry, ExecutionError>;
}

///
/// PlanarEngine
///
/// Cartesian engine backed by `geo`. Polygons are dissolved with boolean
/// union, linestrings are kept distinct (not noded), points are deduplicated
/// and dropped when covered by the merged polygon area.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarEngine;

impl GeometryEngine for PlanarEngine {
    fn collect(&self, geometries: &[Geometry]) -> Geometry {
        Geometry::collect(geometries)
    }

    fn union(&self, geometry: &Geometry) -> Result<Geometry, ExecutionError> {
        let parts = geometry.parts();
        if parts.is_empty() {
            return Ok(Geometry::empty_collection());
        }

        let had_polygons = !parts.polygons.is_empty();
        let merged = dissolve_polygons(parts.polygons);
        let lines = distinct_lines(parts.lines);
        let points = uncovered_points(parts.points, &merged);

        let mut members = Vec::new();
        if !merged.0.is_empty() || (had_polygons && lines.is_empty() && points.is_empty()) {
            members.push(geo::Geometry::MultiPolygon(merged));
        }
        if !lines.is_empty() {
            members.push(geo::Geometry::MultiLineString(geo::MultiLineString::new(
                lines,
            )));
        }
        if !points.is_empty() {
            members.push(geo::Geometry::MultiPoint(geo::MultiPoint::new(points)));
        }

        let result = if members.len() == 1 {
            members.remove(0)
        } else {
            geo::Geometry::GeometryCollection(geo::GeometryCollection::new_from(members))
        };

        Ok(Geometry::new(result))
    }
}

// Fold every polygon into one multipolygon. Starting from the empty
// multipolygon normalizes single inputs and drops zero-area rings.
fn dissolve_polygons(polygons: Vec<geo::Polygon<f64>>) -> geo::MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(geo::MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&geo::MultiPolygon::new(vec![polygon]))
        })
}

fn distinct_lines(lines: Vec<geo::LineString<f64>>) -> Vec<geo::LineString<f64>> {
    let mut distinct: Vec<geo::LineString<f64>> = Vec::with_capacity(lines.len());
    for line in lines {
        if !distinct.contains(&line) {
            distinct.push(line);
        }
    }

    distinct
}

fn uncovered_points(
    points: Vec<geo::Point<f64>>,
    area: &geo::MultiPolygon<f64>,
) -> Vec<geo::Point<f64>> {
    let mut distinct: Vec<geo::Point<f64>> = Vec::with_capacity(points.len());
    for point in points {
        if distinct.contains(&point) || area.intersects(&point) {
            continue;
        }
        distinct.push(point);
    }

    distinct
}
