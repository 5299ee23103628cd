//! Area, perimeter and bounds of the polygon a user draws to search an area.
//!
//! Both measures use a flat-earth first-order approximation, adequate for
//! city-sized polygons. Self-intersecting polygons are not detected and their
//! area is whatever the shoelace sum gives.

use geo::BoundingRect;
use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::config::GeometryConfig;
use crate::models::{BoundingBox, Coordinate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawGeometry {
    pub area_km2: f64,
    pub perimeter_km: f64,
}

/// Result of changing the drawn vertices, as seen by the bounds filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BoundsUpdate {
    Unchanged,
    /// The polygon is gone; filters should drop the drawn-area restriction.
    Cleared,
    Changed { bounds: BoundingBox },
}

fn shoelace_deg2(vertices: &[Coordinate]) -> f64 {
    let n = vertices.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            a.lng * b.lat - b.lng * a.lat
        })
        .sum();
    (twice_area / 2.0).abs()
}

// Shoelace sums at or below this (in square degrees, ~1e-4 m²) are collinear noise
const DEGENERATE_AREA_DEG2: f64 = 1e-14;

/// Area in km² and perimeter in km. Both are zero for fewer than three
/// vertices and for degenerate (collinear or repeated) rings.
pub fn compute_geometry(vertices: &[Coordinate], config: &GeometryConfig) -> DrawGeometry {
    if vertices.len() < 3 {
        return DrawGeometry::default();
    }
    let area_deg2 = shoelace_deg2(vertices);
    if area_deg2 <= DEGENERATE_AREA_DEG2 {
        return DrawGeometry::default();
    }
    let km = config.km_per_degree;

    let mean_lat = vertices.iter().map(|v| v.lat).sum::<f64>() / vertices.len() as f64;
    let scale = km * mean_lat.to_radians().cos();
    let area_km2 = area_deg2 * scale * scale;

    let n = vertices.len();
    let perimeter_km = (0..n)
        .map(|i| {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            let degrees = ((b.lng - a.lng).powi(2) + (b.lat - a.lat).powi(2)).sqrt();
            let edge_lat = ((a.lat + b.lat) / 2.0).to_radians();
            degrees * km * edge_lat.cos()
        })
        .sum();

    DrawGeometry {
        area_km2,
        perimeter_km,
    }
}

/// Smallest rectangle containing every vertex, `None` when there are none.
pub fn bounding_box(vertices: &[Coordinate]) -> Option<BoundingBox> {
    let ring: LineString<f64> = vertices.iter().map(|v| Coord::from(*v)).collect();
    ring.bounding_rect().map(BoundingBox::from)
}

/// Ray casting point-in-polygon test; the ring is implicitly closed.
pub fn polygon_contains(vertices: &[Coordinate], point: &Coordinate) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let n = vertices.len();
    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        let crosses = (a.lat > point.lat) != (b.lat > point.lat)
            && point.lng < (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng;
        if crosses {
            inside = !inside;
        }
    }
    inside
}

/// The user's search polygon with its derived measures kept in sync.
#[derive(Debug, Clone, Default)]
pub struct DrawnPolygon {
    vertices: Vec<Coordinate>,
    geometry: DrawGeometry,
    bounds: Option<BoundingBox>,
    config: GeometryConfig,
}

impl DrawnPolygon {
    pub fn new(config: GeometryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn geometry(&self) -> DrawGeometry {
        self.geometry
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        polygon_contains(&self.vertices, point)
    }

    pub fn set_vertices(&mut self, vertices: Vec<Coordinate>) -> BoundsUpdate {
        self.vertices = vertices;
        self.recompute()
    }

    pub fn push_vertex(&mut self, vertex: Coordinate) -> BoundsUpdate {
        self.vertices.push(vertex);
        self.recompute()
    }

    pub fn clear(&mut self) -> BoundsUpdate {
        self.vertices.clear();
        self.recompute()
    }

    fn recompute(&mut self) -> BoundsUpdate {
        self.geometry = compute_geometry(&self.vertices, &self.config);
        let previous = self.bounds;
        self.bounds = bounding_box(&self.vertices);
        match self.bounds {
            None => BoundsUpdate::Cleared,
            Some(bounds) if previous == Some(bounds) => BoundsUpdate::Unchanged,
            Some(bounds) => BoundsUpdate::Changed { bounds },
        }
    }
}
