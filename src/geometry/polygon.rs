//! Spherical polygons and polylines used for plate boundaries.

use glam::DVec3;
use thiserror::Error;

use super::sphere::{lat_lon_to_unit, lies_within_arc, point_to_arc_distance};

/// Errors that can occur when building boundary geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Too few vertices: need at least {expected}, got {found}")]
    TooFewVertices { expected: usize, found: usize },
    #[error("Polygon interior is ambiguous; supply an explicit interior point")]
    AmbiguousInterior,
    #[error("Vertex {0} is not a finite, non-zero vector")]
    InvalidVertex(usize),
}

/// A closed ring of great circle arcs on the unit sphere.
///
/// A ring on the sphere splits it into two regions, so the polygon also
/// stores a reference point known to be inside. By default this is the
/// normalized vertex centroid, which is correct for polygons smaller than a
/// hemisphere.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    vertices: Vec<DVec3>,
    interior: DVec3,
}

impl BoundaryPolygon {
    /// Creates a polygon whose interior contains the vertex centroid.
    ///
    /// A repeated closing vertex is dropped.
    pub fn new(vertices: Vec<DVec3>) -> Result<Self, GeometryError> {
        let vertices = normalize_ring(vertices)?;
        let centroid: DVec3 = vertices.iter().copied().sum();
        if centroid.length() < 1e-9 {
            return Err(GeometryError::AmbiguousInterior);
        }
        Ok(Self {
            vertices,
            interior: centroid.normalize(),
        })
    }

    /// Creates a polygon whose interior is the region containing `interior`.
    ///
    /// Use this for polygons covering a hemisphere or more.
    pub fn with_interior(vertices: Vec<DVec3>, interior: DVec3) -> Result<Self, GeometryError> {
        let vertices = normalize_ring(vertices)?;
        if !interior.is_finite() || interior.length() < 1e-12 {
            return Err(GeometryError::AmbiguousInterior);
        }
        Ok(Self {
            vertices,
            interior: interior.normalize(),
        })
    }

    /// Creates a polygon from `(lat, lon)` pairs in degrees.
    pub fn from_lat_lon(coords: &[(f64, f64)]) -> Result<Self, GeometryError> {
        Self::new(coords.iter().map(|&(lat, lon)| lat_lon_to_unit(lat, lon)).collect())
    }

    /// Returns the ring vertices (without a repeated closing vertex).
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Returns the interior reference point.
    pub fn interior_point(&self) -> DVec3 {
        self.interior
    }

    /// Iterates over the ring edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Tests whether a point lies inside the polygon.
    ///
    /// Counts crossings between the boundary and the arc from the point to
    /// the interior reference; an even count means the point is inside.
    pub fn contains(&self, point: DVec3) -> bool {
        let p = point.normalize();
        let r = self.interior;

        let crossings = if p.cross(r).length_squared() < 1e-24 && p.dot(r) < 0.0 {
            // Antipodal to the reference: route through a perpendicular waypoint
            let waypoint = p.any_orthonormal_vector();
            self.count_crossings(p, waypoint) + self.count_crossings(waypoint, r)
        } else {
            self.count_crossings(p, r)
        };

        crossings % 2 == 0
    }

    /// Computes the distance (radians) from a point to the polygon outline.
    pub fn distance_to_boundary(&self, point: DVec3) -> f64 {
        self.edges()
            .map(|(a, b)| point_to_arc_distance(point, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Returns the distance to the outline if it is within `max_distance`.
    pub fn distance_within(&self, point: DVec3, max_distance: f64) -> Option<f64> {
        let distance = self.distance_to_boundary(point.normalize());
        (distance <= max_distance).then_some(distance)
    }

    /// Number of edges crossed by the minor arc `from -> to`.
    ///
    /// Vertices lying exactly on the arc's great circle are counted on the
    /// negative side, so an arc through a vertex is counted once.
    fn count_crossings(&self, from: DVec3, to: DVec3) -> usize {
        let normal = from.cross(to);
        if normal.length_squared() < 1e-24 {
            return 0;
        }

        self.edges()
            .filter(|&(a, b)| {
                let da = normal.dot(a);
                let db = normal.dot(b);
                if (da > 0.0) == (db > 0.0) {
                    return false;
                }
                // Point where the edge meets the plane of the test arc
                let mut x = a * db - b * da;
                if da > 0.0 {
                    x = -x;
                }
                lies_within_arc(x, from, to, normal)
            })
            .count()
    }
}

/// An open chain of great circle arcs, e.g. one sub-segment of a plate boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    vertices: Vec<DVec3>,
}

impl Polyline {
    /// Creates a polyline from at least two vertices.
    pub fn new(vertices: Vec<DVec3>) -> Result<Self, GeometryError> {
        if vertices.len() < 2 {
            return Err(GeometryError::TooFewVertices {
                expected: 2,
                found: vertices.len(),
            });
        }
        let vertices = validate_vertices(vertices)?;
        Ok(Self { vertices })
    }

    /// Creates a polyline from `(lat, lon)` pairs in degrees.
    pub fn from_lat_lon(coords: &[(f64, f64)]) -> Result<Self, GeometryError> {
        Self::new(coords.iter().map(|&(lat, lon)| lat_lon_to_unit(lat, lon)).collect())
    }

    /// Returns the polyline vertices.
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Iterates over consecutive vertex pairs.
    pub fn segments(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }

    /// Computes the distance (radians) from a point to the polyline.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.segments()
            .map(|(a, b)| point_to_arc_distance(point, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Returns the distance to the polyline if it is within `max_distance`.
    pub fn distance_within(&self, point: DVec3, max_distance: f64) -> Option<f64> {
        let distance = self.distance_to(point.normalize());
        (distance <= max_distance).then_some(distance)
    }
}

fn validate_vertices(vertices: Vec<DVec3>) -> Result<Vec<DVec3>, GeometryError> {
    vertices
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            if v.is_finite() && v.length() > 1e-12 {
                Ok(v.normalize())
            } else {
                Err(GeometryError::InvalidVertex(i))
            }
        })
        .collect()
}

fn normalize_ring(vertices: Vec<DVec3>) -> Result<Vec<DVec3>, GeometryError> {
    let mut vertices = validate_vertices(vertices)?;
    if vertices.len() > 1 {
        let first = vertices[0];
        if vertices.last().is_some_and(|last| (*last - first).length() < 1e-12) {
            vertices.pop();
        }
    }
    if vertices.len() < 3 {
        return Err(GeometryError::TooFewVertices {
            expected: 3,
            found: vertices.len(),
        });
    }
    Ok(vertices)
}
