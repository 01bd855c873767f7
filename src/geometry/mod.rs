//! Spherical geometry module.
//!
//! Provides unit-sphere coordinates, great circle arc distances, plate
//! boundary polygons and finite rotations used by the reconstruction engine.

mod polygon;
mod rotation;
mod sampling;
mod sphere;

pub use polygon::{BoundaryPolygon, GeometryError, Polyline};
pub use rotation::FiniteRotation;
pub use sampling::{fibonacci_points, random_points};
pub use sphere::{
    closest_point_on_arc, great_circle_distance, lat_lon_to_unit, point_to_arc_distance,
    unit_to_lat_lon, EARTH_RADIUS_KM,
};
