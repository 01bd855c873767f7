//! Unit-sphere coordinate conversions and great-circle arc measurements.

use glam::DVec3;

/// Equatorial radius of the Earth in km, used to turn angular distances into
/// surface distances.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Converts geographic coordinates in degrees to a point on the unit sphere.
///
/// The x axis points at (0°N, 0°E), the z axis at the north pole.
///
/// # Example
/// ```
/// use topotrack::geometry::lat_lon_to_unit;
///
/// let north_pole = lat_lon_to_unit(90.0, 0.0);
/// assert!((north_pole.z - 1.0).abs() < 1e-12);
/// ```
pub fn lat_lon_to_unit(lat_deg: f64, lon_deg: f64) -> DVec3 {
    let (slat, clat) = lat_deg.to_radians().sin_cos();
    let (slon, clon) = lon_deg.to_radians().sin_cos();
    DVec3::new(clat * clon, clat * slon, slat)
}

/// Converts a point on the sphere to `(latitude, longitude)` in degrees.
///
/// Longitude is in `[-180, 180]`. The point does not need to be normalized.
pub fn unit_to_lat_lon(point: DVec3) -> (f64, f64) {
    let p = point.normalize();
    let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = p.y.atan2(p.x).to_degrees();
    (lat, lon)
}

/// Computes the great circle distance (radians) between two unit vectors.
pub fn great_circle_distance(a: DVec3, b: DVec3) -> f64 {
    // atan2 keeps precision for both tiny and near-antipodal separations
    a.cross(b).length().atan2(a.dot(b))
}

/// Finds the closest point on the minor great circle arc `start -> end`.
pub fn closest_point_on_arc(point: DVec3, start: DVec3, end: DVec3) -> DVec3 {
    let normal = start.cross(end);
    let len = normal.length();
    if len < 1e-12 {
        return nearer_endpoint(point, start, end);
    }
    let normal = normal / len;

    // Project onto the plane of the arc's great circle
    let projected = point - normal * point.dot(normal);
    if projected.length_squared() < 1e-24 {
        // Point sits on a pole of the great circle, equidistant from the whole arc
        return start;
    }
    let projected = projected.normalize();

    if lies_within_arc(projected, start, end, normal) {
        projected
    } else {
        nearer_endpoint(point, start, end)
    }
}

/// Computes the distance (radians) from a point to a great circle arc.
pub fn point_to_arc_distance(point: DVec3, start: DVec3, end: DVec3) -> f64 {
    great_circle_distance(point, closest_point_on_arc(point, start, end))
}

/// Whether `x`, lying on the great circle with pole `normal`, is between
/// `start` and `end` on the minor arc.
#[inline]
pub(crate) fn lies_within_arc(x: DVec3, start: DVec3, end: DVec3, normal: DVec3) -> bool {
    start.cross(x).dot(normal) >= 0.0 && x.cross(end).dot(normal) >= 0.0
}

#[inline]
fn nearer_endpoint(point: DVec3, start: DVec3, end: DVec3) -> DVec3 {
    if great_circle_distance(point, start) <= great_circle_distance(point, end) {
        start
    } else {
        end
    }
}
