//! Latitude/longitude ↔ unit-direction conversion and small vector helpers.
//!
//! Directions use a Y-up frame: latitude is the angle above the XZ plane and
//! longitude is measured from +X towards +Z.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A surface coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Create a coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Unit vector from the planet center through `coord`.
pub fn lat_lon_to_direction(coord: LatLon) -> Vec3 {
    let lat = coord.lat.to_radians();
    let lon = coord.lon.to_radians();
    Vec3::new(
        (lat.cos() * lon.cos()) as f32,
        lat.sin() as f32,
        (lat.cos() * lon.sin()) as f32,
    )
}

/// Inverse of [`lat_lon_to_direction`]. `direction` need not be normalized.
pub fn direction_to_lat_lon(direction: Vec3) -> LatLon {
    let dir = direction.normalize_or_zero().as_dvec3();
    if dir == glam::DVec3::ZERO {
        return LatLon::new(0.0, 0.0);
    }
    LatLon::new(
        dir.y.clamp(-1.0, 1.0).asin().to_degrees(),
        dir.z.atan2(dir.x).to_degrees(),
    )
}

/// Distance from `point` to the segment `start..end`.
///
/// The projection is clamped to the segment, so points beyond either end
/// measure to that endpoint.
pub fn distance_point_segment(point: Vec3, start: Vec3, end: Vec3) -> f32 {
    let relative = point - start;
    let line = end - start;
    let length = line.length();
    let direction = if length > 1e-6 { line / length } else { line };
    let along = direction.dot(relative).clamp(0.0, length);
    (start + direction * along - point).length()
}

/// Component of `v` lying in the plane with normal `normal`.
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    let len_sq = normal.length_squared();
    if len_sq < f32::EPSILON {
        return v;
    }
    v - normal * (v.dot(normal) / len_sq)
}

/// Great-circle angle between two coordinates, in radians.
pub fn angular_distance(a: LatLon, b: LatLon) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_prime_meridian_is_plus_x() {
        let dir = lat_lon_to_direction(LatLon::new(0.0, 0.0));
        assert!((dir - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_north_pole_is_plus_y() {
        let dir = lat_lon_to_direction(LatLon::new(90.0, 45.0));
        assert!((dir - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_direction_roundtrip() {
        for &(lat, lon) in &[(10.0, 20.0), (-45.0, 170.0), (60.0, -120.0)] {
            let back = direction_to_lat_lon(lat_lon_to_direction(LatLon::new(lat, lon)));
            assert!((back.lat - lat).abs() < 1e-4, "lat {lat} -> {}", back.lat);
            assert!((back.lon - lon).abs() < 1e-4, "lon {lon} -> {}", back.lon);
        }
    }

    #[test]
    fn test_distance_to_segment_interior() {
        let d = distance_point_segment(Vec3::new(0.0, 3.0, 5.0), Vec3::ZERO, Vec3::Z * 10.0);
        assert!((d - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_segment_clamps_to_end() {
        let d = distance_point_segment(Vec3::new(0.0, 0.0, 14.0), Vec3::ZERO, Vec3::Z * 10.0);
        assert!((d - 4.0).abs() < 1e-6);
        let d = distance_point_segment(Vec3::new(0.0, 0.0, -2.0), Vec3::ZERO, Vec3::Z * 10.0);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_on_plane_removes_normal_component() {
        let p = project_on_plane(Vec3::new(1.0, 2.0, 3.0), Vec3::Z * 5.0);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_angular_distance() {
        let quarter = angular_distance(LatLon::new(0.0, 0.0), LatLon::new(0.0, 90.0));
        assert!((quarter - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        let pole = angular_distance(LatLon::new(-90.0, 0.0), LatLon::new(90.0, 0.0));
        assert!((pole - std::f64::consts::PI).abs() < 1e-9);
        assert_eq!(angular_distance(LatLon::new(12.0, 7.0), LatLon::new(12.0, 7.0)), 0.0);
    }
}
