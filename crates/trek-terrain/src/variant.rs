//! The two terrain model shapes: the whole-planet globe and a flat local patch.

use glam::{Vec2, Vec3};
use trek_config::TerrainConfig;
use trek_geo::{BoundingBox, lat_lon_to_direction};

/// Shape of a terrain model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainVariant {
    /// Spherical model of the planet; vertices are radial.
    Globe,
    /// Equirectangular tangent plane around a bookmarked area; Y is up.
    LocalPatch,
}

impl TerrainVariant {
    /// LOD switch coefficient; level `i` switches at `coefficient^(i + 1)`.
    pub fn lod_coefficient(self, config: &TerrainConfig) -> f32 {
        match self {
            TerrainVariant::Globe => config.globe_lod_coefficient,
            TerrainVariant::LocalPatch => config.local_lod_coefficient,
        }
    }

    /// Configured LOD level count.
    pub fn lod_levels(self, config: &TerrainConfig) -> u32 {
        match self {
            TerrainVariant::Globe => config.globe_lod_levels,
            TerrainVariant::LocalPatch => config.local_lod_levels,
        }
    }

    /// Configured physics downsample level.
    pub fn physics_downsample(self, config: &TerrainConfig) -> i32 {
        match self {
            TerrainVariant::Globe => config.globe_physics_downsample,
            TerrainVariant::LocalPatch => config.local_physics_downsample,
        }
    }

    /// Model-space position of the grid point at `uv` inside `bbox`.
    ///
    /// `height` is the elevation already multiplied by the height scale.
    pub fn project(self, bbox: &BoundingBox, uv: Vec2, radius: f32, height: f32) -> Vec3 {
        match self {
            TerrainVariant::Globe => {
                let coord = bbox.lerp(f64::from(uv.x), f64::from(uv.y));
                lat_lon_to_direction(coord) * (radius + height)
            }
            TerrainVariant::LocalPatch => {
                let units_per_degree = radius.to_radians();
                let center_lat = bbox.median().lat.to_radians() as f32;
                let x = (uv.x - 0.5) * bbox.width() as f32 * units_per_degree * center_lat.cos();
                let z = (uv.y - 0.5) * bbox.height() as f32 * units_per_degree;
                Vec3::new(x, height, z)
            }
        }
    }

    /// Apply a height exaggeration to a vertex generated at 1x.
    ///
    /// Only the height component changes: the radial offset above the sphere
    /// for the globe, the Y coordinate for the local patch.
    pub fn rescale_vertex(self, reference: Vec3, radius: f32, scale: f32) -> Vec3 {
        match self {
            TerrainVariant::Globe => {
                let distance = reference.length();
                if distance <= f32::EPSILON {
                    return reference;
                }
                reference / distance * (radius + (distance - radius) * scale)
            }
            TerrainVariant::LocalPatch => Vec3::new(reference.x, reference.y * scale, reference.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_lookup() {
        let config = TerrainConfig::default();
        assert_eq!(TerrainVariant::Globe.lod_coefficient(&config), 0.25);
        assert_eq!(TerrainVariant::LocalPatch.lod_coefficient(&config), 0.5);
        assert_eq!(TerrainVariant::Globe.physics_downsample(&config), 5);
        assert_eq!(TerrainVariant::LocalPatch.physics_downsample(&config), 3);
    }

    #[test]
    fn test_globe_projection_radius() {
        let v = TerrainVariant::Globe.project(&BoundingBox::GLOBAL, Vec2::new(0.5, 0.5), 2.0, 0.5);
        assert!((v.length() - 2.5).abs() < 1e-5);
        // Center of the global box is lat 0, lon 0.
        assert!((v.normalize() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_local_patch_is_centered() {
        let bbox = BoundingBox::new(10.0, 10.0, 12.0, 12.0).unwrap();
        let center = TerrainVariant::LocalPatch.project(&bbox, Vec2::splat(0.5), 1.0, 0.1);
        assert_eq!(center, Vec3::new(0.0, 0.1, 0.0));
        let ne = TerrainVariant::LocalPatch.project(&bbox, Vec2::ONE, 1.0, 0.0);
        assert!(ne.x > 0.0 && ne.z > 0.0);
    }

    /// Rescaling only stretches the height component.
    #[test]
    fn test_rescale_height_only() {
        let globe = TerrainVariant::Globe;
        let reference = Vec3::new(0.0, 1.1, 0.0);
        let scaled = globe.rescale_vertex(reference, 1.0, 3.0);
        assert!((scaled - Vec3::new(0.0, 1.3, 0.0)).length() < 1e-5);
        assert!((globe.rescale_vertex(reference, 1.0, 1.0) - reference).length() < 1e-6);

        let patch = TerrainVariant::LocalPatch;
        assert_eq!(
            patch.rescale_vertex(Vec3::new(1.0, 2.0, 3.0), 1.0, 0.5),
            Vec3::new(1.0, 1.0, 3.0)
        );
    }
}
