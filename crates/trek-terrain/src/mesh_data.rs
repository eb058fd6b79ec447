//! Raw per-level mesh buffers and the parameters they are generated from.

use glam::{Vec2, Vec3};
use trek_geo::BoundingBox;

/// Vertex, texture-coordinate and index buffers of one LOD level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMeshData {
    /// Model-space vertex positions.
    pub vertices: Vec<Vec3>,
    /// Texture coordinates, `(0, 0)` at the south-west corner of the box.
    pub tex_coords: Vec<Vec2>,
    /// Triangle list, three indices per triangle.
    pub triangles: Vec<u32>,
}

impl TerrainMeshData {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Triangle list of a `width` x `height` row-major vertex grid.
///
/// Winding is counter-clockwise when viewed with rows running north and
/// columns running east, so faces point away from the planet.
pub fn grid_triangles(width: u32, height: u32) -> Vec<u32> {
    if width < 2 || height < 2 {
        return Vec::new();
    }
    let mut triangles = Vec::with_capacity(((width - 1) * (height - 1) * 6) as usize);
    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let i0 = y * width + x;
            let i1 = i0 + 1;
            let i2 = i0 + width;
            let i3 = i2 + 1;
            triangles.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    triangles
}

/// Everything needed to generate a model's meshes.
///
/// `radius` and `height_scale` are already in model units (meters times the
/// model scale).
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainMeshMetadata {
    /// Elevation product id.
    pub dem_id: String,
    /// Area the meshes cover.
    pub bounding_box: BoundingBox,
    /// Planet radius in model units.
    pub radius: f32,
    /// Model units per meter of elevation, at 1x exaggeration.
    pub height_scale: f32,
    /// LOD levels beyond level 0.
    pub lod_levels: u32,
    /// Downsample level of LOD 0.
    pub base_downsample: u32,
    /// Downsample level of the physics mesh; negative for none.
    pub physics_downsample: i32,
    /// DEM samples per side before downsampling.
    pub dem_target_size: u32,
}

impl TerrainMeshMetadata {
    /// Samples per side for LOD `level`. Never below 2.
    pub fn level_size(&self, level: u32) -> u32 {
        downsampled(self.dem_target_size, self.base_downsample + level)
    }

    /// Samples per side of the physics mesh, if one is generated.
    pub fn physics_size(&self) -> Option<u32> {
        u32::try_from(self.physics_downsample)
            .ok()
            .map(|level| downsampled(self.dem_target_size, level))
    }
}

fn downsampled(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(2)
}
