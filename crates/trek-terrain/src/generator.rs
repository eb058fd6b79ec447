//! Synchronous mesh generation and rescale arithmetic.
//!
//! These run on the mesh worker thread; see [`crate::worker`].

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::elevation::{ElevationError, ElevationSource};
use crate::mesh_data::{TerrainMeshData, TerrainMeshMetadata, grid_triangles};
use crate::variant::TerrainVariant;

/// Reference meshes of a model at 1x height exaggeration.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMesh {
    /// One entry per LOD level, finest first.
    pub levels: Vec<TerrainMeshData>,
    /// Coarse collision mesh, if the model has one.
    pub physics: Option<TerrainMeshData>,
}

/// Vertex positions of every mesh after a rescale.
#[derive(Clone, Debug, PartialEq)]
pub struct RescaledVertices {
    /// Exaggeration these vertices were computed for.
    pub scale: f32,
    /// Positions per LOD level, parallel to [`GeneratedMesh::levels`].
    pub levels: Vec<Vec<Vec3>>,
    /// Positions of the physics mesh.
    pub physics: Option<Vec<Vec3>>,
}

/// Build all LOD levels plus the physics mesh described by `metadata`.
pub fn generate_mesh(
    variant: TerrainVariant,
    metadata: &TerrainMeshMetadata,
    source: &dyn ElevationSource,
) -> Result<GeneratedMesh, ElevationError> {
    let mut levels = Vec::with_capacity(metadata.lod_levels as usize + 1);
    for level in 0..=metadata.lod_levels {
        let size = metadata.level_size(level);
        levels.push(generate_level(variant, metadata, source, size)?);
    }
    let physics = match metadata.physics_size() {
        Some(size) => Some(generate_level(variant, metadata, source, size)?),
        None => None,
    };
    debug!(
        dem_id = %metadata.dem_id,
        levels = levels.len(),
        vertices = levels.first().map_or(0, TerrainMeshData::vertex_count),
        "Generated terrain mesh"
    );
    Ok(GeneratedMesh { levels, physics })
}

fn generate_level(
    variant: TerrainVariant,
    metadata: &TerrainMeshMetadata,
    source: &dyn ElevationSource,
    size: u32,
) -> Result<TerrainMeshData, ElevationError> {
    let grid = source.sample(&metadata.dem_id, &metadata.bounding_box, size, size)?;
    let (width, height) = (grid.width(), grid.height());
    let step = Vec2::new(
        1.0 / (width.max(2) - 1) as f32,
        1.0 / (height.max(2) - 1) as f32,
    );

    let count = width as usize * height as usize;
    let mut vertices = Vec::with_capacity(count);
    let mut tex_coords = Vec::with_capacity(count);
    for y in 0..height {
        for x in 0..width {
            let uv = Vec2::new(x as f32, y as f32) * step;
            let elevation = grid.get(x, y) * metadata.height_scale;
            vertices.push(variant.project(
                &metadata.bounding_box,
                uv,
                metadata.radius,
                elevation,
            ));
            tex_coords.push(uv);
        }
    }

    Ok(TerrainMeshData {
        vertices,
        tex_coords,
        triangles: grid_triangles(width, height),
    })
}

/// Scale the height component of every reference vertex by `scale`.
pub fn rescale_mesh(
    variant: TerrainVariant,
    reference: &GeneratedMesh,
    radius: f32,
    scale: f32,
) -> RescaledVertices {
    let rescale = |data: &TerrainMeshData| -> Vec<Vec3> {
        data.vertices
            .iter()
            .map(|&v| variant.rescale_vertex(v, radius, scale))
            .collect()
    };
    RescaledVertices {
        scale,
        levels: reference.levels.iter().map(rescale).collect(),
        physics: reference.physics.as_ref().map(rescale),
    }
}
