//! Renderable meshes and the LOD group that switches between them.

use glam::{Vec2, Vec3};
use trek_layers::MaterialId;

use crate::mesh_data::TerrainMeshData;

/// Vertex count above which 16-bit indices no longer suffice.
pub const MAX_U16_VERTICES: usize = 1 << 16;

/// Width of the index buffer handed to the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit indices.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexFormat {
    /// Narrowest format that can address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > MAX_U16_VERTICES {
            IndexFormat::U32
        } else {
            IndexFormat::U16
        }
    }
}

/// GPU-ready mesh: positions, UVs, smooth normals, indices.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderMesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    index_format: IndexFormat,
    material: Option<MaterialId>,
}

impl RenderMesh {
    /// Build a mesh from generated data, computing normals.
    pub fn from_data(data: &TerrainMeshData, material: Option<MaterialId>) -> Self {
        let mut mesh = Self {
            positions: data.vertices.clone(),
            uvs: data.tex_coords.clone(),
            normals: Vec::new(),
            indices: data.triangles.clone(),
            index_format: IndexFormat::for_vertex_count(data.vertices.len()),
            material,
        };
        mesh.recalculate_normals();
        mesh
    }

    /// Replace vertex positions in place and recompute normals.
    ///
    /// UVs and indices are untouched. Ignored if the vertex count differs.
    pub fn set_positions(&mut self, positions: Vec<Vec3>) -> bool {
        if positions.len() != self.positions.len() {
            return false;
        }
        self.positions = positions;
        self.recalculate_normals();
        true
    }

    fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Texture coordinates.
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Per-vertex unit normals.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Triangle indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Index width required by this mesh.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Material the mesh renders with.
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }
}

/// One LOD level: a mesh and the screen-relative height it stays visible down to.
#[derive(Clone, Debug, PartialEq)]
pub struct LodLevel {
    /// Level mesh.
    pub mesh: RenderMesh,
    /// Minimum screen-relative height at which this level is shown.
    pub threshold: f32,
}

/// Meshes of all LOD levels of one model.
#[derive(Clone, Debug, PartialEq)]
pub struct LodGroup {
    levels: Vec<LodLevel>,
    enabled: bool,
}

impl LodGroup {
    /// Group `meshes` with thresholds `coefficient^(level + 1)`.
    ///
    /// A single mesh disables level switching.
    pub fn new(meshes: Vec<RenderMesh>, coefficient: f32) -> Self {
        let enabled = meshes.len() > 1;
        let levels = meshes
            .into_iter()
            .enumerate()
            .map(|(i, mesh)| LodLevel {
                mesh,
                threshold: coefficient.powi(i as i32 + 1),
            })
            .collect();
        Self { levels, enabled }
    }

    /// Whether level switching is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// All levels, finest first.
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// `true` if the group has no levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Mesh of `level`.
    pub fn mesh(&self, level: usize) -> Option<&RenderMesh> {
        self.levels.get(level).map(|l| &l.mesh)
    }

    /// Level to draw when the model covers `screen_height` of the viewport.
    ///
    /// Returns the first level whose threshold is at or below the height, or
    /// `None` (culled) below the last threshold. With switching disabled
    /// level 0 is always drawn.
    pub fn select_level(&self, screen_height: f32) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        if !self.enabled {
            return Some(0);
        }
        self.levels
            .iter()
            .position(|level| screen_height >= level.threshold)
    }

    /// Reassign the positions of every level. Extra or missing entries are ignored.
    pub fn set_positions(&mut self, positions: Vec<Vec<Vec3>>) {
        for (level, positions) in self.levels.iter_mut().zip(positions) {
            level.mesh.set_positions(positions);
        }
    }
}
