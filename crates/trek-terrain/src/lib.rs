//! Multi-resolution terrain models: elevation input, per-variant mesh
//! generation, LOD groups, the height-rescale state machine with its debounced
//! physics mesh, and the terrain registry interface.

mod elevation;
mod error;
mod generator;
mod lod;
mod mesh_data;
mod model;
mod registry;
mod rescale;
mod variant;
mod worker;

pub use elevation::{
    ElevationError, ElevationGrid, ElevationSource, NoiseElevation, NoiseElevationParams,
};
pub use error::TerrainError;
pub use generator::{GeneratedMesh, RescaledVertices, generate_mesh, rescale_mesh};
pub use lod::{IndexFormat, LodGroup, LodLevel, MAX_U16_VERTICES, RenderMesh};
pub use mesh_data::{TerrainMeshData, TerrainMeshMetadata, grid_triangles};
pub use model::{InitCallback, InitState, TerrainModel};
pub use registry::{
    InMemoryRegistry, ModelId, RegistryEvent, RegistryObserver, SubscriptionId, TerrainRegistry,
};
pub use rescale::{Debounced, RescaleState};
pub use variant::TerrainVariant;
