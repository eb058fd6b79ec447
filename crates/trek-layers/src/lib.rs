//! Ordered texture-layer stack for terrain models: bounded layer list, async
//! texture fetch interface, and the surface material the layers are bound to.

mod layer;
mod material;
mod provider;
mod stack;

pub use layer::TerrainLayer;
pub use material::{
    MAX_DIFFUSE_LAYERS, MaterialId, RenderMode, ShaderVariant, SurfaceMaterial, SurfaceUniform,
    TextureSlot,
};
pub use provider::{
    FetchError, FetchResponder, FetchTicket, MemoryTextureProvider, Raster,
    TerrainProductMetadata, TextureId, TextureProvider,
};
pub use stack::{LayerCallback, LayerError, LayerStack};
