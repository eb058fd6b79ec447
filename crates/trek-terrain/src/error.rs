use thiserror::Error;

/// Construction and lifecycle errors of a terrain model.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("terrain model already has a layer stack")]
    LayerStackAlreadyAttached,

    #[error("cannot attach a layer stack after initialization has started")]
    InitAlreadyStarted,

    #[error("terrain model has no layer stack")]
    MissingLayerStack,

    #[error("bounding box must be set before generating the mesh")]
    MissingBoundingBox,

    #[error("radius must be set before generating the mesh")]
    MissingRadius,

    #[error("failed to spawn mesh worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}
