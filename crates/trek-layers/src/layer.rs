//! A single entry of the layer stack.

/// One diffuse texture layer composited onto a terrain model.
///
/// Index 0 of a stack is the base layer; its `opacity` and `visible` are never
/// changed by stack operations.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainLayer {
    /// Name shown in the layer list.
    pub display_name: String,
    /// Catalog id of the raster product backing this layer.
    pub product_id: String,
    /// Thumbnail reference for the layer list, if the catalog has one.
    pub thumbnail: Option<String>,
    /// Blend opacity in `[0, 1]`.
    pub opacity: f32,
    /// Hidden layers keep their opacity but render fully transparent.
    pub visible: bool,
}

impl TerrainLayer {
    /// A fully opaque, visible layer.
    pub fn new(display_name: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            product_id: product_id.into(),
            thumbnail: None,
            opacity: 1.0,
            visible: true,
        }
    }

    /// Opacity pushed to the shader for this layer.
    pub fn effective_opacity(&self) -> f32 {
        if self.visible { self.opacity } else { 0.0 }
    }
}
