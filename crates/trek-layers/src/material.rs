//! Surface material shared by every LOD mesh of a terrain model.
//!
//! Holds the eight diffuse texture slots with their UV transforms and
//! opacities, the render-mode dependent shader variant and lighting presets,
//! and a packed uniform block for GPU upload.

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use trek_config::LayerConfig;
use trek_geo::UvScaleOffset;

use crate::provider::TextureId;

/// Maximum number of diffuse layers, including the base layer.
pub const MAX_DIFFUSE_LAYERS: usize = 8;

static NEXT_MATERIAL_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a [`SurfaceMaterial`] so meshes can reference it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    fn next() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The four terrain shader programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderVariant {
    /// Textured, opaque.
    MultiDiffuseOverlay,
    /// Textured, faded out while interaction is disabled.
    MultiDiffuseOverlayTransparent,
    /// Untextured, opaque.
    NoTexturesOverlay,
    /// Untextured, faded out while interaction is disabled.
    NoTexturesOverlayTransparent,
}

impl ShaderVariant {
    /// Shader asset path.
    pub fn shader_name(self) -> &'static str {
        match self {
            ShaderVariant::MultiDiffuseOverlay => "Custom/Terrain/MultiDiffuseOverlay",
            ShaderVariant::MultiDiffuseOverlayTransparent => {
                "Custom/Terrain/MultiDiffuseOverlayTransparent"
            }
            ShaderVariant::NoTexturesOverlay => "Custom/Terrain/NoTexturesOverlay",
            ShaderVariant::NoTexturesOverlayTransparent => {
                "Custom/Terrain/NoTexturesOverlayTransparent"
            }
        }
    }
}

/// Independent render-mode flags of a layer stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderMode {
    /// Draw the coordinate/selection overlay texture.
    pub overlay: bool,
    /// Render untextured.
    pub no_textures: bool,
    /// Terrain interaction is disabled; render semi-transparent.
    pub disabled: bool,
}

impl RenderMode {
    /// Shader selected by the texture and disabled flags.
    pub fn shader_variant(&self) -> ShaderVariant {
        match (self.no_textures, self.disabled) {
            (false, false) => ShaderVariant::MultiDiffuseOverlay,
            (false, true) => ShaderVariant::MultiDiffuseOverlayTransparent,
            (true, false) => ShaderVariant::NoTexturesOverlay,
            (true, true) => ShaderVariant::NoTexturesOverlayTransparent,
        }
    }
}

/// A bound diffuse texture and its sampling parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureSlot {
    /// Bound texture, if any.
    pub texture: Option<TextureId>,
    /// UV scale of the texture transform.
    pub scale: Vec2,
    /// UV offset of the texture transform.
    pub offset: Vec2,
    /// Blend opacity. Unused for slot 0.
    pub opacity: f32,
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self {
            texture: None,
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
            opacity: 0.0,
        }
    }
}

/// Shader parameters of a terrain surface.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceMaterial {
    id: MaterialId,
    /// Active shader program.
    pub shader: ShaderVariant,
    slots: [TextureSlot; MAX_DIFFUSE_LAYERS],
    /// Global diffuse opacity (transparent variants only).
    pub diffuse_opacity: f32,
    /// PBR smoothness.
    pub glossiness: f32,
    /// PBR metallic.
    pub metallic: f32,
    /// Overlay texture opacity.
    pub overlay_opacity: f32,
    /// Base colour tint (linear RGBA).
    pub color: [f32; 4],
}

impl SurfaceMaterial {
    /// Default opaque textured material.
    pub fn new(presets: &LayerConfig) -> Self {
        Self {
            id: MaterialId::next(),
            shader: ShaderVariant::MultiDiffuseOverlay,
            slots: [TextureSlot::default(); MAX_DIFFUSE_LAYERS],
            diffuse_opacity: 1.0,
            glossiness: presets.shader_smoothness,
            metallic: presets.shader_metallic,
            overlay_opacity: 0.0,
            color: [1.0; 4],
        }
    }

    /// Identifier meshes use to reference this material.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// All slots, base first.
    pub fn slots(&self) -> &[TextureSlot; MAX_DIFFUSE_LAYERS] {
        &self.slots
    }

    /// One slot. Panics if `index >= MAX_DIFFUSE_LAYERS`.
    pub fn slot(&self, index: usize) -> &TextureSlot {
        &self.slots[index]
    }

    /// Bind a freshly fetched texture with an identity UV transform.
    pub fn bind_texture(&mut self, index: usize, texture: TextureId) {
        let slot = &mut self.slots[index];
        slot.texture = Some(texture);
        slot.scale = Vec2::ONE;
        slot.offset = Vec2::ZERO;
    }

    /// Unbind a slot. Non-base slots also drop to zero opacity.
    pub fn clear_texture(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.texture = None;
        slot.scale = Vec2::ONE;
        slot.offset = Vec2::ZERO;
        if index > 0 {
            slot.opacity = 0.0;
        }
    }

    /// Set a slot's texture transform.
    pub fn set_texture_transform(&mut self, index: usize, transform: UvScaleOffset) {
        let slot = &mut self.slots[index];
        slot.scale = transform.scale;
        slot.offset = transform.offset;
    }

    /// Set the blend opacity of a non-base slot. Slot 0 is ignored.
    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) {
        if index > 0 {
            self.slots[index].opacity = opacity;
        }
    }

    /// Recompute shader and lighting parameters for a render mode.
    pub fn apply_render_mode(&mut self, mode: RenderMode, presets: &LayerConfig) {
        self.shader = mode.shader_variant();
        self.diffuse_opacity = if mode.disabled {
            presets.disabled_diffuse_opacity
        } else {
            1.0
        };
        if mode.no_textures {
            self.glossiness = presets.no_texture_smoothness;
            self.metallic = presets.no_texture_metallic;
            self.color = [1.0; 4];
        } else {
            self.glossiness = presets.shader_smoothness;
            self.metallic = presets.shader_metallic;
        }
        self.overlay_opacity = if mode.overlay { 1.0 } else { 0.0 };
    }

    /// Pack into the GPU uniform layout.
    pub fn to_uniform(&self) -> SurfaceUniform {
        let mut uniform = SurfaceUniform::zeroed();
        for (i, slot) in self.slots.iter().enumerate() {
            uniform.slot_scale_offset[i] = [slot.scale.x, slot.scale.y, slot.offset.x, slot.offset.y];
            uniform.slot_opacity[i / 4][i % 4] = slot.opacity;
        }
        uniform.color = self.color;
        uniform.params = [
            self.diffuse_opacity,
            self.glossiness,
            self.metallic,
            self.overlay_opacity,
        ];
        uniform
    }
}

/// std140-compatible uniform block of a [`SurfaceMaterial`], 192 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SurfaceUniform {
    /// Per slot: xy = UV scale, zw = UV offset.
    pub slot_scale_offset: [[f32; 4]; MAX_DIFFUSE_LAYERS],
    /// Slot opacities packed four per vector.
    pub slot_opacity: [[f32; 4]; 2],
    /// Base colour tint.
    pub color: [f32; 4],
    /// x = diffuse opacity, y = glossiness, z = metallic, w = overlay opacity.
    pub params: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<SurfaceUniform>(), 192);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_variant_selection() {
        let mut mode = RenderMode::default();
        assert_eq!(mode.shader_variant(), ShaderVariant::MultiDiffuseOverlay);
        mode.disabled = true;
        assert_eq!(
            mode.shader_variant(),
            ShaderVariant::MultiDiffuseOverlayTransparent
        );
        mode.no_textures = true;
        assert_eq!(
            mode.shader_variant(),
            ShaderVariant::NoTexturesOverlayTransparent
        );
        mode.disabled = false;
        assert_eq!(mode.shader_variant(), ShaderVariant::NoTexturesOverlay);
        // Overlay does not pick a different program.
        mode.overlay = true;
        assert_eq!(mode.shader_variant(), ShaderVariant::NoTexturesOverlay);
    }

    #[test]
    fn test_render_mode_presets() {
        let presets = LayerConfig::default();
        let mut material = SurfaceMaterial::new(&presets);
        material.apply_render_mode(
            RenderMode {
                overlay: true,
                no_textures: true,
                disabled: true,
            },
            &presets,
        );
        assert_eq!(material.diffuse_opacity, 0.69);
        assert_eq!(material.glossiness, 0.37);
        assert_eq!(material.metallic, 0.31);
        assert_eq!(material.overlay_opacity, 1.0);

        material.apply_render_mode(RenderMode::default(), &presets);
        assert_eq!(material.diffuse_opacity, 1.0);
        assert_eq!(material.glossiness, 0.31);
        assert_eq!(material.overlay_opacity, 0.0);
        assert_eq!(material.shader.shader_name(), "Custom/Terrain/MultiDiffuseOverlay");
    }

    #[test]
    fn test_base_slot_opacity_ignored() {
        let mut material = SurfaceMaterial::new(&LayerConfig::default());
        material.set_layer_opacity(0, 0.2);
        material.set_layer_opacity(3, 0.5);
        assert_eq!(material.slot(0).opacity, 0.0);
        assert_eq!(material.slot(3).opacity, 0.5);
    }

    #[test]
    fn test_bind_resets_transform() {
        let mut material = SurfaceMaterial::new(&LayerConfig::default());
        material.set_texture_transform(
            2,
            UvScaleOffset {
                scale: Vec2::splat(0.5),
                offset: Vec2::splat(0.25),
            },
        );
        material.bind_texture(2, TextureId(9));
        assert_eq!(material.slot(2).scale, Vec2::ONE);
        assert_eq!(material.slot(2).offset, Vec2::ZERO);
        assert_eq!(material.slot(2).texture, Some(TextureId(9)));
    }

    #[test]
    fn test_uniform_packing() {
        let mut material = SurfaceMaterial::new(&LayerConfig::default());
        material.set_layer_opacity(5, 0.75);
        let uniform = material.to_uniform();
        assert_eq!(uniform.slot_opacity[1][1], 0.75);
        assert_eq!(uniform.slot_scale_offset[0], [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(bytemuck::bytes_of(&uniform).len(), 192);
    }

    #[test]
    fn test_material_ids_are_unique() {
        let presets = LayerConfig::default();
        assert_ne!(
            SurfaceMaterial::new(&presets).id(),
            SurfaceMaterial::new(&presets).id()
        );
    }
}
