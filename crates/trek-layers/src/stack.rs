//! The ordered, bounded layer stack of a terrain model.
//!
//! Mutations that need a texture go through the [`TextureProvider`] and
//! complete during a later [`LayerStack::tick`]. Rejected operations are
//! logged, leave the stack untouched, still invoke their completion callback,
//! and report the reason through [`LayerError`].

use crossbeam_channel::{Receiver, Sender};
use glam::UVec2;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use trek_config::LayerConfig;
use trek_geo::{BoundingBox, calculate_uv_scale_offset};

use crate::layer::TerrainLayer;
use crate::material::{MAX_DIFFUSE_LAYERS, RenderMode, SurfaceMaterial};
use crate::provider::{
    FetchCompletion, FetchResponder, FetchTicket, TerrainProductMetadata, TextureProvider,
};

/// Completion callback of a layer operation.
pub type LayerCallback = Box<dyn FnOnce()>;

/// Reasons a layer operation was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayerError {
    /// The stack already holds [`MAX_DIFFUSE_LAYERS`] layers.
    #[error("number of layers cannot exceed {max}")]
    CapacityExceeded {
        /// The layer limit.
        max: usize,
    },
    /// The product is already a layer of this stack.
    #[error("product `{0}` has already been added as a layer")]
    DuplicateProduct(String),
    /// Index outside the current layer list.
    #[error("layer index {index} out of range for {len} layers")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current layer count.
        len: usize,
    },
    /// The base layer's opacity and visibility are fixed.
    #[error("the base layer cannot be updated")]
    BaseLayerImmutable,
    /// Direct setters are only allowed before [`LayerStack::start`].
    #[error("layer stack has already started rendering")]
    AlreadyStarted,
}

enum PendingFetch {
    AddLayer {
        product_id: String,
        index: Option<usize>,
        callback: Option<LayerCallback>,
    },
    Reload {
        slot: usize,
        generation: u64,
    },
}

/// Ordered texture layers plus the material they are composited into.
pub struct LayerStack {
    layers: Vec<TerrainLayer>,
    material: SurfaceMaterial,
    presets: LayerConfig,
    bbox: BoundingBox,
    target_size: UVec2,
    render_mode: RenderMode,
    started: bool,
    provider: Box<dyn TextureProvider>,
    sender: Sender<FetchCompletion>,
    receiver: Receiver<FetchCompletion>,
    next_ticket: u64,
    pending: FxHashMap<FetchTicket, PendingFetch>,
    slot_generation: [u64; MAX_DIFFUSE_LAYERS],
}

fn finish(callback: Option<LayerCallback>) {
    if let Some(callback) = callback {
        callback();
    }
}

impl LayerStack {
    /// Empty stack covering the whole planet.
    pub fn new(provider: Box<dyn TextureProvider>, presets: LayerConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let size = presets.texture_target_size;
        Self {
            layers: Vec::new(),
            material: SurfaceMaterial::new(&presets),
            presets,
            bbox: BoundingBox::GLOBAL,
            target_size: UVec2::splat(size),
            render_mode: RenderMode::default(),
            started: false,
            provider,
            sender,
            receiver,
            next_ticket: 0,
            pending: FxHashMap::default(),
            slot_generation: [0; MAX_DIFFUSE_LAYERS],
        }
    }

    /// Layers in composite order, base first.
    pub fn layers(&self) -> &[TerrainLayer] {
        &self.layers
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` if no layer has been added yet.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The shared surface material.
    pub fn material(&self) -> &SurfaceMaterial {
        &self.material
    }

    /// Area the bound textures cover.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Current render-mode flags.
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Fetches issued but not yet completed.
    pub fn pending_fetches(&self) -> usize {
        self.pending.len()
    }

    /// Requested texture size in pixels.
    pub fn target_texture_size(&self) -> UVec2 {
        self.target_size
    }

    /// Change the requested texture size. Applies to fetches issued afterwards.
    pub fn set_target_texture_size(&mut self, size: UVec2) {
        self.target_size = size.max(UVec2::ONE);
    }

    /// Set the covered area before rendering starts.
    ///
    /// After [`start`](Self::start) use [`update_bounding_box`](Self::update_bounding_box).
    pub fn set_bounding_box(&mut self, bbox: BoundingBox) -> Result<(), LayerError> {
        if self.started {
            error!("Bounding box cannot be set directly after start; use update_bounding_box");
            return Err(LayerError::AlreadyStarted);
        }
        self.bbox = bbox;
        Ok(())
    }

    /// Begin rendering: apply the registry's render flags and load every slot.
    pub fn start(&mut self, textures_enabled: bool, interaction_enabled: bool) {
        self.started = true;
        self.render_mode.disabled = !interaction_enabled;
        self.render_mode.no_textures = !textures_enabled;
        self.update_material_properties();
        self.reload_textures(0);
    }

    /// Add `product_id` at `index` (append when `None`) once its texture arrives.
    pub fn add_layer(
        &mut self,
        product_id: &str,
        index: Option<usize>,
        callback: Option<LayerCallback>,
    ) -> Result<(), LayerError> {
        if self.layers.len() >= MAX_DIFFUSE_LAYERS {
            error!("Number of layers cannot exceed {MAX_DIFFUSE_LAYERS}");
            finish(callback);
            return Err(LayerError::CapacityExceeded {
                max: MAX_DIFFUSE_LAYERS,
            });
        }
        if self.contains(product_id) {
            warn!(product_id, "Product has already been added as a layer");
            finish(callback);
            return Err(LayerError::DuplicateProduct(product_id.to_string()));
        }

        let metadata = self.product_metadata(product_id);
        self.issue_fetch(
            &metadata,
            PendingFetch::AddLayer {
                product_id: product_id.to_string(),
                index,
                callback,
            },
        );
        Ok(())
    }

    /// Change the opacity and/or visibility of a non-base layer.
    pub fn update_layer(
        &mut self,
        index: usize,
        opacity: Option<f32>,
        visible: Option<bool>,
        callback: Option<LayerCallback>,
    ) -> Result<(), LayerError> {
        let result = self.apply_layer_update(index, opacity, visible);
        finish(callback);
        result
    }

    fn apply_layer_update(
        &mut self,
        index: usize,
        opacity: Option<f32>,
        visible: Option<bool>,
    ) -> Result<(), LayerError> {
        if index == 0 {
            return Err(LayerError::BaseLayerImmutable);
        }
        let len = self.layers.len();
        let Some(layer) = self.layers.get_mut(index) else {
            return Err(LayerError::IndexOutOfRange { index, len });
        };

        let mut changed = false;
        // NaN survives `clamp`, so non-finite values count as "not given".
        if let Some(opacity) = opacity.filter(|o| o.is_finite()) {
            let opacity = opacity.clamp(0.0, 1.0);
            if layer.opacity != opacity {
                layer.opacity = opacity;
                changed = true;
            }
        }
        if let Some(visible) = visible
            && layer.visible != visible
        {
            layer.visible = visible;
            changed = true;
        }
        if changed {
            let effective = layer.effective_opacity();
            self.material.set_layer_opacity(index, effective);
        }
        Ok(())
    }

    /// Move the layer at `from` to `to`.
    pub fn move_layer(
        &mut self,
        from: usize,
        to: usize,
        callback: Option<LayerCallback>,
    ) -> Result<(), LayerError> {
        let len = self.layers.len();
        let result = if from >= len {
            Err(LayerError::IndexOutOfRange { index: from, len })
        } else if to >= len {
            Err(LayerError::IndexOutOfRange { index: to, len })
        } else {
            if from != to {
                let layer = self.layers.remove(from);
                self.layers.insert(to, layer);
                debug!(from, to, "Moved layer");
                if self.started {
                    self.reload_textures(Self::reload_start(from.min(to)));
                }
            }
            Ok(())
        };
        finish(callback);
        result
    }

    /// Remove the layer at `index`.
    pub fn remove_layer(
        &mut self,
        index: usize,
        callback: Option<LayerCallback>,
    ) -> Result<(), LayerError> {
        let len = self.layers.len();
        let result = if index < len {
            let removed = self.layers.remove(index);
            debug!(index, product_id = %removed.product_id, "Removed layer");
            if self.started {
                self.reload_textures(Self::reload_start(index));
            }
            Ok(())
        } else {
            Err(LayerError::IndexOutOfRange { index, len })
        };
        finish(callback);
        result
    }

    /// Retarget every layer to `bbox` and reload all textures.
    ///
    /// With `use_temporary_textures`, the currently bound textures are
    /// remapped onto the new box until the reload lands; otherwise they are
    /// cleared so no misaligned imagery is shown.
    pub fn update_bounding_box(&mut self, bbox: BoundingBox, use_temporary_textures: bool) {
        if bbox == self.bbox {
            return;
        }

        if use_temporary_textures {
            let transform = calculate_uv_scale_offset(&self.bbox, &bbox);
            for i in 0..MAX_DIFFUSE_LAYERS {
                if self.material.slot(i).texture.is_some() {
                    self.material.set_texture_transform(i, transform);
                }
            }
        } else {
            for i in 0..MAX_DIFFUSE_LAYERS {
                if self.material.slot(i).texture.is_some() {
                    self.material.clear_texture(i);
                }
            }
        }

        info!(from = %self.bbox, to = %bbox, "Updating layer bounding box");
        self.bbox = bbox;

        if self.started {
            self.reload_textures(0);
        }
    }

    /// Toggle the overlay texture.
    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        self.render_mode.overlay = enabled;
        self.update_material_properties();
    }

    /// Toggle untextured rendering.
    pub fn set_textures_disabled(&mut self, disabled: bool) {
        self.render_mode.no_textures = disabled;
        self.update_material_properties();
    }

    /// Toggle the semi-transparent disabled look.
    pub fn set_interaction_disabled(&mut self, disabled: bool) {
        self.render_mode.disabled = disabled;
        self.update_material_properties();
    }

    fn update_material_properties(&mut self) {
        debug!(
            overlay = self.render_mode.overlay,
            no_textures = self.render_mode.no_textures,
            disabled = self.render_mode.disabled,
            "Updating material properties"
        );
        self.material
            .apply_render_mode(self.render_mode, &self.presets);
    }

    /// Apply every fetch result that arrived since the last tick.
    ///
    /// Returns the number of results processed.
    pub fn tick(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.receiver.try_recv() {
            processed += 1;
            let Some(pending) = self.pending.remove(&completion.ticket) else {
                debug!(ticket = ?completion.ticket, "Dropping response for unknown fetch");
                continue;
            };
            match pending {
                PendingFetch::AddLayer {
                    product_id,
                    index,
                    callback,
                } => {
                    self.complete_add(product_id, index, completion);
                    finish(callback);
                }
                PendingFetch::Reload { slot, generation } => {
                    self.complete_reload(slot, generation, completion);
                }
            }
        }
        processed
    }

    /// Release all bound textures and forget outstanding fetches.
    pub fn dispose(&mut self) {
        for i in 0..MAX_DIFFUSE_LAYERS {
            self.material.clear_texture(i);
            self.slot_generation[i] += 1;
        }
        self.pending.clear();
        self.layers.clear();
        self.started = false;
    }

    fn complete_add(
        &mut self,
        product_id: String,
        index: Option<usize>,
        completion: FetchCompletion,
    ) {
        let raster = match completion.result {
            Ok(raster) => raster,
            Err(err) => {
                error!(%product_id, %err, "Failed to fetch layer texture");
                return;
            }
        };
        // The stack may have changed while the fetch was outstanding.
        if self.layers.len() >= MAX_DIFFUSE_LAYERS {
            error!(%product_id, "Layer stack filled up while fetching; dropping layer");
            return;
        }
        if self.contains(&product_id) {
            warn!(%product_id, "Product was added by another request while fetching");
            return;
        }

        let len = self.layers.len();
        let index = match index {
            Some(i) if i > len => {
                warn!(requested = i, len, "Insertion index past end; appending");
                len
            }
            Some(i) => i,
            None => len,
        };

        let mut layer = TerrainLayer::new(raster.display_name, product_id);
        layer.thumbnail = raster.thumbnail;
        info!(index, product_id = %layer.product_id, "Added layer");
        self.layers.insert(index, layer);

        if self.started {
            self.reload_textures(index);
        }
    }

    fn complete_reload(&mut self, slot: usize, generation: u64, completion: FetchCompletion) {
        if self.slot_generation[slot] != generation {
            debug!(slot, "Discarding superseded texture");
            return;
        }
        match completion.result {
            Ok(raster) => {
                self.material.bind_texture(slot, raster.texture);
                if let Some(layer) = self.layers.get(slot) {
                    let opacity = layer.effective_opacity();
                    self.material.set_layer_opacity(slot, opacity);
                }
            }
            Err(err) => {
                warn!(slot, %err, "Texture reload failed; keeping previous texture");
            }
        }
    }

    /// First slot to reload after a reorder touching `index`: non-base
    /// layers, plus the base when it changed.
    fn reload_start(index: usize) -> usize {
        if index == 0 { 0 } else { 1 }
    }

    fn reload_textures(&mut self, from: usize) {
        for i in from..MAX_DIFFUSE_LAYERS {
            self.slot_generation[i] += 1;
            if let Some(layer) = self.layers.get(i) {
                let metadata = self.product_metadata(&layer.product_id);
                let generation = self.slot_generation[i];
                self.issue_fetch(
                    &metadata,
                    PendingFetch::Reload {
                        slot: i,
                        generation,
                    },
                );
            } else {
                self.material.clear_texture(i);
            }
        }
    }

    fn issue_fetch(&mut self, metadata: &TerrainProductMetadata, pending: PendingFetch) {
        self.next_ticket += 1;
        let ticket = FetchTicket(self.next_ticket);
        self.pending.insert(ticket, pending);
        let responder = FetchResponder::new(ticket, self.sender.clone());
        self.provider.fetch_texture(metadata, responder);
    }

    fn product_metadata(&self, product_id: &str) -> TerrainProductMetadata {
        TerrainProductMetadata {
            product_id: product_id.to_string(),
            bbox: self.bbox,
            width: self.target_size.x,
            height: self.target_size.y,
        }
    }

    fn contains(&self, product_id: &str) -> bool {
        self.layers.iter().any(|l| l.product_id == product_id)
    }
}
