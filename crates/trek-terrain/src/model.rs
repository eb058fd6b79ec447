//! Terrain model lifecycle: configuration, mesh generation, height rescaling,
//! and the debounced physics mesh.
//!
//! A model is driven explicitly: configure it, attach a [`LayerStack`], call
//! [`TerrainModel::init`] once, then [`TerrainModel::tick`] every frame until
//! [`TerrainModel::dispose`]. Mesh work happens on a background worker; all
//! results are applied inside `tick`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use tracing::{debug, error, info, warn};
use trek_config::TerrainConfig;
use trek_geo::{BoundingBox, Transform};
use trek_layers::LayerStack;

use crate::elevation::ElevationSource;
use crate::error::TerrainError;
use crate::generator::{GeneratedMesh, RescaledVertices};
use crate::lod::{LodGroup, RenderMesh};
use crate::mesh_data::TerrainMeshMetadata;
use crate::registry::{ModelId, RegistryEvent, SubscriptionId, TerrainRegistry};
use crate::rescale::{Debounced, RescaleState};
use crate::variant::TerrainVariant;
use crate::worker::{MeshJob, MeshOutput, MeshWorker};

/// Callback run once a model's meshes are ready.
pub type InitCallback = Box<dyn FnOnce(ModelId)>;

/// Progress of [`TerrainModel::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitState {
    /// `init` has not been called.
    NotStarted,
    /// Meshes are being generated.
    InProgress,
    /// Meshes are built and rescaling is possible.
    Ready,
    /// Elevation data could not be loaded.
    Failed,
    /// Resources were released by `dispose`.
    Disposed,
}

/// One displayed terrain: the globe or a local patch.
pub struct TerrainModel {
    id: ModelId,
    variant: TerrainVariant,
    dem_id: String,
    bounding_box: Option<BoundingBox>,
    radius_m: Option<f64>,
    model_scale: f32,
    lod_levels: u32,
    base_downsample: u32,
    physics_downsample: i32,
    dem_target_size: u32,
    lod_coefficient: f32,
    elevation: Arc<dyn ElevationSource>,
    layers: Option<LayerStack>,
    transform: Transform,
    collider_enabled: bool,
    visible: bool,
    last_visible: Option<u64>,
    state: InitState,
    worker: Option<MeshWorker>,
    reference: Option<Arc<GeneratedMesh>>,
    lod_group: Option<LodGroup>,
    physics_mesh: Option<RenderMesh>,
    rescale: RescaleState,
    physics_update: Debounced<Vec<Vec3>>,
    event_sender: Sender<RegistryEvent>,
    event_receiver: Receiver<RegistryEvent>,
    subscription: Option<SubscriptionId>,
    init_callbacks: Vec<InitCallback>,
}

impl TerrainModel {
    /// Create an uninitialized model with generation defaults from `config`.
    ///
    /// The globe covers the whole planet at the configured radius with the
    /// global DEM; a local patch needs its DEM, bounding box and radius set
    /// before `init`.
    pub fn new(
        id: ModelId,
        variant: TerrainVariant,
        config: &TerrainConfig,
        elevation: Arc<dyn ElevationSource>,
    ) -> Self {
        let (bounding_box, radius_m, dem_id) = match variant {
            TerrainVariant::Globe => (
                Some(BoundingBox::GLOBAL),
                Some(config.globe_radius_m),
                config.global_dem_id.clone(),
            ),
            TerrainVariant::LocalPatch => (None, None, String::new()),
        };
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        Self {
            id,
            variant,
            dem_id,
            bounding_box,
            radius_m,
            model_scale: config.model_scale,
            lod_levels: variant.lod_levels(config),
            base_downsample: config.base_downsample,
            physics_downsample: variant.physics_downsample(config),
            dem_target_size: config.dem_target_size,
            lod_coefficient: variant.lod_coefficient(config),
            elevation,
            layers: None,
            transform: Transform::default(),
            collider_enabled: true,
            visible: true,
            last_visible: None,
            state: InitState::NotStarted,
            worker: None,
            reference: None,
            lod_group: None,
            physics_mesh: None,
            rescale: RescaleState::default(),
            physics_update: Debounced::new(config.physics_update_delay_s),
            event_sender,
            event_receiver,
            subscription: None,
            init_callbacks: Vec::new(),
        }
    }

    /// Model identifier.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Globe or local patch.
    pub fn variant(&self) -> TerrainVariant {
        self.variant
    }

    /// Initialization progress.
    pub fn init_state(&self) -> InitState {
        self.state
    }

    /// Whether meshes have been built.
    pub fn is_ready(&self) -> bool {
        self.state == InitState::Ready
    }

    // --- Configuration ---

    fn configurable(&self, what: &str) -> bool {
        if self.state == InitState::NotStarted {
            true
        } else {
            warn!(model = self.id.0, what, "Ignoring change after initialization");
            false
        }
    }

    /// Elevation product id.
    pub fn dem_id(&self) -> &str {
        &self.dem_id
    }

    /// Set the elevation product. Ignored after `init`.
    pub fn set_dem_id(&mut self, dem_id: impl Into<String>) {
        if self.configurable("dem id") {
            self.dem_id = dem_id.into();
        }
    }

    /// Area the model covers.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    /// Set the covered area. Ignored after `init`.
    pub fn set_bounding_box(&mut self, bbox: BoundingBox) {
        if self.configurable("bounding box") {
            self.bounding_box = Some(bbox);
        }
    }

    /// Planet radius in meters.
    pub fn radius(&self) -> Option<f64> {
        self.radius_m
    }

    /// Set the planet radius in meters. Ignored after `init`.
    pub fn set_radius(&mut self, radius_m: f64) {
        if self.configurable("radius") {
            self.radius_m = Some(radius_m);
        }
    }

    /// LOD levels beyond level 0.
    pub fn lod_levels(&self) -> u32 {
        self.lod_levels
    }

    /// Set the LOD level count, clamped to zero. Ignored after `init`.
    pub fn set_lod_levels(&mut self, levels: i32) {
        if self.configurable("lod levels") {
            self.lod_levels = levels.max(0) as u32;
        }
    }

    /// Downsample level of LOD 0.
    pub fn base_downsample(&self) -> u32 {
        self.base_downsample
    }

    /// Set the LOD 0 downsample level, clamped to zero. Ignored after `init`.
    pub fn set_base_downsample(&mut self, level: i32) {
        if self.configurable("base downsample") {
            self.base_downsample = level.max(0) as u32;
        }
    }

    /// Physics mesh downsample level; negative for no physics mesh.
    pub fn physics_downsample(&self) -> i32 {
        self.physics_downsample
    }

    /// Set the physics downsample level. Ignored after `init`.
    pub fn set_physics_downsample(&mut self, level: i32) {
        if self.configurable("physics downsample") {
            self.physics_downsample = level;
        }
    }

    /// Attach the model's layer stack. Only allowed once, before `init`.
    pub fn attach_layer_stack(&mut self, stack: LayerStack) -> Result<(), TerrainError> {
        if self.state != InitState::NotStarted {
            return Err(TerrainError::InitAlreadyStarted);
        }
        if self.layers.is_some() {
            return Err(TerrainError::LayerStackAlreadyAttached);
        }
        self.layers = Some(stack);
        Ok(())
    }

    /// The attached layer stack.
    pub fn layers(&self) -> Option<&LayerStack> {
        self.layers.as_ref()
    }

    /// The attached layer stack, mutably.
    pub fn layers_mut(&mut self) -> Option<&mut LayerStack> {
        self.layers.as_mut()
    }

    // --- Scene state ---

    /// World placement.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World placement, mutably.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Whether the collision volume takes part in ray casts.
    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    /// Enable or disable the collision volume.
    pub fn set_collider_enabled(&mut self, enabled: bool) {
        self.collider_enabled = enabled;
    }

    /// Whether the model is shown.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Unix time in milliseconds of the last hidden-to-shown transition.
    pub fn last_visible(&self) -> Option<u64> {
        self.last_visible
    }

    /// Show or hide the model. Returns `true` if it was just shown.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        if !visible {
            self.visible = false;
            return false;
        }
        if self.visible {
            return false;
        }
        self.visible = true;
        self.last_visible = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis() as u64);
        true
    }

    // --- Meshes ---

    /// The LOD group, once generated.
    pub fn lod_group(&self) -> Option<&LodGroup> {
        self.lod_group.as_ref()
    }

    /// The collision mesh, if the model has one.
    pub fn physics_mesh(&self) -> Option<&RenderMesh> {
        self.physics_mesh.as_ref()
    }

    /// Generation parameters in model units.
    ///
    /// `None` until both bounding box and radius are set.
    pub fn mesh_metadata(&self) -> Option<TerrainMeshMetadata> {
        Some(TerrainMeshMetadata {
            dem_id: self.dem_id.clone(),
            bounding_box: self.bounding_box?,
            radius: (self.radius_m? * f64::from(self.model_scale)) as f32,
            height_scale: self.model_scale,
            lod_levels: self.lod_levels,
            base_downsample: self.base_downsample,
            physics_downsample: self.physics_downsample,
            dem_target_size: self.dem_target_size,
        })
    }

    /// Latest height exaggeration requested and started.
    pub fn height_scale(&self) -> f32 {
        self.rescale.height_scale()
    }

    /// Exaggeration waiting to be applied.
    pub fn pending_height_scale(&self) -> Option<f32> {
        self.rescale.pending()
    }

    /// Whether a rescale is running or waiting.
    pub fn is_rescaling(&self) -> bool {
        self.rescale.is_in_flight() || self.rescale.pending().is_some()
    }

    /// Whether an updated physics mesh is waiting out the debounce delay.
    pub fn is_physics_update_pending(&self) -> bool {
        self.physics_update.is_pending()
    }

    /// Run `callback` once the meshes are ready, immediately if they already are.
    pub fn on_initialized(&mut self, callback: InitCallback) {
        if self.state == InitState::Ready {
            callback(self.id);
        } else {
            self.init_callbacks.push(callback);
        }
    }

    // --- Lifecycle ---

    /// Start generating meshes and begin rendering the layer stack.
    ///
    /// Requires a layer stack, bounding box and radius. The model then moves
    /// towards the registry's global height exaggeration through the normal
    /// rescale path.
    pub fn init(&mut self, registry: &mut dyn TerrainRegistry) -> Result<(), TerrainError> {
        if self.state != InitState::NotStarted {
            warn!(model = self.id.0, state = ?self.state, "Terrain model already initialized");
            return Ok(());
        }
        if self.layers.is_none() {
            return Err(TerrainError::MissingLayerStack);
        }
        let bbox = self.bounding_box.ok_or(TerrainError::MissingBoundingBox)?;
        if self.radius_m.is_none() {
            return Err(TerrainError::MissingRadius);
        }
        let metadata = self
            .mesh_metadata()
            .ok_or(TerrainError::MissingBoundingBox)?;
        let worker = MeshWorker::spawn()?;

        let sender = self.event_sender.clone();
        self.subscription = Some(registry.subscribe(Box::new(move |event: &RegistryEvent| {
            if matches!(event, RegistryEvent::HeightExaggerationChanged(_)) {
                let _ = sender.send(event.clone());
            }
        })));

        if let Some(layers) = self.layers.as_mut() {
            if let Err(err) = layers.set_bounding_box(bbox) {
                warn!(%err, "Layer stack bounding box not applied");
            }
            layers.start(registry.textures_enabled(), registry.interaction_enabled());
        }

        info!(
            model = self.id.0,
            variant = ?self.variant,
            dem_id = %metadata.dem_id,
            bbox = %bbox,
            lod_levels = metadata.lod_levels,
            "Generating terrain mesh"
        );
        worker.submit(MeshJob::Generate {
            variant: self.variant,
            metadata,
            source: Arc::clone(&self.elevation),
        });
        self.worker = Some(worker);
        self.state = InitState::InProgress;

        self.request_rescale(registry.global_height_exaggeration());
        Ok(())
    }

    /// Request a new height exaggeration. NaN is ignored; requests made while
    /// a rescale is running coalesce to the latest one. A failed model has no
    /// mesh to rescale and drops the request.
    pub fn request_rescale(&mut self, scale: f32) {
        if self.state == InitState::Failed {
            debug!(model = self.id.0, scale, "Ignoring rescale of failed terrain model");
            return;
        }
        let ready = self.state == InitState::Ready;
        if let Some(scale) = self.rescale.request(scale, ready) {
            self.start_rescale(scale);
        }
    }

    fn start_rescale(&mut self, scale: f32) {
        let (Some(worker), Some(reference), Some(metadata)) =
            (&self.worker, &self.reference, self.mesh_metadata())
        else {
            self.rescale.complete();
            return;
        };
        debug!(model = self.id.0, scale, "Rescaling terrain height");
        let submitted = worker.submit(MeshJob::Rescale {
            variant: self.variant,
            reference: Arc::clone(reference),
            radius: metadata.radius,
            scale,
        });
        if !submitted {
            self.rescale.complete();
        }
    }

    /// Per-frame update: layer fetches, registry events, worker results,
    /// pending rescale and the physics debounce.
    pub fn tick(&mut self, dt: f32, registry: &mut dyn TerrainRegistry) {
        if matches!(self.state, InitState::NotStarted | InitState::Disposed) {
            return;
        }

        if let Some(layers) = self.layers.as_mut() {
            layers.tick();
        }

        while let Ok(event) = self.event_receiver.try_recv() {
            if let RegistryEvent::HeightExaggerationChanged(scale) = event {
                self.request_rescale(scale);
            }
        }

        let outputs = self
            .worker
            .as_ref()
            .map(MeshWorker::drain_outputs)
            .unwrap_or_default();
        for output in outputs {
            match output {
                MeshOutput::Generated(Ok(mesh)) => self.process_mesh_data(mesh),
                MeshOutput::Generated(Err(err)) => {
                    error!(model = self.id.0, %err, "Failed to generate terrain mesh");
                    self.state = InitState::Failed;
                    self.rescale.reset();
                }
                MeshOutput::Rescaled(vertices) => self.apply_rescaled(vertices),
            }
        }

        if let Some(pending) = self.rescale.pending() {
            self.request_rescale(pending);
        }

        if let Some(vertices) = self.physics_update.tick(dt) {
            self.update_physics_mesh(vertices, registry);
        }
    }

    fn process_mesh_data(&mut self, mesh: GeneratedMesh) {
        let material = self.layers.as_ref().map(|l| l.material().id());
        let meshes = mesh
            .levels
            .iter()
            .map(|level| RenderMesh::from_data(level, material))
            .collect();
        let group = LodGroup::new(meshes, self.lod_coefficient);
        self.physics_mesh = mesh
            .physics
            .as_ref()
            .map(|data| RenderMesh::from_data(data, None));
        info!(
            model = self.id.0,
            levels = group.len(),
            lod_enabled = group.is_enabled(),
            physics = self.physics_mesh.is_some(),
            "Terrain mesh ready"
        );
        self.lod_group = Some(group);
        self.reference = Some(Arc::new(mesh));
        self.state = InitState::Ready;

        for callback in std::mem::take(&mut self.init_callbacks) {
            callback(self.id);
        }
    }

    fn apply_rescaled(&mut self, vertices: RescaledVertices) {
        self.rescale.complete();
        if let Some(group) = self.lod_group.as_mut() {
            group.set_positions(vertices.levels);
        }
        debug!(model = self.id.0, scale = vertices.scale, "Applied height rescale");
        if let Some(physics) = vertices.physics {
            self.physics_update.schedule(physics);
        }
    }

    fn update_physics_mesh(&mut self, vertices: Vec<Vec3>, registry: &mut dyn TerrainRegistry) {
        let Some(mesh) = self.physics_mesh.as_mut() else {
            return;
        };
        if mesh.set_positions(vertices) {
            debug!(model = self.id.0, "Updated physics mesh");
            registry.report_physics_mesh_updated(self.id);
        }
    }

    /// Release meshes, layer textures and the worker, and unsubscribe from the registry.
    pub fn dispose(&mut self, registry: &mut dyn TerrainRegistry) {
        if let Some(id) = self.subscription.take() {
            registry.unsubscribe(id);
        }
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        if let Some(layers) = self.layers.as_mut() {
            layers.dispose();
        }
        self.lod_group = None;
        self.physics_mesh = None;
        self.reference = None;
        self.rescale.reset();
        self.physics_update.clear();
        self.init_callbacks.clear();
        self.state = InitState::Disposed;
        info!(model = self.id.0, "Disposed terrain model");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use trek_config::LayerConfig;
    use trek_layers::MemoryTextureProvider;

    use crate::elevation::{ElevationError, ElevationGrid};
    use crate::registry::InMemoryRegistry;

    struct ConstantSource(f32);

    impl ElevationSource for ConstantSource {
        fn sample(
            &self,
            _dem_id: &str,
            _bbox: &BoundingBox,
            width: u32,
            height: u32,
        ) -> Result<ElevationGrid, ElevationError> {
            Ok(ElevationGrid::flat(width, height, self.0))
        }
    }

    struct MissingSource;

    impl ElevationSource for MissingSource {
        fn sample(
            &self,
            dem_id: &str,
            _bbox: &BoundingBox,
            _width: u32,
            _height: u32,
        ) -> Result<ElevationGrid, ElevationError> {
            Err(ElevationError::UnknownDem(dem_id.to_string()))
        }
    }

    /// Radius 1.0 and 0.1 units of terrain at 1x.
    fn test_config() -> TerrainConfig {
        TerrainConfig {
            globe_radius_m: 1_000_000.0,
            model_scale: 1e-6,
            globe_lod_levels: 2,
            local_lod_levels: 0,
            globe_physics_downsample: 2,
            dem_target_size: 16,
            ..Default::default()
        }
    }

    fn layer_stack() -> LayerStack {
        LayerStack::new(
            Box::new(MemoryTextureProvider::new()),
            LayerConfig::default(),
        )
    }

    fn globe() -> TerrainModel {
        let mut model = TerrainModel::new(
            ModelId(1),
            TerrainVariant::Globe,
            &test_config(),
            Arc::new(ConstantSource(100_000.0)),
        );
        model.attach_layer_stack(layer_stack()).unwrap();
        model
    }

    fn tick_until(
        model: &mut TerrainModel,
        registry: &mut InMemoryRegistry,
        mut done: impl FnMut(&TerrainModel) -> bool,
    ) {
        let start = Instant::now();
        while !done(model) {
            assert!(
                start.elapsed() < Duration::from_secs(10),
                "terrain model did not converge"
            );
            model.tick(0.016, registry);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn surface_radius(model: &TerrainModel) -> f32 {
        model.lod_group().unwrap().mesh(0).unwrap().positions()[0].length()
    }

    fn settled(model: &TerrainModel) -> bool {
        model.is_ready() && !model.is_rescaling()
    }

    #[test]
    fn test_init_requires_layer_stack() {
        let mut model = TerrainModel::new(
            ModelId(1),
            TerrainVariant::Globe,
            &test_config(),
            Arc::new(ConstantSource(0.0)),
        );
        let mut registry = InMemoryRegistry::default();
        assert!(matches!(
            model.init(&mut registry),
            Err(TerrainError::MissingLayerStack)
        ));
        assert_eq!(model.init_state(), InitState::NotStarted);
    }

    #[test]
    fn test_local_patch_requires_bbox_and_radius() {
        let mut model = TerrainModel::new(
            ModelId(2),
            TerrainVariant::LocalPatch,
            &test_config(),
            Arc::new(ConstantSource(0.0)),
        );
        model.attach_layer_stack(layer_stack()).unwrap();
        let mut registry = InMemoryRegistry::default();
        assert!(matches!(
            model.init(&mut registry),
            Err(TerrainError::MissingBoundingBox)
        ));
        model.set_bounding_box(BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap());
        assert!(matches!(
            model.init(&mut registry),
            Err(TerrainError::MissingRadius)
        ));
        assert_eq!(registry.observer_count(), 0, "failed init must not subscribe");
    }

    #[test]
    fn test_layer_stack_attach_rules() {
        let mut model = globe();
        assert!(matches!(
            model.attach_layer_stack(layer_stack()),
            Err(TerrainError::LayerStackAlreadyAttached)
        ));

        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        assert!(matches!(
            model.attach_layer_stack(layer_stack()),
            Err(TerrainError::InitAlreadyStarted)
        ));
    }

    /// `lod_levels + 1` meshes, all sharing the layer material.
    #[test]
    fn test_init_builds_lod_group() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        assert!(model.layers().unwrap().is_started());
        tick_until(&mut model, &mut registry, |m| m.is_ready());

        let material = model.layers().unwrap().material().id();
        let group = model.lod_group().unwrap();
        assert_eq!(group.len(), 3);
        assert!(group.is_enabled());
        assert!(group.levels().iter().all(|l| l.mesh.material() == Some(material)));
        assert_eq!(model.physics_mesh().unwrap().positions().len(), 16);
        assert!((surface_radius(&model) - 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_zero_lod_levels_disable_switching() {
        let mut model = globe();
        model.set_lod_levels(-3);
        assert_eq!(model.lod_levels(), 0);
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, |m| m.is_ready());
        let group = model.lod_group().unwrap();
        assert_eq!(group.len(), 1);
        assert!(!group.is_enabled());
    }

    /// The initial exaggeration waits for the mesh, then converges.
    #[test]
    fn test_init_applies_global_exaggeration() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::new(2.0);
        model.init(&mut registry).unwrap();
        assert_eq!(model.pending_height_scale(), Some(2.0));
        tick_until(&mut model, &mut registry, settled);
        assert_eq!(model.height_scale(), 2.0);
        assert!((surface_radius(&model) - 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_nan_rescale_ignored() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, settled);

        model.request_rescale(f32::NAN);
        assert!(!model.is_rescaling());
        model.tick(0.016, &mut registry);
        assert_eq!(model.height_scale(), 1.0);
        assert!((surface_radius(&model) - 1.1).abs() < 1e-4);
    }

    /// Two rapid requests end at the second scale.
    #[test]
    fn test_rapid_requests_converge_to_last() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, settled);

        model.request_rescale(2.0);
        model.request_rescale(3.0);
        assert_eq!(model.pending_height_scale(), Some(3.0));
        tick_until(&mut model, &mut registry, settled);
        assert_eq!(model.height_scale(), 3.0);
        assert!((surface_radius(&model) - 1.3).abs() < 1e-4);
    }

    #[test]
    fn test_registry_change_triggers_rescale() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, settled);

        registry.set_height_exaggeration(0.5);
        model.tick(0.016, &mut registry);
        tick_until(&mut model, &mut registry, settled);
        assert_eq!(model.height_scale(), 0.5);
        assert!((surface_radius(&model) - 1.05).abs() < 1e-4);
    }

    /// The physics mesh only follows after the debounce delay.
    #[test]
    fn test_physics_mesh_debounced() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, settled);

        model.request_rescale(2.0);
        tick_until(&mut model, &mut registry, settled);
        assert!(model.is_physics_update_pending());
        assert!(registry.physics_updates().is_empty());

        model.tick(0.3, &mut registry);
        model.tick(0.3, &mut registry);
        assert!(registry.physics_updates().is_empty());
        model.tick(0.0, &mut registry);
        assert_eq!(registry.physics_updates(), [ModelId(1)]);
        let physics_radius = model.physics_mesh().unwrap().positions()[0].length();
        assert!((physics_radius - 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_elevation_failure_marks_failed() {
        let mut model = TerrainModel::new(
            ModelId(5),
            TerrainVariant::Globe,
            &test_config(),
            Arc::new(MissingSource),
        );
        model.attach_layer_stack(layer_stack()).unwrap();
        let mut registry = InMemoryRegistry::new(2.0);
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, |m| {
            m.init_state() == InitState::Failed
        });
        assert!(model.lod_group().is_none());
        assert!(!model.is_rescaling());
    }

    /// Exaggeration changes after a failed load are dropped instead of waiting
    /// for a mesh that never arrives.
    #[test]
    fn test_failed_model_drops_rescale_requests() {
        let mut model = TerrainModel::new(
            ModelId(6),
            TerrainVariant::Globe,
            &test_config(),
            Arc::new(MissingSource),
        );
        model.attach_layer_stack(layer_stack()).unwrap();
        let mut registry = InMemoryRegistry::new(2.0);
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, |m| {
            m.init_state() == InitState::Failed
        });

        registry.set_height_exaggeration(4.0);
        model.tick(0.016, &mut registry);
        assert!(!model.is_rescaling());
        assert_eq!(model.pending_height_scale(), None);

        model.request_rescale(5.0);
        model.tick(0.016, &mut registry);
        assert!(!model.is_rescaling());
        assert_eq!(model.pending_height_scale(), None);
        assert_eq!(model.init_state(), InitState::Failed);
    }

    #[test]
    fn test_setters_ignored_after_init() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        model.set_lod_levels(7);
        model.set_radius(5.0);
        model.set_dem_id("other");
        assert_eq!(model.lod_levels(), 2);
        assert_eq!(model.radius(), Some(1_000_000.0));
        assert_eq!(model.dem_id(), test_config().global_dem_id);
    }

    #[test]
    fn test_init_callbacks() {
        let mut model = globe();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        model.on_initialized(Box::new(move |id| {
            assert_eq!(id, ModelId(1));
            c.set(c.get() + 1);
        }));
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, |m| m.is_ready());
        assert_eq!(calls.get(), 1);

        let c = Rc::clone(&calls);
        model.on_initialized(Box::new(move |_| c.set(c.get() + 1)));
        assert_eq!(calls.get(), 2, "late subscribers run immediately");
    }

    #[test]
    fn test_visibility_timestamp() {
        let mut model = globe();
        assert!(!model.set_visible(true), "already visible");
        assert_eq!(model.last_visible(), None);
        model.set_visible(false);
        assert!(model.set_visible(true));
        assert!(model.last_visible().is_some());
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut model = globe();
        let mut registry = InMemoryRegistry::default();
        model.init(&mut registry).unwrap();
        tick_until(&mut model, &mut registry, |m| m.is_ready());
        assert_eq!(registry.observer_count(), 1);

        model.dispose(&mut registry);
        assert_eq!(registry.observer_count(), 0);
        assert!(model.lod_group().is_none());
        assert_eq!(model.init_state(), InitState::Disposed);
        assert!(model.layers().unwrap().material().slot(0).texture.is_none());

        registry.set_height_exaggeration(4.0);
        model.tick(0.016, &mut registry);
        assert_eq!(model.height_scale(), 1.0);
    }
}
