//! The terrain registry: scene-wide terrain settings and notifications.
//!
//! Models query the registry for global settings during `init`/`tick` and
//! listen for changes through an explicit observer list.

use tracing::debug;

/// Identifies a terrain model instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u64);

/// Handle returned by [`TerrainRegistry::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Notifications broadcast to registry observers.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryEvent {
    /// The global height exaggeration changed.
    HeightExaggerationChanged(f32),
    /// A model finished updating its collision mesh.
    PhysicsMeshUpdated(ModelId),
    /// A different model (or none) is now shown.
    VisibleModelChanged(Option<ModelId>),
}

/// Registry observer callback.
pub type RegistryObserver = Box<dyn FnMut(&RegistryEvent)>;

/// Scene-wide terrain state shared by all models.
pub trait TerrainRegistry {
    /// The model currently shown, if any.
    fn current_visible_model(&self) -> Option<ModelId>;

    /// Whether the global sphere is the model being shown.
    fn is_globe_visible(&self) -> bool;

    /// Height exaggeration every model should converge to.
    fn global_height_exaggeration(&self) -> f32;

    /// Whether layer textures are rendered.
    fn textures_enabled(&self) -> bool;

    /// Whether terrain interaction is enabled.
    fn interaction_enabled(&self) -> bool;

    /// Called by a model after its collision mesh changed.
    fn report_physics_mesh_updated(&mut self, model: ModelId);

    /// Register an observer. Keep the id to unsubscribe on disposal.
    fn subscribe(&mut self, observer: RegistryObserver) -> SubscriptionId;

    /// Remove an observer. Returns `false` if it was not registered.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// In-process [`TerrainRegistry`].
pub struct InMemoryRegistry {
    globe: Option<ModelId>,
    visible: Option<ModelId>,
    height_exaggeration: f32,
    textures_enabled: bool,
    interaction_enabled: bool,
    physics_updates: Vec<ModelId>,
    observers: Vec<(SubscriptionId, RegistryObserver)>,
    next_subscription: u64,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl InMemoryRegistry {
    /// Registry with textures and interaction enabled.
    pub fn new(height_exaggeration: f32) -> Self {
        Self {
            globe: None,
            visible: None,
            height_exaggeration,
            textures_enabled: true,
            interaction_enabled: true,
            physics_updates: Vec::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    fn notify(&mut self, event: RegistryEvent) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }

    /// Designate the global sphere model.
    pub fn set_globe(&mut self, model: ModelId) {
        self.globe = Some(model);
    }

    /// Change the shown model and notify observers.
    pub fn set_visible_model(&mut self, model: Option<ModelId>) {
        if self.visible != model {
            self.visible = model;
            self.notify(RegistryEvent::VisibleModelChanged(model));
        }
    }

    /// Change the global height exaggeration and notify observers.
    pub fn set_height_exaggeration(&mut self, scale: f32) {
        if self.height_exaggeration != scale {
            self.height_exaggeration = scale;
            debug!(scale, "Global height exaggeration changed");
            self.notify(RegistryEvent::HeightExaggerationChanged(scale));
        }
    }

    /// Toggle texture rendering. Applies to models started afterwards.
    pub fn set_textures_enabled(&mut self, enabled: bool) {
        self.textures_enabled = enabled;
    }

    /// Toggle terrain interaction. Applies to models started afterwards.
    pub fn set_interaction_enabled(&mut self, enabled: bool) {
        self.interaction_enabled = enabled;
    }

    /// Every physics-mesh report received, oldest first.
    pub fn physics_updates(&self) -> &[ModelId] {
        &self.physics_updates
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl TerrainRegistry for InMemoryRegistry {
    fn current_visible_model(&self) -> Option<ModelId> {
        self.visible
    }

    fn is_globe_visible(&self) -> bool {
        self.globe.is_some() && self.visible == self.globe
    }

    fn global_height_exaggeration(&self) -> f32 {
        self.height_exaggeration
    }

    fn textures_enabled(&self) -> bool {
        self.textures_enabled
    }

    fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    fn report_physics_mesh_updated(&mut self, model: ModelId) {
        self.physics_updates.push(model);
        self.notify(RegistryEvent::PhysicsMeshUpdated(model));
    }

    fn subscribe(&mut self, observer: RegistryObserver) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, observer));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }
}
