//! Globe interaction controller.
//!
//! Routes controller input to the active [`Activity`]: grab and navigate in
//! `Default`, point picking in the selection activities, nothing while
//! `Disabled`. Continuous manipulation is applied in [`GlobeController::tick`].

use glam::Vec3;
use tracing::{debug, info};
use trek_config::InteractionConfig;
use trek_geo::{LatLon, Transform, lat_lon_to_direction};
use trek_terrain::{ModelId, TerrainModel};

use crate::activity::Activity;
use crate::grab::{GrabState, drag_rotation, grab_lost, grab_point_distance, grip_rotation};
use crate::input::{ControllerId, ControllerPose, PoseSource, RayHit};
use crate::navigate::Navigation;
use crate::overlay::CoordinateOverlay;
use crate::selection::{BoundingBoxSelector, PathMode, PathSelector, Selection, SelectionController};

/// Scene object the controller manipulates.
pub trait Interactable {
    /// Identifier matched against [`RayHit::target`].
    fn id(&self) -> ModelId;

    /// Current placement.
    fn transform(&self) -> &Transform;

    /// Mutable placement.
    fn transform_mut(&mut self) -> &mut Transform;

    /// Toggle the collision volume used for ray casts.
    fn set_collider_enabled(&mut self, enabled: bool);
}

impl Interactable for TerrainModel {
    fn id(&self) -> ModelId {
        TerrainModel::id(self)
    }

    fn transform(&self) -> &Transform {
        TerrainModel::transform(self)
    }

    fn transform_mut(&mut self) -> &mut Transform {
        TerrainModel::transform_mut(self)
    }

    fn set_collider_enabled(&mut self, enabled: bool) {
        TerrainModel::set_collider_enabled(self, enabled);
    }
}

/// Activity state machine plus grab, navigate and selection handling for one
/// globe.
#[derive(Debug)]
pub struct GlobeController {
    activity: Activity,
    bbox_selector: BoundingBoxSelector,
    path_selector: PathSelector,
    overlay: CoordinateOverlay,
    grab: GrabState,
    navigation: Option<Navigation>,
    selections: Vec<Selection>,
    max_grab_distance: f32,
    navigate_duration: f32,
}

impl GlobeController {
    /// Controller in the default activity with nothing grabbed or selected.
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            activity: Activity::Default,
            bbox_selector: BoundingBoxSelector::default(),
            path_selector: PathSelector::default(),
            overlay: CoordinateOverlay::default(),
            grab: GrabState::Idle,
            navigation: None,
            selections: Vec::new(),
            max_grab_distance: config.max_grab_distance,
            navigate_duration: config.navigate_duration_s,
        }
    }

    /// The active interaction mode.
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Which controllers currently hold the globe.
    pub fn grab_state(&self) -> GrabState {
        self.grab
    }

    /// The running navigate-to animation, if any.
    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    /// Lat/lon readout under the cursor.
    pub fn overlay(&self) -> &CoordinateOverlay {
        &self.overlay
    }

    /// Mutable access to the readout, e.g. to toggle its visibility.
    pub fn overlay_mut(&mut self) -> &mut CoordinateOverlay {
        &mut self.overlay
    }

    /// Selector used by [`Activity::BoundingBoxSelection`].
    pub fn bbox_selector(&self) -> &BoundingBoxSelector {
        &self.bbox_selector
    }

    /// Selector shared by the distance and height-profile activities.
    pub fn path_selector(&self) -> &PathSelector {
        &self.path_selector
    }

    /// Take the selections completed since the last call.
    pub fn take_selections(&mut self) -> Vec<Selection> {
        std::mem::take(&mut self.selections)
    }

    /// Switch interaction mode, applying exit and entry side effects.
    pub fn switch_to_activity(&mut self, next: Activity, model: &mut dyn Interactable) {
        let previous = self.activity;
        if next == previous {
            return;
        }

        if previous.is_selection() {
            self.bbox_selector.set_enabled(false);
            self.path_selector.set_enabled(false);
        }
        if previous == Activity::Disabled {
            model.set_collider_enabled(true);
            self.overlay.force_hidden = false;
        }

        match next {
            Activity::BoundingBoxSelection => self.bbox_selector.set_enabled(true),
            Activity::Distance => {
                self.path_selector.set_mode(PathMode::Distance);
                self.path_selector.set_enabled(true);
            }
            Activity::HeightProfile => {
                self.path_selector.set_mode(PathMode::HeightProfile);
                self.path_selector.set_enabled(true);
            }
            Activity::Disabled => {
                model.set_collider_enabled(false);
                self.overlay.force_hidden = true;
                self.grab = GrabState::Idle;
                self.navigation = None;
            }
            Activity::Default | Activity::SunAngle => {}
        }

        self.activity = next;
        info!(?previous, ?next, "Switched activity");
    }

    /// A model became the visible one: start over in the default activity.
    pub fn on_model_shown(&mut self, model: &mut dyn Interactable) {
        self.switch_to_activity(Activity::Default, model);
    }

    /// The model finished loading; overlays may show unless interaction is off.
    pub fn on_model_initialized(&mut self) {
        if self.activity != Activity::Disabled {
            self.overlay.force_hidden = false;
        }
    }

    fn active_selector(&mut self) -> Option<&mut dyn SelectionController> {
        match self.activity {
            Activity::BoundingBoxSelection => Some(&mut self.bbox_selector),
            Activity::Distance | Activity::HeightProfile => Some(&mut self.path_selector),
            _ => None,
        }
    }

    fn hits_model(hit: &RayHit, model: &dyn Interactable) -> bool {
        hit.target.is_none_or(|target| target == model.id())
    }

    /// Trigger pressed with the pointer on `hit`.
    pub fn on_trigger_down(
        &mut self,
        sender: ControllerId,
        pose: &ControllerPose,
        hit: &RayHit,
        model: &dyn Interactable,
    ) {
        if !Self::hits_model(hit, model) {
            return;
        }
        let center = model.transform().position;
        match self.activity {
            Activity::Default => {
                if hit.distance > self.max_grab_distance {
                    debug!(distance = hit.distance, "Grab rejected: too far");
                    return;
                }
                if self.grab.is_secondary() {
                    debug!("Grab rejected: secondary grab active");
                    return;
                }
                let grab_radius = (hit.point - center).length();
                self.grab = GrabState::Primary {
                    controller: sender,
                    grab_point: hit.point,
                    grab_radius,
                };
                self.navigation = None;
                debug!(?sender, grab_radius, controller = ?pose.position, "Primary grab started");
            }
            activity if activity.is_selection() => {
                let local = model.transform().inverse_transform_direction(hit.point - center);
                if let Some(selection) = self
                    .active_selector()
                    .and_then(|selector| selector.make_selection(local))
                {
                    self.selections.push(selection);
                }
            }
            _ => {}
        }
    }

    /// Trigger released.
    pub fn on_trigger_up(&mut self, sender: ControllerId) {
        if matches!(self.grab, GrabState::Primary { controller, .. } if controller == sender) {
            self.grab = GrabState::Idle;
            debug!(?sender, "Primary grab released");
        }
    }

    /// Trigger double click: navigate the hit point towards `viewpoint`.
    pub fn on_trigger_double_click(&mut self, hit: &RayHit, viewpoint: Vec3, model: &dyn Interactable) {
        if self.activity != Activity::Default || !Self::hits_model(hit, model) {
            return;
        }
        self.navigate_to_direction(hit.point - model.transform().position, viewpoint, model);
    }

    /// Grip pressed with the pointer on `hit`.
    pub fn on_grip_down(&mut self, sender: ControllerId, pose: &ControllerPose, hit: &RayHit) {
        if self.activity != Activity::Default {
            return;
        }
        if hit.distance > self.max_grab_distance || self.grab.is_primary() {
            debug!(distance = hit.distance, "Grip rejected");
            return;
        }
        self.grab = GrabState::Secondary {
            controller: sender,
            rotation: pose.rotation,
        };
        self.navigation = None;
        debug!(?sender, "Secondary grab started");
    }

    /// Grip released.
    pub fn on_grip_up(&mut self, sender: ControllerId) {
        if matches!(self.grab, GrabState::Secondary { controller, .. } if controller == sender) {
            self.grab = GrabState::Idle;
            debug!(?sender, "Secondary grab released");
        }
    }

    /// Pointer moved over the model.
    pub fn on_cursor_over(&mut self, hit: &RayHit, model: &dyn Interactable) {
        if !Self::hits_model(hit, model) {
            return;
        }
        let local = model
            .transform()
            .inverse_transform_direction(hit.point - model.transform().position);
        if let Some(selector) = self.active_selector() {
            selector.update_cursor(local);
        }
    }

    /// Start rotating the model so `coord` faces `viewpoint`.
    pub fn navigate_to_lat_lon(&mut self, coord: LatLon, viewpoint: Vec3, model: &dyn Interactable) {
        let direction = model.transform().transform_direction(lat_lon_to_direction(coord));
        self.navigate_to_direction(direction, viewpoint, model);
    }

    /// Start rotating the model so world-space `direction` faces `viewpoint`.
    pub fn navigate_to_direction(&mut self, direction: Vec3, viewpoint: Vec3, model: &dyn Interactable) {
        let navigation = Navigation::plan(model.transform(), direction, viewpoint, self.navigate_duration);
        debug!(?direction, ?viewpoint, "Navigation started");
        self.navigation = Some(navigation);
    }

    /// Advance navigation and any active grab by `dt` seconds.
    pub fn tick(&mut self, dt: f32, poses: &dyn PoseSource, model: &mut dyn Interactable) {
        if let Some(navigation) = self.navigation.as_mut() {
            model.transform_mut().rotation = navigation.advance(dt);
            if navigation.is_finished() {
                self.navigation = None;
                debug!("Navigation finished");
            }
        }

        match self.grab {
            GrabState::Idle => {}
            GrabState::Primary {
                controller,
                grab_point,
                grab_radius,
            } => {
                let Some(pose) = poses.pose(controller) else {
                    self.grab = GrabState::Idle;
                    return;
                };
                let center = model.transform().position;
                if grab_lost(&pose, center, self.max_grab_distance, grab_radius) {
                    debug!(?controller, "Primary grab lost");
                    self.grab = GrabState::Idle;
                    return;
                }
                let forward = pose.forward();
                let t = grab_point_distance(pose.position, forward, center, grab_radius);
                let new_point = pose.position + forward * t;
                let transform = model.transform_mut();
                transform.rotation =
                    (drag_rotation(center, grab_point, new_point) * transform.rotation).normalize();
                self.grab = GrabState::Primary {
                    controller,
                    grab_point: new_point,
                    grab_radius,
                };
            }
            GrabState::Secondary { controller, rotation } => {
                let Some(pose) = poses.pose(controller) else {
                    self.grab = GrabState::Idle;
                    return;
                };
                let transform = model.transform_mut();
                transform.rotation = grip_rotation(transform.rotation, rotation, pose.rotation);
                self.grab = GrabState::Secondary {
                    controller,
                    rotation: pose.rotation,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;
    use trek_config::TerrainConfig;
    use trek_terrain::{NoiseElevation, TerrainVariant};

    const LEFT: ControllerId = ControllerId(0);
    const RIGHT: ControllerId = ControllerId(1);

    struct Globe {
        transform: Transform,
        collider: bool,
    }

    impl Globe {
        fn new() -> Self {
            Self {
                transform: Transform::default(),
                collider: true,
            }
        }
    }

    impl Interactable for Globe {
        fn id(&self) -> ModelId {
            ModelId(7)
        }

        fn transform(&self) -> &Transform {
            &self.transform
        }

        fn transform_mut(&mut self) -> &mut Transform {
            &mut self.transform
        }

        fn set_collider_enabled(&mut self, enabled: bool) {
            self.collider = enabled;
        }
    }

    fn controller() -> GlobeController {
        GlobeController::new(&InteractionConfig::default())
    }

    fn hit(point: Vec3, distance: f32) -> RayHit {
        RayHit {
            point,
            distance,
            target: Some(ModelId(7)),
        }
    }

    fn poses(entries: &[(ControllerId, ControllerPose)]) -> FxHashMap<ControllerId, ControllerPose> {
        entries.iter().copied().collect()
    }

    /// The grab follows the ray while it stays on the grab sphere and is
    /// released on the first tick it slips off.
    #[test]
    fn test_primary_grab_release_on_slip() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let start = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        ctrl.on_trigger_down(LEFT, &start, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0), &globe);
        assert!(ctrl.grab_state().is_primary());

        let moved = ControllerPose::looking_at(Vec3::new(0.5, 0.0, -5.0), Vec3::Z);
        ctrl.tick(0.016, &poses(&[(LEFT, moved)]), &mut globe);
        assert!(ctrl.grab_state().is_primary());
        let rotated = globe.transform.rotation;
        assert_ne!(rotated, Quat::IDENTITY);
        let grabbed = rotated * Vec3::NEG_Z;
        assert!((grabbed - Vec3::new(0.5, 0.0, -0.866)).length() < 1e-3, "grabbed {grabbed:?}");

        let off = ControllerPose::looking_at(Vec3::new(1.2, 0.0, -5.0), Vec3::Z);
        ctrl.tick(0.016, &poses(&[(LEFT, off)]), &mut globe);
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
        assert_eq!(globe.transform.rotation, rotated, "no rotation on release tick");
    }

    #[test]
    fn test_grab_rejected_when_too_far() {
        let globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -13.0), Vec3::Z);
        ctrl.on_trigger_down(LEFT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 12.0), &globe);
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
    }

    #[test]
    fn test_grab_ignores_other_models() {
        let globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let mut other = hit(Vec3::new(0.0, 0.0, -1.0), 4.0);
        other.target = Some(ModelId(99));
        ctrl.on_trigger_down(LEFT, &pose, &other, &globe);
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
    }

    /// Primary and secondary grabs exclude each other.
    #[test]
    fn test_grabs_are_exclusive() {
        let globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let surface = hit(Vec3::new(0.0, 0.0, -1.0), 4.0);

        ctrl.on_grip_down(RIGHT, &pose, &surface);
        assert!(ctrl.grab_state().is_secondary());
        ctrl.on_trigger_down(LEFT, &pose, &surface, &globe);
        assert!(ctrl.grab_state().is_secondary());

        ctrl.on_grip_up(LEFT);
        assert!(ctrl.grab_state().is_secondary(), "only the grabbing controller releases");
        ctrl.on_grip_up(RIGHT);
        ctrl.on_trigger_down(LEFT, &pose, &surface, &globe);
        assert!(ctrl.grab_state().is_primary());
        ctrl.on_grip_down(RIGHT, &pose, &surface);
        assert!(ctrl.grab_state().is_primary());
        ctrl.on_trigger_up(LEFT);
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
    }

    #[test]
    fn test_secondary_grab_follows_controller() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose {
            position: Vec3::new(0.0, 0.0, -5.0),
            rotation: Quat::IDENTITY,
        };
        ctrl.on_grip_down(RIGHT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0));

        let turned = ControllerPose {
            rotation: Quat::from_rotation_y(0.5),
            ..pose
        };
        ctrl.tick(0.016, &poses(&[(RIGHT, turned)]), &mut globe);
        assert!(globe.transform.rotation.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);

        // Holding still applies no further rotation.
        ctrl.tick(0.016, &poses(&[(RIGHT, turned)]), &mut globe);
        assert!(globe.transform.rotation.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);
    }

    #[test]
    fn test_untracked_controller_releases() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        ctrl.on_trigger_down(LEFT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0), &globe);
        ctrl.tick(0.016, &poses(&[]), &mut globe);
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
    }

    /// Navigation ends exactly on the planned destination.
    #[test]
    fn test_navigate_reaches_destination() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let viewpoint = Vec3::new(0.0, 1.0, -4.0);
        ctrl.navigate_to_lat_lon(LatLon::new(45.0, -120.0), viewpoint, &globe);
        assert_eq!(globe.transform.rotation, Quat::IDENTITY, "not applied at call time");
        let destination = ctrl.navigation().map(Navigation::destination).unwrap();

        for _ in 0..100 {
            ctrl.tick(0.05, &poses(&[]), &mut globe);
        }
        assert!(ctrl.navigation().is_none());
        assert_eq!(globe.transform.rotation, destination);
    }

    #[test]
    fn test_double_click_navigates_only_in_default() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let surface = hit(Vec3::X, 4.0);
        ctrl.switch_to_activity(Activity::Distance, &mut globe);
        ctrl.on_trigger_double_click(&surface, Vec3::new(0.0, 0.0, -4.0), &globe);
        assert!(ctrl.navigation().is_none());

        ctrl.switch_to_activity(Activity::Default, &mut globe);
        ctrl.on_trigger_double_click(&surface, Vec3::new(0.0, 0.0, -4.0), &globe);
        assert!(ctrl.navigation().is_some());
    }

    #[test]
    fn test_grab_cancels_navigation() {
        let globe = Globe::new();
        let mut ctrl = controller();
        ctrl.navigate_to_direction(Vec3::X, Vec3::new(0.0, 0.0, -4.0), &globe);
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        ctrl.on_trigger_down(LEFT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0), &globe);
        assert!(ctrl.navigation().is_none());
    }

    #[test]
    fn test_disabled_hides_and_restores() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        ctrl.overlay_mut().visible = true;
        ctrl.on_model_initialized();
        assert!(ctrl.overlay().is_shown());

        ctrl.switch_to_activity(Activity::Disabled, &mut globe);
        assert!(!globe.collider);
        assert!(!ctrl.overlay().is_shown());
        ctrl.on_model_initialized();
        assert!(!ctrl.overlay().is_shown(), "stays hidden while disabled");

        ctrl.switch_to_activity(Activity::Default, &mut globe);
        assert!(globe.collider);
        assert!(ctrl.overlay().is_shown());
    }

    #[test]
    fn test_disabled_ignores_input() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        ctrl.switch_to_activity(Activity::Disabled, &mut globe);
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        ctrl.on_trigger_down(LEFT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0), &globe);
        ctrl.on_grip_down(RIGHT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0));
        assert_eq!(ctrl.grab_state(), GrabState::Idle);
    }

    /// Leaving a selection activity disarms and clears its selector.
    #[test]
    fn test_selection_activity_switching() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        ctrl.switch_to_activity(Activity::HeightProfile, &mut globe);
        assert!(ctrl.path_selector().is_enabled());
        assert_eq!(ctrl.path_selector().mode(), PathMode::HeightProfile);
        ctrl.on_trigger_down(LEFT, &pose, &hit(Vec3::new(0.0, 0.0, -1.0), 4.0), &globe);
        assert_eq!(ctrl.path_selector().points().len(), 1);

        ctrl.switch_to_activity(Activity::BoundingBoxSelection, &mut globe);
        assert!(!ctrl.path_selector().is_enabled());
        assert!(ctrl.path_selector().points().is_empty());
        assert!(ctrl.bbox_selector().is_enabled());

        ctrl.switch_to_activity(Activity::Distance, &mut globe);
        assert!(!ctrl.bbox_selector().is_enabled());
        assert_eq!(ctrl.path_selector().mode(), PathMode::Distance);
    }

    /// Selections use model-local directions, so a rotated globe still yields
    /// the coordinates under the pointer.
    #[test]
    fn test_bbox_selection_on_rotated_globe() {
        let mut globe = Globe::new();
        globe.transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut ctrl = controller();
        ctrl.switch_to_activity(Activity::BoundingBoxSelection, &mut globe);
        let pose = ControllerPose::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let a = lat_lon_to_direction(LatLon::new(10.0, 20.0));
        let b = lat_lon_to_direction(LatLon::new(-10.0, 40.0));
        let rotation = globe.transform.rotation;
        ctrl.on_cursor_over(&hit(rotation * b, 4.0), &globe);
        ctrl.on_trigger_down(LEFT, &pose, &hit(rotation * a, 4.0), &globe);
        assert!(ctrl.bbox_selector().first_corner().is_some());
        ctrl.on_trigger_down(LEFT, &pose, &hit(rotation * b, 4.0), &globe);

        let selections = ctrl.take_selections();
        assert_eq!(selections.len(), 1);
        let Selection::BoundingBox(bbox) = &selections[0] else {
            panic!("expected a bounding box");
        };
        assert!((bbox.west - 20.0).abs() < 1e-3, "west {}", bbox.west);
        assert!((bbox.north - 10.0).abs() < 1e-3);
        assert!(ctrl.take_selections().is_empty());
    }

    #[test]
    fn test_new_controller_is_idle() {
        let ctrl = controller();
        assert_eq!(ctrl.activity(), Activity::Default);
        assert!(matches!(ctrl.grab_state(), GrabState::Idle));
        assert!(ctrl.navigation().is_none());
        assert!(ctrl.bbox_selector().preview().is_none());
        assert!(!ctrl.bbox_selector().is_enabled());
        assert!(!ctrl.path_selector().is_enabled());
    }

    #[test]
    fn test_model_shown_resets_activity() {
        let mut globe = Globe::new();
        let mut ctrl = controller();
        ctrl.switch_to_activity(Activity::SunAngle, &mut globe);
        ctrl.on_model_shown(&mut globe);
        assert_eq!(ctrl.activity(), Activity::Default);
    }

    #[test]
    fn test_terrain_model_is_interactable() {
        let mut model = TerrainModel::new(
            ModelId(3),
            TerrainVariant::Globe,
            &TerrainConfig::default(),
            Arc::new(NoiseElevation::default()),
        );
        let mut ctrl = controller();
        ctrl.switch_to_activity(Activity::Disabled, &mut model);
        assert!(!model.collider_enabled());
        ctrl.switch_to_activity(Activity::Default, &mut model);
        assert!(model.collider_enabled());
    }
}
