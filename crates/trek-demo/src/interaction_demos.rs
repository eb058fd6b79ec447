//! Scripted controller input for the demo session.

use std::time::{Duration, Instant};

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::info;
use trek_config::InteractionConfig;
use trek_geo::LatLon;
use trek_interaction::{
    Activity, ControllerId, ControllerPose, DoubleClickDetector, GlobeController, RayHit,
    Selection, grab_point_distance,
};
use trek_terrain::TerrainModel;

const RIGHT_HAND: ControllerId = ControllerId(1);

/// Head position the globe is navigated towards.
const VIEWPOINT: Vec3 = Vec3::new(0.0, 0.3, -2.5);

/// Gale crater.
const NAVIGATE_TARGET: LatLon = LatLon {
    lat: -5.4,
    lon: 137.8,
};

/// Drives a [`GlobeController`] with a fixed timeline of controller input.
pub struct InteractionSession {
    controller: GlobeController,
    clicks: DoubleClickDetector,
    poses: FxHashMap<ControllerId, ControllerPose>,
    step: u32,
}

impl InteractionSession {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            controller: GlobeController::new(config),
            clicks: DoubleClickDetector::from_config(config),
            poses: FxHashMap::default(),
            step: 0,
        }
    }

    pub fn on_model_ready(&mut self, globe: &mut TerrainModel) {
        self.controller.on_model_shown(globe);
        self.controller.overlay_mut().visible = true;
        self.controller.on_model_initialized();
        info!(overlay = self.controller.overlay().is_shown(), "Controller attached");
    }

    /// Cast the controller ray against the globe's bounding sphere.
    fn ray_hit(pose: &ControllerPose, globe: &TerrainModel) -> RayHit {
        let center = globe.transform().position;
        let radius = globe.mesh_metadata().map_or(1.0, |m| m.radius);
        let distance = grab_point_distance(pose.position, pose.forward(), center, radius);
        RayHit {
            point: pose.position + pose.forward() * distance,
            distance,
            target: Some(globe.id()),
        }
    }

    fn aim(&mut self, position: Vec3, target: Vec3) -> ControllerPose {
        let pose = ControllerPose::looking_at(position, target - position);
        self.poses.insert(RIGHT_HAND, pose);
        pose
    }

    pub fn tick(&mut self, dt: f32, globe: &mut TerrainModel) {
        let step = self.step;
        self.step += 1;

        match step {
            // Grab the near side and drag sideways.
            0 => {
                let pose = self.aim(Vec3::new(0.0, 0.0, -2.5), Vec3::ZERO);
                let hit = Self::ray_hit(&pose, globe);
                self.controller.on_trigger_down(RIGHT_HAND, &pose, &hit, globe);
                info!(grab = ?self.controller.grab_state(), "Trigger down");
            }
            1..60 => {
                let x = step as f32 * 0.01;
                self.aim(Vec3::new(x, 0.0, -2.5), Vec3::new(x, 0.0, 0.0));
            }
            60 => {
                self.controller.on_trigger_up(RIGHT_HAND);
                info!(rotation = ?globe.transform().rotation, "Drag finished");
            }
            // Double click on the surface navigates there.
            70 => {
                let pose = self.aim(Vec3::new(0.2, 0.4, -2.5), Vec3::ZERO);
                let hit = Self::ray_hit(&pose, globe);
                let t0 = Instant::now();
                self.clicks.press(t0);
                self.clicks.release(t0 + Duration::from_millis(60));
                self.clicks.press(t0 + Duration::from_millis(150));
                if self.clicks.release(t0 + Duration::from_millis(210)) {
                    self.controller.on_trigger_double_click(&hit, VIEWPOINT, globe);
                    info!("Double click: navigating to hit point");
                }
            }
            140 => {
                self.controller.navigate_to_lat_lon(NAVIGATE_TARGET, VIEWPOINT, globe);
                info!(target = ?NAVIGATE_TARGET, "Navigating to coordinate");
            }
            // Measure a distance between two picked points.
            210 => {
                self.controller.switch_to_activity(Activity::Distance, globe);
                for target in [Vec3::new(-0.2, 0.1, 0.0), Vec3::new(0.3, -0.2, 0.0)] {
                    let pose = self.aim(Vec3::new(0.0, 0.0, -2.5), target);
                    let hit = Self::ray_hit(&pose, globe);
                    self.controller.on_trigger_down(RIGHT_HAND, &pose, &hit, globe);
                }
                for selection in self.controller.take_selections() {
                    if let Selection::Path { points, .. } = selection {
                        let length_m = self
                            .controller
                            .path_selector()
                            .path_length(globe.radius().unwrap_or_default());
                        info!(?points, length_m, "Distance measured");
                    }
                }
                self.controller.switch_to_activity(Activity::Disabled, globe);
                self.controller.switch_to_activity(Activity::Default, globe);
            }
            _ => {}
        }

        self.controller.tick(dt, &self.poses, globe);
    }
}
