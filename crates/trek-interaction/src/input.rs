//! Controller input types and click timing.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use trek_config::InteractionConfig;
use trek_terrain::ModelId;

/// Identifies a tracked hand controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControllerId(pub u32);

/// World-space pose of a controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerPose {
    /// Controller position.
    pub position: Vec3,
    /// Controller orientation.
    pub rotation: Quat,
}

impl ControllerPose {
    /// Pose at `position` looking along `forward`.
    pub fn looking_at(position: Vec3, forward: Vec3) -> Self {
        let rotation = forward
            .try_normalize()
            .map_or(Quat::IDENTITY, |f| Quat::from_rotation_arc(Vec3::Z, f));
        Self { position, rotation }
    }

    /// Pointing direction (local +Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Result of the controller's pointer ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// World-space hit point.
    pub point: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
    /// Terrain model that was hit, if any.
    pub target: Option<ModelId>,
}

/// Lookup of the current controller poses, queried every tick.
pub trait PoseSource {
    /// Pose of `controller`, or `None` if it is not tracked.
    fn pose(&self, controller: ControllerId) -> Option<ControllerPose>;
}

impl<S: BuildHasher> PoseSource for HashMap<ControllerId, ControllerPose, S> {
    fn pose(&self, controller: ControllerId) -> Option<ControllerPose> {
        self.get(&controller).copied()
    }
}

/// Turns button presses and releases into clicks and double clicks.
///
/// A press held no longer than `max_press` is a click; two clicks within
/// `interval` form a double click.
#[derive(Clone, Debug)]
pub struct DoubleClickDetector {
    interval: Duration,
    max_press: Duration,
    pressed_at: Option<Instant>,
    last_click: Option<Instant>,
}

impl DoubleClickDetector {
    /// Detector with explicit timings.
    pub fn new(interval: Duration, max_press: Duration) -> Self {
        Self {
            interval,
            max_press,
            pressed_at: None,
            last_click: None,
        }
    }

    /// Detector using the configured timings.
    pub fn from_config(config: &InteractionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.double_click_interval_ms),
            Duration::from_millis(config.double_click_max_press_ms),
        )
    }

    /// Record a button press.
    pub fn press(&mut self, now: Instant) {
        self.pressed_at = Some(now);
    }

    /// Record a button release. Returns `true` if it completed a double click.
    pub fn release(&mut self, now: Instant) -> bool {
        let Some(pressed_at) = self.pressed_at.take() else {
            return false;
        };
        if now.saturating_duration_since(pressed_at) > self.max_press {
            self.last_click = None;
            return false;
        }
        match self.last_click {
            Some(last) if now.saturating_duration_since(last) <= self.interval => {
                self.last_click = None;
                true
            }
            _ => {
                self.last_click = Some(now);
                false
            }
        }
    }
}
