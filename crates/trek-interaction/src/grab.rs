//! Grab-to-rotate geometry.
//!
//! A primary grab keeps the grabbed surface point under the controller ray:
//! the point stays at the original grab radius from the model center and is
//! re-solved every tick as the nearer intersection of the ray with that
//! sphere. A secondary grab applies the controller's own rotation delta.

use glam::{Quat, Vec3};
use trek_geo::distance_point_segment;

use crate::input::{ControllerId, ControllerPose};

/// Continuous manipulation in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrabState {
    /// Nothing grabbed.
    Idle,
    /// Trigger grab: rotate so the grab point follows the controller ray.
    Primary {
        /// Grabbing controller.
        controller: ControllerId,
        /// Current world-space grab point.
        grab_point: Vec3,
        /// Distance from the model center to the initial grab point.
        grab_radius: f32,
    },
    /// Grip grab: rotate with the controller.
    Secondary {
        /// Grabbing controller.
        controller: ControllerId,
        /// Controller orientation at the previous tick.
        rotation: Quat,
    },
}

impl GrabState {
    /// `true` for [`GrabState::Primary`].
    pub fn is_primary(&self) -> bool {
        matches!(self, GrabState::Primary { .. })
    }

    /// `true` for [`GrabState::Secondary`].
    pub fn is_secondary(&self) -> bool {
        matches!(self, GrabState::Secondary { .. })
    }
}

/// Distance along the controller ray to the grab sphere.
///
/// Solves `t² − (2d·cosθ)t + (d² − r²) = 0`, where `d` is the distance from
/// the controller to the center and `θ` the angle between the ray and that
/// direction, taking the smaller non-negative root. A ray that misses the
/// sphere yields the closest approach.
pub fn grab_point_distance(controller: Vec3, forward: Vec3, center: Vec3, radius: f32) -> f32 {
    let to_center = center - controller;
    let d = to_center.length();
    let cos_theta = match (to_center.try_normalize(), forward.try_normalize()) {
        (Some(a), Some(b)) => a.dot(b),
        _ => 1.0,
    };
    let b = -2.0 * d * cos_theta;
    let c = d * d - radius * radius;
    let root = (b * b - 4.0 * c).max(0.0).sqrt();
    let near = (-b - root) / 2.0;
    if near >= 0.0 {
        near
    } else {
        ((-b + root) / 2.0).max(0.0)
    }
}

/// Whether the controller ray has slipped off the grab sphere.
///
/// Compares the distance from `center` to the ray segment of length `reach`
/// against `grab_radius`.
pub fn grab_lost(pose: &ControllerPose, center: Vec3, reach: f32, grab_radius: f32) -> bool {
    let end = pose.position + pose.forward() * reach;
    distance_point_segment(center, pose.position, end) > grab_radius
}

/// Rotation carrying the center-relative direction of `from` onto that of `to`.
pub fn drag_rotation(center: Vec3, from: Vec3, to: Vec3) -> Quat {
    match ((from - center).try_normalize(), (to - center).try_normalize()) {
        (Some(a), Some(b)) => Quat::from_rotation_arc(a, b),
        _ => Quat::IDENTITY,
    }
}

/// Model rotation after a secondary-grab tick.
pub fn grip_rotation(model: Quat, previous_controller: Quat, controller: Quat) -> Quat {
    (controller * previous_controller.inverse() * model).normalize()
}
