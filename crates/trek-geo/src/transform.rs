//! Position and orientation of a terrain model in the scene.

use glam::{Quat, Vec3};

/// World-space placement of a terrain model. Scale is baked into the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Model center.
    pub position: Vec3,
    /// Model orientation.
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Transform at `position` with no rotation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Model-local direction expressed in world space.
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// World-space direction expressed in model-local space.
    pub fn inverse_transform_direction(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * world
    }

    /// The model's local +Y axis in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Rotate about a world-space axis through the model center.
    ///
    /// A zero-length axis leaves the rotation unchanged.
    pub fn rotate_world(&mut self, axis: Vec3, angle: f32) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.rotation = (Quat::from_axis_angle(axis, angle) * self.rotation).normalize();
    }
}
