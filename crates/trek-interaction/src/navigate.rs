//! Animated "navigate to" rotation of the globe.

use glam::{Quat, Vec3};
use trek_geo::{Transform, project_on_plane};

/// `transform`'s rotation turned about the view axis so the model's up
/// direction appears aligned with world up when seen from `relative_position`
/// (a position relative to the model center).
pub fn oriented_rotation(transform: &Transform, relative_position: Vec3) -> Quat {
    let projected_up = project_on_plane(transform.up(), relative_position);
    let relative_up = project_on_plane(Vec3::Y, relative_position);
    let (Some(from), Some(to), Some(view_axis)) = (
        projected_up.try_normalize(),
        relative_up.try_normalize(),
        relative_position.try_normalize(),
    ) else {
        // Looking straight up or down, or the model's up is on the view axis.
        return transform.rotation;
    };
    // Both vectors lie in the view plane, so the turn is about the view axis.
    let turn = if from.dot(to) < -1.0 + 1e-6 {
        Quat::from_axis_angle(view_axis, std::f32::consts::PI)
    } else {
        Quat::from_rotation_arc(from, to)
    };
    (turn * transform.rotation).normalize()
}

/// An in-progress rotation towards a destination orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Navigation {
    from: Quat,
    to: Quat,
    duration: f32,
    progress: f32,
}

impl Navigation {
    /// Plan a rotation that brings world-space `direction` (from the model
    /// center) to face `viewpoint`, then levels the model's up direction.
    ///
    /// The transform itself is not modified.
    pub fn plan(transform: &Transform, direction: Vec3, viewpoint: Vec3, duration: f32) -> Self {
        let to_view = viewpoint - transform.position;
        let mut axis = direction.cross(to_view);
        let angle = direction.angle_between(to_view);
        if axis.length_squared() < 1e-12 && angle > std::f32::consts::FRAC_PI_2 {
            // Target faces directly away: any axis perpendicular to the view works.
            axis = to_view.any_orthonormal_vector();
        }

        let mut destination = *transform;
        if angle.is_finite() {
            destination.rotate_world(axis, angle);
        }
        Self {
            from: transform.rotation,
            to: oriented_rotation(&destination, to_view),
            duration,
            progress: 0.0,
        }
    }

    /// Rotation at the start of the animation.
    pub fn start_rotation(&self) -> Quat {
        self.from
    }

    /// Rotation at the end of the animation.
    pub fn destination(&self) -> Quat {
        self.to
    }

    /// Fraction completed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Whether the destination has been reached.
    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }

    /// Advance by `dt` seconds and return the rotation to apply.
    ///
    /// Once finished the destination is returned exactly.
    pub fn advance(&mut self, dt: f32) -> Quat {
        if self.duration <= 0.0 {
            self.progress = 1.0;
        } else {
            self.progress = (self.progress + dt / self.duration).min(1.0);
        }
        if self.is_finished() {
            self.to
        } else {
            self.from.slerp(self.to, self.progress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trek_geo::{LatLon, lat_lon_to_direction};

    /// After the animation the target direction faces the viewpoint.
    #[test]
    fn test_target_faces_viewpoint() {
        let transform = Transform::default();
        let local = lat_lon_to_direction(LatLon::new(30.0, 60.0));
        let viewpoint = Vec3::new(0.0, 0.0, -4.0);
        let mut nav = Navigation::plan(&transform, transform.transform_direction(local), viewpoint, 1.0);

        let mut rotation = transform.rotation;
        for _ in 0..20 {
            rotation = nav.advance(0.1);
        }
        assert!(nav.is_finished());
        assert_eq!(rotation, nav.destination());
        let facing = rotation * local;
        assert!((facing - Vec3::NEG_Z).length() < 1e-4, "facing {facing:?}");
    }

    /// The destination keeps the model's up in the plane of world up.
    #[test]
    fn test_destination_is_upright() {
        let transform = Transform {
            position: Vec3::ZERO,
            rotation: Quat::from_rotation_z(0.7),
        };
        let viewpoint = Vec3::new(0.0, 0.0, -4.0);
        let nav = Navigation::plan(&transform, Vec3::X, viewpoint, 1.0);
        let up = nav.destination() * Vec3::Y;
        let projected = project_on_plane(up, viewpoint).normalize();
        assert!((projected - Vec3::Y).length() < 1e-4, "up {projected:?}");
    }

    #[test]
    fn test_plan_does_not_rotate() {
        let transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let nav = Navigation::plan(&transform, Vec3::X, Vec3::new(0.0, 0.0, 5.0), 1.0);
        assert_eq!(nav.start_rotation(), transform.rotation);
        assert_eq!(nav.progress(), 0.0);
    }

    #[test]
    fn test_midpoint_is_between() {
        let transform = Transform::default();
        let mut nav = Navigation::plan(&transform, Vec3::X, Vec3::new(0.0, 0.0, 5.0), 1.0);
        let mid = nav.advance(0.5);
        let total = nav.start_rotation().angle_between(nav.destination());
        assert!((mid.angle_between(nav.start_rotation()) - total / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_opposite_direction_still_navigates() {
        let transform = Transform::default();
        let mut nav = Navigation::plan(&transform, Vec3::Z, Vec3::new(0.0, 0.0, -3.0), 0.0);
        let rotation = nav.advance(0.0);
        assert!(((rotation * Vec3::Z) - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_oriented_rotation_looking_down_is_identity() {
        let transform = Transform::default();
        assert_eq!(oriented_rotation(&transform, Vec3::Y * 3.0), transform.rotation);
    }
}
