//! Camera interaction helpers for the interactive side.
//!
//! These only edit a [`RenderConfig`] or an orientation; callers apply them
//! under the controller lock and then request a render.

use facetrace_math::{Quat, Vec2, Vec3};

use crate::RenderConfig;

/// World units moved per unit of pointer motion when panning.
pub const PAN_SCALE: f32 = 0.05;

/// World units moved per unit of pointer motion when dollying.
pub const DOLLY_SCALE: f32 = 0.75;

/// Radius of the virtual trackball in normalized screen units.
const TRACKBALL_SIZE: f32 = 0.8;

/// Shift eye and look-at together in the x/y plane.
pub fn pan(config: &mut RenderConfig, dx: f32, dy: f32) {
    let offset = Vec3::new(PAN_SCALE * dx, PAN_SCALE * dy, 0.0);
    config.eye -= offset;
    config.look_at -= offset;
}

/// Move eye and look-at together along z.
pub fn dolly(config: &mut RenderConfig, dy: f32) {
    let offset = Vec3::new(0.0, 0.0, DOLLY_SCALE * dy);
    config.eye += offset;
    config.look_at += offset;
}

/// Compose a rotation delta onto the current orientation.
pub fn rotate(orientation: Quat, delta: Quat) -> Quat {
    (delta * orientation).normalize()
}

/// Rotation for a pointer drag from `from` to `to`.
///
/// Both points are in normalized screen coordinates, `[-1, 1]` with +y
/// up. Points near the center land on a sphere, points further out on a
/// hyperbolic sheet, so the rotation stays smooth at the edges.
pub fn trackball(from: Vec2, to: Vec2) -> Quat {
    if from == to {
        return Quat::IDENTITY;
    }

    let p1 = from.extend(project_to_sphere(TRACKBALL_SIZE, from));
    let p2 = to.extend(project_to_sphere(TRACKBALL_SIZE, to));

    let Some(axis) = p2.cross(p1).try_normalize() else {
        return Quat::IDENTITY;
    };

    let t = ((p1 - p2).length() / (2.0 * TRACKBALL_SIZE)).clamp(-1.0, 1.0);
    Quat::from_axis_angle(axis, 2.0 * t.asin())
}

fn project_to_sphere(radius: f32, p: Vec2) -> f32 {
    let d = p.length();
    if d < radius * std::f32::consts::FRAC_1_SQRT_2 {
        (radius * radius - d * d).sqrt()
    } else {
        let t = radius / std::f32::consts::SQRT_2;
        t * t / d
    }
}

/// Back to the default camera with no rotation.
pub fn reset(config: &mut RenderConfig, orientation: &mut Quat) {
    config.reset_camera();
    *orientation = Quat::IDENTITY;
}
