//! Lateral motion integrator.
//!
//! Turns camera-relative intent into a horizontal velocity with
//! state-dependent acceleration, constant drag and a state-dependent speed
//! cap, then re-attaches the vertical speed and handles sliding along steep
//! surfaces while airborne.

use bevy::prelude::*;

use crate::config::{ControllerConfig, LateralProfile};
use crate::detection::is_steep;
use crate::state::MovementState;

/// Camera forward/right projected onto the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    /// Horizontal forward, normalized or zero.
    pub forward: Vec3,
    /// Horizontal right, normalized or zero.
    pub right: Vec3,
}

impl CameraBasis {
    /// Flatten world-space camera vectors.
    ///
    /// A camera looking straight up or down has no horizontal forward; the
    /// flattened vector is then zero instead of NaN.
    pub fn from_vectors(forward: Vec3, right: Vec3) -> Self {
        Self {
            forward: flatten(forward),
            right: flatten(right),
        }
    }

    /// Read the basis from a camera transform.
    pub fn from_transform(transform: &Transform) -> Self {
        Self::from_vectors(*transform.forward(), *transform.right())
    }

    /// World-space direction for a movement axis (`x` strafes, `y` advances).
    #[inline]
    pub fn direction(&self, movement: Vec2) -> Vec3 {
        self.right * movement.x + self.forward * movement.y
    }
}

/// Project onto the horizontal plane and normalize, zero if degenerate.
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Subtract `drag * dt` along the velocity, snapping to zero once the
/// velocity is slower than that.
pub fn apply_drag(velocity: Vec3, drag: f32, dt: f32) -> Vec3 {
    let step = drag * dt;
    if velocity.length() > step {
        velocity - velocity.normalize_or_zero() * step
    } else {
        Vec3::ZERO
    }
}

/// Integrate the horizontal velocity for one tick.
///
/// Acceleration and drag come first; the speed cap is applied last.
pub fn integrate_lateral(
    previous: Vec3,
    direction: Vec3,
    profile: LateralProfile,
    drag: f32,
    dt: f32,
) -> Vec3 {
    let horizontal = Vec3::new(previous.x, 0.0, previous.z);
    let accelerated = horizontal + direction * profile.acceleration * dt;
    let dragged = apply_drag(accelerated, drag, dt);
    let capped = dragged.clamp_length_max(profile.speed_cap);
    Vec3::new(capped.x, 0.0, capped.z)
}

/// Slide along a steep surface while descending into it.
///
/// When the surface is steeper than `slope_limit` and the vertical speed is
/// negative, the component along the normal is removed.
pub fn slide_on_steep_surface(
    velocity: Vec3,
    normal: Vec3,
    slope_limit: f32,
    vertical_speed: f32,
) -> Vec3 {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO || vertical_speed >= 0.0 || !is_steep(normal, slope_limit) {
        return velocity;
    }
    velocity - normal * velocity.dot(normal)
}

/// Full lateral step: horizontal integration, vertical re-attachment and,
/// while airborne, steep-surface sliding.
pub fn lateral_velocity(
    previous: Vec3,
    state: MovementState,
    movement: Vec2,
    basis: &CameraBasis,
    vertical_speed: f32,
    surface_normal: Vec3,
    config: &ControllerConfig,
    dt: f32,
) -> Vec3 {
    let profile = config.lateral_profile(state);
    let direction = basis.direction(movement);

    let mut velocity = integrate_lateral(previous, direction, profile, config.drag, dt);
    velocity.y = vertical_speed;

    if state.is_airborne() {
        velocity = slide_on_steep_surface(velocity, surface_normal, config.slope_limit, vertical_speed);
    }
    velocity
}
