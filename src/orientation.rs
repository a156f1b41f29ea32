//! Orientation controller.
//!
//! Integrates look input into camera yaw/pitch and turns the body toward
//! the camera. Angles are in degrees; yaw is clockwise seen from above and
//! positive pitch looks down.
//!
//! A moving character keeps following the camera. An idle one stays put
//! until the camera has swung past [`ControllerConfig::rotation_tolerance`],
//! then turns for [`ControllerConfig::rotate_to_target_time`] seconds in the
//! direction of the mismatch.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::lateral::flatten;

/// Rotation for a yaw/pitch pair in degrees.
pub fn yaw_pitch_rotation(yaw: f32, pitch: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, -yaw.to_radians(), -pitch.to_radians(), 0.0)
}

/// Rotation for a yaw in degrees.
#[inline]
pub fn yaw_rotation(yaw: f32) -> Quat {
    Quat::from_rotation_y(-yaw.to_radians())
}

/// Signed horizontal angle from `from` to `to` in degrees, positive when
/// `to` lies clockwise of `from` seen from above.
///
/// Returns zero when either vector has no horizontal component.
pub fn signed_yaw_between(from: Vec3, to: Vec3) -> f32 {
    let from = flatten(from);
    let to = flatten(to);
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return 0.0;
    }
    let angle = from.dot(to).clamp(-1.0, 1.0).acos().to_degrees();
    let clockwise = from.cross(to).dot(Vec3::Y) < 0.0;
    if clockwise {
        angle
    } else {
        -angle
    }
}

/// Camera and body orientation state for one character.
///
/// `rotation_mismatch` and `is_rotating_to_target` are published for the
/// animation collaborator.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct OrientationState {
    /// Camera yaw, unbounded.
    pub camera_yaw: f32,
    /// Camera pitch, clamped to the look limit.
    pub camera_pitch: f32,
    /// Yaw the body is turning toward.
    pub target_yaw: f32,
    /// Signed angle from body forward to camera forward.
    pub rotation_mismatch: f32,
    /// Whether an idle turn is in progress.
    pub is_rotating_to_target: bool,
    /// Direction of the current idle turn.
    pub rotating_clockwise: bool,
    /// Remaining time of the current idle turn.
    pub rotate_timer: f32,
}

/// Rotations produced by one orientation update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationOutput {
    pub camera_rotation: Quat,
    pub body_rotation: Quat,
}

impl OrientationState {
    /// Start with camera and body facing the given yaw.
    pub fn facing(yaw: f32) -> Self {
        Self {
            camera_yaw: yaw,
            target_yaw: yaw,
            ..default()
        }
    }

    /// Advance one tick.
    ///
    /// The mismatch used to decide idle turning is the one measured at the
    /// end of the previous update; it is refreshed last.
    pub fn update(
        &mut self,
        look: Vec2,
        body_rotation: Quat,
        is_idling: bool,
        config: &ControllerConfig,
        dt: f32,
    ) -> OrientationOutput {
        let yaw_delta = config.look_sense_h * look.x;
        self.camera_yaw += yaw_delta;
        self.camera_pitch = (self.camera_pitch - config.look_sense_v * look.y)
            .clamp(-config.look_limit_v, config.look_limit_v);
        self.target_yaw += yaw_delta;

        self.is_rotating_to_target = self.rotate_timer > 0.0;

        let mut body = body_rotation;
        if !is_idling {
            body = self.rotate_toward_target(body, config, dt);
        } else if self.rotation_mismatch.abs() > config.rotation_tolerance || self.is_rotating_to_target {
            body = self.idle_rotation(body, config, dt);
        }

        let camera_rotation = yaw_pitch_rotation(self.camera_yaw, self.camera_pitch);
        self.rotation_mismatch = signed_yaw_between(body * Vec3::NEG_Z, camera_rotation * Vec3::NEG_Z);

        OrientationOutput {
            camera_rotation,
            body_rotation: body,
        }
    }

    fn idle_rotation(&mut self, body: Quat, config: &ControllerConfig, dt: f32) -> Quat {
        if self.rotation_mismatch.abs() > config.rotation_tolerance {
            self.rotate_timer = config.rotate_to_target_time;
            self.rotating_clockwise = self.rotation_mismatch > config.rotation_tolerance;
        }
        self.rotate_timer -= dt;

        // Keep turning only until the body passes the camera.
        let still_behind = if self.rotating_clockwise {
            self.rotation_mismatch > 0.0
        } else {
            self.rotation_mismatch < 0.0
        };
        if still_behind {
            self.rotate_toward_target(body, config, dt)
        } else {
            body
        }
    }

    fn rotate_toward_target(&self, body: Quat, config: &ControllerConfig, dt: f32) -> Quat {
        let t = (config.rotation_speed * dt).clamp(0.0, 1.0);
        body.slerp(yaw_rotation(self.target_yaw), t).normalize()
    }
}
