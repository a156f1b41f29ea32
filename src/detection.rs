//! Grounding probe.
//!
//! Ground support is judged asymmetrically:
//! - While in a grounded state, an overlap of the sphere below the feet is
//!   enough. Slope legality is left to lateral handling, so small ground
//!   irregularities never flicker the character into the air.
//! - While airborne, the body must report contact *and* the surface under it
//!   must be within the slope limit, so the character cannot land on a
//!   steep face.

use bevy::prelude::*;

use crate::collision::GroundSensors;
use crate::state::MovementState;

/// Result of the grounding probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Whether the character's base is supported.
    pub grounded: bool,
    /// Surface normal under the character, world up if nothing was found.
    pub normal: Vec3,
}

impl Default for GroundContact {
    fn default() -> Self {
        Self::NONE
    }
}

impl GroundContact {
    /// No ground found.
    pub const NONE: Self = Self {
        grounded: false,
        normal: Vec3::Y,
    };
}

/// Angle between a surface normal and world up, in degrees.
///
/// Zero-length normals are treated as world up.
pub fn surface_angle(normal: Vec3) -> f32 {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return 0.0;
    }
    normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Whether a surface is steeper than the slope limit (degrees).
#[inline]
pub fn is_steep(normal: Vec3, slope_limit: f32) -> bool {
    surface_angle(normal) > slope_limit
}

/// Classify support for the current state from the raw sensor readings.
pub fn probe_ground(state: MovementState, sensors: &GroundSensors, slope_limit: f32) -> GroundContact {
    let normal = sensors.normal();

    let grounded = if state.is_grounded() {
        sensors.overlap
    } else {
        sensors.body_grounded && !is_steep(normal, slope_limit)
    };

    GroundContact { grounded, normal }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn tilted(degrees: f32) -> Vec3 {
        Quat::from_rotation_x(degrees.to_radians()) * Vec3::Y
    }

    #[test]
    fn surface_angle_of_flat_ground_is_zero() {
        assert!(surface_angle(Vec3::Y).abs() < 1e-4);
        assert!((surface_angle(Vec3::X) - 90.0).abs() < 1e-4);
        assert_eq!(surface_angle(Vec3::ZERO), 0.0);
    }

    #[test]
    fn grounded_state_trusts_overlap_even_on_steep_surface() {
        let sensors = GroundSensors {
            overlap: true,
            surface_normal: Some(tilted(70.0)),
            body_grounded: false,
        };
        let contact = probe_ground(MovementState::Running, &sensors, 45.0);
        assert!(contact.grounded);
    }

    #[test]
    fn grounded_state_without_overlap_loses_support() {
        let sensors = GroundSensors {
            overlap: false,
            surface_normal: None,
            body_grounded: true,
        };
        let contact = probe_ground(MovementState::Idling, &sensors, 45.0);
        assert_eq!(contact, GroundContact::NONE);
    }

    #[test]
    fn airborne_lands_on_walkable_slope() {
        let sensors = GroundSensors {
            overlap: true,
            surface_normal: Some(tilted(30.0)),
            body_grounded: true,
        };
        let contact = probe_ground(MovementState::Falling, &sensors, 45.0);
        assert!(contact.grounded);
        assert!((surface_angle(contact.normal) - 30.0).abs() < 1e-3);
    }

    #[test]
    fn airborne_rejects_steep_face() {
        let sensors = GroundSensors {
            overlap: true,
            surface_normal: Some(tilted(60.0)),
            body_grounded: true,
        };
        assert!(!probe_ground(MovementState::Falling, &sensors, 45.0).grounded);
    }

    #[test]
    fn airborne_requires_body_contact() {
        let sensors = GroundSensors {
            overlap: true,
            surface_normal: Some(Vec3::Y),
            body_grounded: false,
        };
        assert!(!probe_ground(MovementState::Jumping, &sensors, 45.0).grounded);
    }
}
