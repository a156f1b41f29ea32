//! Locomotion blend values for the animation collaborator.

use bevy::prelude::*;

use crate::state::MovementState;

/// Smoothed locomotion input, scaled by the movement state.
///
/// Sprinting drives the blend to 1.5x the intent, running and airborne
/// states to 1x, walking and idling to 0.5x.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct LocomotionBlend {
    /// Blended input; `x` strafes, `y` advances.
    pub input: Vec2,
    /// Length of [`Self::input`].
    pub magnitude: f32,
}

/// Blend scale for a movement state.
pub fn blend_scale(state: MovementState) -> f32 {
    match state {
        MovementState::Sprinting => 1.5,
        MovementState::Running | MovementState::Jumping | MovementState::Falling => 1.0,
        MovementState::Walking | MovementState::Idling => 0.5,
    }
}

impl LocomotionBlend {
    /// Move the blend toward the target for this tick.
    pub fn advance(&mut self, movement: Vec2, state: MovementState, blend_speed: f32, dt: f32) {
        let target = movement * blend_scale(state);
        let t = (blend_speed * dt).clamp(0.0, 1.0);
        self.input = self.input.lerp(target, t);
        self.magnitude = self.input.length();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprint_blend_exceeds_run_blend() {
        assert!(blend_scale(MovementState::Sprinting) > blend_scale(MovementState::Running));
        assert!(blend_scale(MovementState::Running) > blend_scale(MovementState::Walking));
    }

    #[test]
    fn blend_converges_to_target() {
        let mut blend = LocomotionBlend::default();
        for _ in 0..300 {
            blend.advance(Vec2::Y, MovementState::Sprinting, 8.0, 1.0 / 60.0);
        }
        assert!((blend.input - Vec2::new(0.0, 1.5)).length() < 1e-3);
        assert!((blend.magnitude - 1.5).abs() < 1e-3);
    }

    #[test]
    fn large_step_does_not_overshoot() {
        let mut blend = LocomotionBlend::default();
        blend.advance(Vec2::X, MovementState::Running, 100.0, 1.0);
        assert_eq!(blend.input, Vec2::X);
    }
}
