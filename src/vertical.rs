//! Vertical motion integrator.
//!
//! Semi-implicit Euler on a single vertical speed scalar, with the grounded
//! anti-bump bias and the jump impulse.

use crate::config::ControllerConfig;
use crate::state::MovementState;

/// Output of one vertical step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalStep {
    /// Vertical speed after this tick.
    pub vertical_speed: f32,
    /// Whether a jump was initiated this tick.
    pub jumped: bool,
}

/// Integrate vertical speed for one tick.
///
/// * `state` is this tick's state from the state machine, `previous` the
///   state at the end of the last tick.
/// * While grounded and descending the speed is held at `-anti_bump`.
/// * A jump replaces that downward bias with the takeoff impulse, so a jump
///   from rest leaves with exactly [`ControllerConfig::jump_impulse`].
/// * Leaving a grounded state without jumping adds `anti_bump` back once so
///   the bias does not yank the body down a ledge.
///
/// Fall speed is not clamped.
pub fn integrate_vertical(
    vertical_speed: f32,
    state: MovementState,
    previous: MovementState,
    jump_pressed: bool,
    config: &ControllerConfig,
    dt: f32,
) -> VerticalStep {
    let grounded = state.is_grounded();
    let mut speed = vertical_speed - config.gravity * dt;

    if grounded && speed < 0.0 {
        speed = -config.anti_bump;
    }

    let jumped = jump_pressed && grounded;
    if jumped {
        speed = speed.max(0.0) + config.jump_impulse();
    }

    if previous.is_grounded() && !grounded {
        speed += config.anti_bump;
    }

    VerticalStep {
        vertical_speed: speed,
        jumped,
    }
}
