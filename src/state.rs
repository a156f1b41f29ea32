//! Movement state machine.
//!
//! [`MovementState`] is the discrete classification consumed by animation
//! and camera collaborators. A tick first picks one lateral state from the
//! intent through an explicit precedence table, then lets the airborne
//! override replace it when the character is not supported.
//!
//! The [`Grounded`] and [`Airborne`] markers mirror the state for queries
//! that only care about support.

use bevy::prelude::*;

use crate::intent::MotionIntent;

/// Discrete movement classification. Exactly one is active at a time.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[reflect(Component)]
pub enum MovementState {
    Idling,
    Walking,
    Running,
    Sprinting,
    Jumping,
    /// Spawned characters start here until the probe confirms support.
    #[default]
    Falling,
}

impl MovementState {
    /// Every state, grounded ones first.
    pub const ALL: [MovementState; 6] = [
        MovementState::Idling,
        MovementState::Walking,
        MovementState::Running,
        MovementState::Sprinting,
        MovementState::Jumping,
        MovementState::Falling,
    ];

    /// Idling, Walking, Running or Sprinting.
    #[inline]
    pub fn is_grounded(self) -> bool {
        !self.is_airborne()
    }

    /// Jumping or Falling.
    #[inline]
    pub fn is_airborne(self) -> bool {
        matches!(self, MovementState::Jumping | MovementState::Falling)
    }
}

/// Per-tick facts the lateral precedence table is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocomotionFlags {
    /// Walk toggle is on, or the character moves without run eligibility.
    pub walking: bool,
    /// Sprint toggle is on and the character moves.
    pub sprinting: bool,
    /// The character moves laterally or there is movement input.
    pub moving: bool,
}

impl LocomotionFlags {
    /// Derive the flags from intent and measured horizontal speed.
    ///
    /// * Strafing or backing up never runs, see [`MotionIntent::can_run`].
    /// * `is_moving_laterally` compares measured speed against the
    ///   threshold, which keeps jitter at rest from counting as motion.
    pub fn evaluate(intent: &MotionIntent, lateral_speed: f32, moving_threshold: f32) -> Self {
        let is_moving_laterally = lateral_speed > moving_threshold;

        Self {
            walking: (is_moving_laterally && !intent.can_run()) || intent.walk_toggled,
            sprinting: intent.sprint_toggled && is_moving_laterally,
            moving: is_moving_laterally || intent.has_movement_input(),
        }
    }
}

/// Lateral states in precedence order. The first matching row wins;
/// nothing matching means [`MovementState::Idling`].
pub const LATERAL_PRECEDENCE: [(MovementState, fn(&LocomotionFlags) -> bool); 3] = [
    (MovementState::Walking, |f| f.walking),
    (MovementState::Sprinting, |f| f.sprinting),
    (MovementState::Running, |f| f.moving),
];

/// Pick the single lateral state for this tick.
pub fn resolve_lateral(flags: &LocomotionFlags) -> MovementState {
    LATERAL_PRECEDENCE
        .iter()
        .find(|(_, applies)| applies(flags))
        .map(|(state, _)| *state)
        .unwrap_or(MovementState::Idling)
}

/// Airborne override.
///
/// Applies when the probe reports no support or a jump was initiated
/// (`jumped`), with the vertical speed sign choosing between Jumping and
/// Falling. Returns `None` when the lateral state stands.
pub fn airborne_override(grounded: bool, jumped: bool, vertical_velocity: f32) -> Option<MovementState> {
    if grounded && !jumped {
        return None;
    }
    if vertical_velocity > 0.0 {
        Some(MovementState::Jumping)
    } else {
        Some(MovementState::Falling)
    }
}

/// Result of one state machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// State for this tick.
    pub state: MovementState,
    /// Whether the jump latch was consumed by the override.
    pub latch_consumed: bool,
}

/// Run the full state machine for one tick: lateral resolution followed by
/// the airborne override.
pub fn step_movement_state(
    flags: &LocomotionFlags,
    grounded: bool,
    jumped_last_frame: bool,
    vertical_velocity: f32,
) -> StateTransition {
    let lateral = resolve_lateral(flags);
    match airborne_override(grounded, jumped_last_frame, vertical_velocity) {
        Some(airborne) => StateTransition {
            state: airborne,
            latch_consumed: true,
        },
        None => StateTransition {
            state: lateral,
            latch_consumed: false,
        },
    }
}

/// Marker component indicating the character is in a grounded state.
///
/// Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is in an airborne state.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
