//! Controller configuration and the central controller component.
//!
//! [`ControllerConfig`] holds every tuning constant: accelerations and speed
//! caps per movement state, gravity and jump, the grounding probe, and the
//! look/rotation settings. [`CharacterController`] is the per-character hub
//! the systems read and write each tick.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::animation::LocomotionBlend;
use crate::collision::GroundSensors;
use crate::error::ControllerError;
use crate::intent::MotionIntent;
use crate::orientation::OrientationState;
use crate::state::MovementState;

/// Core character controller component.
///
/// This is the **central hub** for the per-tick controller state. It holds
/// the injected camera handle, the raw sensor readings written by the
/// backend, the resolved grounding result, and the integrator state carried
/// from one tick to the next.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(ControllerConfig, MotionIntent, MovementState, OrientationState, LocomotionBlend)]
pub struct CharacterController {
    /// Camera collaborator. Its `Transform` supplies the forward/right basis
    /// for lateral motion and is driven by the orientation controller.
    pub camera: Entity,

    // === Sensors (written by the backend) ===
    /// Raw ground readings from this tick's sensor pass.
    #[reflect(ignore)]
    pub sensors: GroundSensors,
    /// Body velocity measured after the previous displacement.
    pub body_velocity: Vec3,

    // === Grounding Probe ===
    /// Whether the grounding probe confirmed support this tick.
    pub grounded: bool,
    /// Surface normal reported by the probe (world up when nothing was hit).
    pub ground_normal: Vec3,

    // === Integrator State ===
    /// Vertical speed carried between ticks.
    pub vertical_speed: f32,
    /// Velocity produced by the lateral integrator this tick.
    pub velocity: Vec3,
    /// Movement state at the end of the previous tick.
    pub previous_state: MovementState,
    /// Raised by a jump, consumed by the next airborne override.
    pub jumped_last_frame: bool,
    /// Whether the body's step offset is currently suppressed.
    pub step_offset_disabled: bool,

    /// Displacement waiting to be handed to the body. Taken exactly once.
    pub(crate) pending_displacement: Option<Vec3>,

    // === Debug Output ===
    /// Measured speed, rounded to three decimals.
    pub velocity_magnitude: f32,
}

impl CharacterController {
    /// Create a controller bound to the given camera entity.
    pub fn new(camera: Entity) -> Self {
        Self {
            camera,
            sensors: GroundSensors::default(),
            body_velocity: Vec3::ZERO,
            grounded: false,
            ground_normal: Vec3::Y,
            vertical_speed: 0.0,
            velocity: Vec3::ZERO,
            previous_state: MovementState::default(),
            jumped_last_frame: false,
            step_offset_disabled: false,
            pending_displacement: None,
            velocity_magnitude: 0.0,
        }
    }

    /// Horizontal part of the measured body velocity.
    pub fn lateral_body_velocity(&self) -> Vec3 {
        Vec3::new(self.body_velocity.x, 0.0, self.body_velocity.z)
    }

    /// Whether a displacement has been computed but not yet applied.
    pub fn has_pending_displacement(&self) -> bool {
        self.pending_displacement.is_some()
    }

    /// Take the pending displacement, leaving `None` behind.
    pub(crate) fn take_displacement(&mut self) -> Option<Vec3> {
        self.pending_displacement.take()
    }
}

/// Acceleration and speed cap selected for a movement state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralProfile {
    /// Lateral acceleration (units/second^2).
    pub acceleration: f32,
    /// Maximum horizontal speed (units/second).
    pub speed_cap: f32,
}

/// Configuration parameters for the character controller.
///
/// Angles are in degrees. Defaults reproduce the reference tuning of a
/// human-scale character (1 unit = 1 meter).
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ControllerConfig {
    // === Lateral Movement ===
    /// Acceleration while walking.
    pub walk_acceleration: f32,
    /// Speed cap while walking.
    pub walk_speed: f32,
    /// Acceleration while running.
    pub run_acceleration: f32,
    /// Speed cap while running.
    pub run_speed: f32,
    /// Acceleration while sprinting.
    pub sprint_acceleration: f32,
    /// Speed cap while sprinting. Also caps airborne speed.
    pub sprint_speed: f32,
    /// Acceleration while airborne, regardless of the lateral state.
    pub in_air_acceleration: f32,
    /// Constant deceleration applied against the horizontal velocity.
    pub drag: f32,
    /// Horizontal speed above which the character counts as moving.
    pub moving_threshold: f32,

    // === Vertical Movement ===
    /// Gravity magnitude (units/second^2, pulls along -Y).
    pub gravity: f32,
    /// Jump strength. Takeoff speed is `sqrt(jump_speed * 3 * gravity)`.
    pub jump_speed: f32,
    /// Downward speed held while grounded so the body stays on slopes.
    pub anti_bump: f32,

    // === Body ===
    /// Steepest walkable surface (degrees from world up).
    pub slope_limit: f32,
    /// Step height the body may climb while grounded.
    pub step_offset: f32,
    /// Extra reach of the downward surface cast below the feet.
    pub ground_probe_distance: f32,

    // === Orientation ===
    /// Horizontal look sensitivity (degrees per look unit).
    pub look_sense_h: f32,
    /// Vertical look sensitivity (degrees per look unit).
    pub look_sense_v: f32,
    /// Pitch limit in both directions.
    pub look_limit_v: f32,
    /// How quickly the body turns toward its target yaw.
    pub rotation_speed: f32,
    /// How long an idle turn keeps going once started (seconds).
    pub rotate_to_target_time: f32,
    /// Mismatch an idle character tolerates before turning (degrees).
    pub rotation_tolerance: f32,

    // === Animation ===
    /// Blend rate of the published locomotion blend values.
    pub locomotion_blend_speed: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Lateral movement
            walk_acceleration: 25.0,
            walk_speed: 2.0,
            run_acceleration: 35.0,
            run_speed: 4.0,
            sprint_acceleration: 50.0,
            sprint_speed: 7.0,
            in_air_acceleration: 25.0,
            drag: 20.0,
            moving_threshold: 0.01,

            // Vertical movement
            gravity: 25.0,
            jump_speed: 1.0,
            anti_bump: 7.0,

            // Body
            slope_limit: 45.0,
            step_offset: 0.3,
            ground_probe_distance: 0.1,

            // Orientation
            look_sense_h: 0.1,
            look_sense_v: 0.1,
            look_limit_v: 89.0,
            rotation_speed: 10.0,
            rotate_to_target_time: 0.25,
            rotation_tolerance: 90.0,

            // Animation
            locomotion_blend_speed: 8.0,
        }
    }
}

impl ControllerConfig {
    /// Parse a config from JSON and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ControllerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every constant is finite and in range.
    pub fn validate(&self) -> Result<(), ControllerError> {
        let non_negative = [
            ("walk_acceleration", self.walk_acceleration),
            ("walk_speed", self.walk_speed),
            ("run_acceleration", self.run_acceleration),
            ("run_speed", self.run_speed),
            ("sprint_acceleration", self.sprint_acceleration),
            ("sprint_speed", self.sprint_speed),
            ("in_air_acceleration", self.in_air_acceleration),
            ("drag", self.drag),
            ("moving_threshold", self.moving_threshold),
            ("jump_speed", self.jump_speed),
            ("anti_bump", self.anti_bump),
            ("step_offset", self.step_offset),
            ("ground_probe_distance", self.ground_probe_distance),
            ("rotation_speed", self.rotation_speed),
            ("rotate_to_target_time", self.rotate_to_target_time),
            ("rotation_tolerance", self.rotation_tolerance),
            ("locomotion_blend_speed", self.locomotion_blend_speed),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ControllerError::InvalidConfig {
                    field,
                    reason: "must be finite and non-negative",
                });
            }
        }

        if !self.gravity.is_finite() || self.gravity <= 0.0 {
            return Err(ControllerError::InvalidConfig {
                field: "gravity",
                reason: "must be positive and finite",
            });
        }
        if !self.slope_limit.is_finite() || self.slope_limit <= 0.0 || self.slope_limit > 90.0 {
            return Err(ControllerError::InvalidConfig {
                field: "slope_limit",
                reason: "must lie in (0, 90] degrees",
            });
        }
        if !self.look_limit_v.is_finite() || !(0.0..=90.0).contains(&self.look_limit_v) {
            return Err(ControllerError::InvalidConfig {
                field: "look_limit_v",
                reason: "must lie in [0, 90] degrees",
            });
        }
        if !self.look_sense_h.is_finite() || !self.look_sense_v.is_finite() {
            return Err(ControllerError::InvalidConfig {
                field: "look_sense",
                reason: "must be finite",
            });
        }
        Ok(())
    }

    /// Acceleration and speed cap for the given state.
    ///
    /// Airborne motion is not walk/run/sprint differentiated: it always uses
    /// the in-air acceleration and the sprint speed cap.
    pub fn lateral_profile(&self, state: MovementState) -> LateralProfile {
        match state {
            MovementState::Jumping | MovementState::Falling => LateralProfile {
                acceleration: self.in_air_acceleration,
                speed_cap: self.sprint_speed,
            },
            MovementState::Walking => LateralProfile {
                acceleration: self.walk_acceleration,
                speed_cap: self.walk_speed,
            },
            MovementState::Sprinting => LateralProfile {
                acceleration: self.sprint_acceleration,
                speed_cap: self.sprint_speed,
            },
            MovementState::Idling | MovementState::Running => LateralProfile {
                acceleration: self.run_acceleration,
                speed_cap: self.run_speed,
            },
        }
    }

    /// Vertical takeoff speed produced by a jump.
    #[inline]
    pub fn jump_impulse(&self) -> f32 {
        (self.jump_speed * 3.0 * self.gravity).max(0.0).sqrt()
    }

    /// Create a config for a heavier, slower character.
    pub fn heavy() -> Self {
        Self {
            walk_speed: 1.5,
            run_speed: 3.0,
            sprint_speed: 5.0,
            anti_bump: 5.0,
            jump_speed: 0.6,
            rotation_speed: 6.0,
            ..default()
        }
    }

    /// Builder: set walk acceleration and speed cap.
    pub fn with_walk(mut self, acceleration: f32, speed: f32) -> Self {
        self.walk_acceleration = acceleration;
        self.walk_speed = speed;
        self
    }

    /// Builder: set run acceleration and speed cap.
    pub fn with_run(mut self, acceleration: f32, speed: f32) -> Self {
        self.run_acceleration = acceleration;
        self.run_speed = speed;
        self
    }

    /// Builder: set sprint acceleration and speed cap.
    pub fn with_sprint(mut self, acceleration: f32, speed: f32) -> Self {
        self.sprint_acceleration = acceleration;
        self.sprint_speed = speed;
        self
    }

    /// Builder: set in-air acceleration.
    pub fn with_in_air_acceleration(mut self, acceleration: f32) -> Self {
        self.in_air_acceleration = acceleration;
        self
    }

    /// Builder: set drag.
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    /// Builder: set gravity magnitude.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set jump speed.
    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    /// Builder: set the grounded anti-bump speed.
    pub fn with_anti_bump(mut self, anti_bump: f32) -> Self {
        self.anti_bump = anti_bump;
        self
    }

    /// Builder: set slope limit (degrees).
    pub fn with_slope_limit(mut self, degrees: f32) -> Self {
        self.slope_limit = degrees;
        self
    }

    /// Builder: set step offset.
    pub fn with_step_offset(mut self, offset: f32) -> Self {
        self.step_offset = offset;
        self
    }

    /// Builder: set look sensitivities.
    pub fn with_look_sensitivity(mut self, horizontal: f32, vertical: f32) -> Self {
        self.look_sense_h = horizontal;
        self.look_sense_v = vertical;
        self
    }

    /// Builder: set body rotation speed.
    pub fn with_rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    /// Builder: set idle turn tolerance (degrees) and duration (seconds).
    pub fn with_idle_rotation(mut self, tolerance: f32, duration: f32) -> Self {
        self.rotation_tolerance = tolerance;
        self.rotate_to_target_time = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
        assert_eq!(ControllerConfig::heavy().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_gravity() {
        let config = ControllerConfig::default().with_gravity(0.0);
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidConfig { field: "gravity", .. })
        ));
    }

    #[test]
    fn rejects_nan_drag() {
        let config = ControllerConfig::default().with_drag(f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidConfig { field: "drag", .. })
        ));
    }

    #[test]
    fn rejects_slope_limit_out_of_range() {
        let config = ControllerConfig::default().with_slope_limit(120.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn jump_impulse_matches_reference() {
        let config = ControllerConfig::default().with_jump_speed(1.0).with_gravity(25.0);
        assert!((config.jump_impulse() - 75.0_f32.sqrt()).abs() < 1e-5);
        assert!((config.jump_impulse() - 8.660).abs() < 1e-3);
    }

    #[test]
    fn airborne_profile_ignores_lateral_state() {
        let config = ControllerConfig::default();
        let jumping = config.lateral_profile(MovementState::Jumping);
        let falling = config.lateral_profile(MovementState::Falling);
        assert_eq!(jumping, falling);
        assert_eq!(jumping.acceleration, config.in_air_acceleration);
        assert_eq!(jumping.speed_cap, config.sprint_speed);
    }

    #[test]
    fn grounded_profiles_follow_state() {
        let config = ControllerConfig::default();
        assert_eq!(config.lateral_profile(MovementState::Walking).speed_cap, config.walk_speed);
        assert_eq!(config.lateral_profile(MovementState::Running).speed_cap, config.run_speed);
        assert_eq!(
            config.lateral_profile(MovementState::Sprinting).acceleration,
            config.sprint_acceleration
        );
        assert_eq!(config.lateral_profile(MovementState::Idling).speed_cap, config.run_speed);
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config = ControllerConfig::from_json(r#"{ "gravity": 30.0, "sprint_speed": 9.0 }"#)
            .expect("config should parse");
        assert_eq!(config.gravity, 30.0);
        assert_eq!(config.sprint_speed, 9.0);
        assert_eq!(config.walk_speed, ControllerConfig::default().walk_speed);
    }

    #[test]
    fn from_json_validates() {
        let err = ControllerConfig::from_json(r#"{ "gravity": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig { field: "gravity", .. }));

        let err = ControllerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ControllerError::Parse(_)));
    }

    #[test]
    fn controller_starts_without_pending_displacement() {
        let controller = CharacterController::new(Entity::from_raw(7));
        assert!(!controller.has_pending_displacement());
        assert_eq!(controller.ground_normal, Vec3::Y);
        assert_eq!(controller.previous_state, MovementState::Falling);
    }
}
