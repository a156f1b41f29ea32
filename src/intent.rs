//! Motion intent component.
//!
//! The input collaborator writes player intent here each frame. The
//! controller reads it once per tick; the edge-triggered jump flag is
//! cleared after the tick by [`reset_jump_requests`](crate::systems::reset_jump_requests).

use bevy::prelude::*;

/// Per-tick player intent.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use tps_character_controller::prelude::*;
///
/// let mut intent = MotionIntent::new();
/// intent.set_movement(Vec2::new(0.0, 1.0));
/// assert!(intent.has_movement_input());
/// assert!(intent.can_run());
///
/// // Jump is edge-triggered: only the rising edge raises the flag.
/// intent.set_jump_pressed(true);
/// assert!(intent.jump_pressed);
/// intent.clear_jump();
/// intent.set_jump_pressed(true);
/// assert!(!intent.jump_pressed);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct MotionIntent {
    /// Movement axis: `x` strafes right, `y` moves forward. Each axis in [-1, 1].
    pub movement: Vec2,
    /// Look delta for this tick.
    pub look: Vec2,
    /// True for exactly one tick after the jump button goes down.
    pub jump_pressed: bool,
    /// Latched sprint state.
    pub sprint_toggled: bool,
    /// Latched walk state.
    pub walk_toggled: bool,
    /// Sprint follows the button instead of toggling on each press.
    pub hold_to_sprint: bool,

    // Previous button states for edge detection.
    pub(crate) jump_held: bool,
    pub(crate) sprint_held: bool,
    pub(crate) walk_held: bool,
}

impl MotionIntent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty intent whose sprint button must be held.
    pub fn hold_to_sprint() -> Self {
        Self {
            hold_to_sprint: true,
            ..default()
        }
    }

    /// Set the movement axis, clamping each component to [-1, 1].
    pub fn set_movement(&mut self, movement: Vec2) {
        self.movement = movement.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Set the look delta.
    pub fn set_look(&mut self, look: Vec2) {
        self.look = look;
    }

    /// Feed the jump button state. Raises [`Self::jump_pressed`] on the
    /// rising edge only.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if pressed && !self.jump_held {
            self.jump_pressed = true;
        }
        self.jump_held = pressed;
    }

    /// Feed the sprint button state.
    ///
    /// In toggle mode each press flips sprinting; in hold mode sprinting
    /// lasts while the button is down.
    pub fn set_sprint_pressed(&mut self, pressed: bool) {
        if pressed && !self.sprint_held {
            self.sprint_toggled = self.hold_to_sprint || !self.sprint_toggled;
        } else if !pressed && self.sprint_held {
            self.sprint_toggled = !self.hold_to_sprint && self.sprint_toggled;
        }
        self.sprint_held = pressed;
    }

    /// Feed the walk button state. Each press flips walking.
    pub fn set_walk_pressed(&mut self, pressed: bool) {
        if pressed && !self.walk_held {
            self.walk_toggled = !self.walk_toggled;
        }
        self.walk_held = pressed;
    }

    /// Clear the edge-triggered jump flag.
    pub fn clear_jump(&mut self) {
        self.jump_pressed = false;
    }

    /// Clear movement and look input. Latched toggles are kept.
    pub fn clear(&mut self) {
        self.movement = Vec2::ZERO;
        self.look = Vec2::ZERO;
        self.jump_pressed = false;
    }

    /// Check if there is any movement input.
    pub fn has_movement_input(&self) -> bool {
        self.movement != Vec2::ZERO
    }

    /// Forward intent at least as strong as strafe intent.
    pub fn can_run(&self) -> bool {
        self.movement.y >= self.movement.x.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_is_clamped_per_axis() {
        let mut intent = MotionIntent::new();
        intent.set_movement(Vec2::new(5.0, -3.0));
        assert_eq!(intent.movement, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn jump_requires_release_between_presses() {
        let mut intent = MotionIntent::new();
        intent.set_jump_pressed(true);
        assert!(intent.jump_pressed);

        intent.clear_jump();
        intent.set_jump_pressed(true);
        assert!(!intent.jump_pressed, "holding jump must not retrigger");

        intent.set_jump_pressed(false);
        intent.set_jump_pressed(true);
        assert!(intent.jump_pressed);
    }

    #[test]
    fn sprint_toggles_on_each_press() {
        let mut intent = MotionIntent::new();
        intent.set_sprint_pressed(true);
        intent.set_sprint_pressed(false);
        assert!(intent.sprint_toggled);

        intent.set_sprint_pressed(true);
        intent.set_sprint_pressed(false);
        assert!(!intent.sprint_toggled);
    }

    #[test]
    fn hold_to_sprint_follows_button() {
        let mut intent = MotionIntent::hold_to_sprint();
        intent.set_sprint_pressed(true);
        assert!(intent.sprint_toggled);
        intent.set_sprint_pressed(true);
        assert!(intent.sprint_toggled);
        intent.set_sprint_pressed(false);
        assert!(!intent.sprint_toggled);
    }

    #[test]
    fn walk_toggles_on_press() {
        let mut intent = MotionIntent::new();
        intent.set_walk_pressed(true);
        assert!(intent.walk_toggled);
        intent.set_walk_pressed(true);
        assert!(intent.walk_toggled);
        intent.set_walk_pressed(false);
        intent.set_walk_pressed(true);
        assert!(!intent.walk_toggled);
    }

    #[test]
    fn can_run_rejects_strafe_and_backward() {
        let mut intent = MotionIntent::new();
        intent.set_movement(Vec2::new(0.5, 0.5));
        assert!(intent.can_run());
        intent.set_movement(Vec2::new(1.0, 0.0));
        assert!(!intent.can_run());
        intent.set_movement(Vec2::new(0.0, -1.0));
        assert!(!intent.can_run());
    }

    #[test]
    fn clear_keeps_toggles() {
        let mut intent = MotionIntent::new();
        intent.set_movement(Vec2::Y);
        intent.set_walk_pressed(true);
        intent.clear();
        assert!(!intent.has_movement_input());
        assert!(intent.walk_toggled);
    }
}
