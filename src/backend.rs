//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! act as the body collaborator of the character controller. The controller
//! never resolves penetration itself: it asks the backend to move the body
//! and reads back what actually happened.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::error::ControllerError;

/// Trait for physics backend implementations.
///
/// Besides the methods below, a backend's [`plugin`](Self::plugin) must add
/// a system in [`CharacterControllerSet::Sensors`](crate::CharacterControllerSet::Sensors)
/// that fills [`CharacterController::sensors`](crate::config::CharacterController::sensors)
/// for every ready controller.
///
/// For an example implementation, see the `rapier` module's
/// `Rapier3dBackend`, which drives Bevy Rapier3D's kinematic character
/// controller.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Velocity the body actually moved with during its last displacement.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Ask the body to move by `delta` this tick. The body may clip the
    /// displacement against collision geometry.
    ///
    /// The controller calls this at most once per entity per tick.
    fn request_move(world: &mut World, entity: Entity, delta: Vec3);

    /// Set the step height the body may climb. Zero disables stepping.
    fn set_step_offset(world: &mut World, entity: Entity, offset: f32);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(fixed_timestep)
            .unwrap_or(DEFAULT_TIMESTEP)
    }

    /// Check that the body carries everything this backend needs.
    fn validate_body(_world: &World, _entity: Entity) -> Result<(), ControllerError> {
        Ok(())
    }

    /// Push body-side settings (slope limit, step offset) from the config.
    ///
    /// Called once, after validation succeeds.
    fn configure_body(_world: &mut World, _entity: Entity, _config: &ControllerConfig) {}
}

/// Fallback timestep when no fixed clock has advanced yet.
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// Delta of the fixed clock, falling back to its configured timestep before
/// the first fixed run.
pub fn fixed_timestep(time: &Time<Fixed>) -> f32 {
    let delta = time.delta_secs();
    if delta > 0.0 {
        delta
    } else {
        let timestep = time.timestep().as_secs_f32();
        if timestep > 0.0 {
            timestep
        } else {
            DEFAULT_TIMESTEP
        }
    }
}
