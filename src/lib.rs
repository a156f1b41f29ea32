//! # `tps_character_controller`
//!
//! A third-person kinematic character controller with physics backend abstraction.
//!
//! This crate provides a camera-relative character controller that:
//! - Classifies each tick into one of six movement states
//! - Integrates gravity, jumps and an anti-bump bias that keeps the body glued to slopes
//! - Accelerates along the camera basis with drag and per-state speed caps
//! - Slides down surfaces steeper than the slope limit
//! - Turns an idle body toward the camera only past a rotation tolerance
//! - Abstracts the physics body for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! The controller never resolves penetration itself. Each fixed tick it:
//! 1. Reads sensor results and the velocity the body actually moved with
//! 2. Resolves ground support and the movement state
//! 3. Integrates vertical and lateral velocity into a single displacement
//! 4. Hands that displacement to the body, which clips it against the world
//! 5. Turns the camera and the body
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use tps_character_controller::prelude::*;
//!
//! let mut world = World::new();
//! let camera = world.spawn(Transform::default()).id();
//!
//! // Configuration is validated before anything is spawned.
//! let bundle = CharacterControllerBundle::new(camera, ControllerConfig::default())
//!     .expect("default tuning is valid");
//! world.spawn((Transform::default(), bundle));
//!
//! let broken = ControllerConfig::default().with_gravity(-1.0);
//! assert!(CharacterControllerBundle::new(camera, broken).is_err());
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod collision;
pub mod config;
pub mod detection;
pub mod error;
pub mod intent;
pub mod lateral;
pub mod orientation;
pub mod state;
pub mod systems;
pub mod vertical;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::LocomotionBlend;
    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::collision::GroundSensors;
    pub use crate::config::{CharacterController, ControllerConfig};
    pub use crate::error::{ControllerError, ControllerFault, ControllerReady};
    pub use crate::intent::MotionIntent;
    pub use crate::orientation::OrientationState;
    pub use crate::state::{Airborne, Grounded, MovementState};
    pub use crate::{CharacterControllerBundle, CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the controller's fixed tick, run in declaration order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Validate new controllers and snapshot the previous state.
    Preparation,
    /// Backend sensor queries and the measured body velocity.
    Sensors,
    /// Resolve ground support.
    Grounding,
    /// Derive the movement state.
    StateMachine,
    /// Vertical and lateral integration.
    Motion,
    /// Step offset and the single displacement request.
    FinalApplication,
    /// Camera and body rotation, animation blend.
    Orientation,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the
/// body operations (move requests, measured velocity, ground sensors).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use tps_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<config::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<intent::MotionIntent>();
        app.register_type::<state::MovementState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<orientation::OrientationState>();
        app.register_type::<animation::LocomotionBlend>();
        app.register_type::<error::ControllerReady>();

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Sensors,
                CharacterControllerSet::Grounding,
                CharacterControllerSet::StateMachine,
                CharacterControllerSet::Motion,
                CharacterControllerSet::FinalApplication,
                CharacterControllerSet::Orientation,
            )
                .chain(),
        );

        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                (systems::validate_new_controllers::<B>, systems::begin_tick)
                    .chain()
                    .in_set(CharacterControllerSet::Preparation),
                systems::read_body_velocity::<B>.in_set(CharacterControllerSet::Sensors),
                systems::update_grounding.in_set(CharacterControllerSet::Grounding),
                systems::update_movement_state.in_set(CharacterControllerSet::StateMachine),
                (systems::apply_vertical_motion, systems::apply_lateral_motion)
                    .chain()
                    .in_set(CharacterControllerSet::Motion),
                (
                    systems::sync_step_offset::<B>,
                    systems::apply_displacement::<B>,
                    systems::sync_state_markers,
                )
                    .chain()
                    .in_set(CharacterControllerSet::FinalApplication),
                (systems::update_orientation, systems::update_locomotion_blend)
                    .in_set(CharacterControllerSet::Orientation),
            ),
        );

        // Jump input is edge-triggered and lives for one tick.
        app.add_systems(FixedPostUpdate, systems::reset_jump_requests);
    }
}

/// The controller components of one character.
///
/// Physics components come from the backend (see `Rapier3dCharacterBundle`).
#[derive(Bundle, Clone)]
pub struct CharacterControllerBundle {
    pub controller: config::CharacterController,
    pub config: config::ControllerConfig,
    pub intent: intent::MotionIntent,
    pub state: state::MovementState,
    pub orientation: orientation::OrientationState,
    pub blend: animation::LocomotionBlend,
}

impl CharacterControllerBundle {
    /// Bundle a controller driven by `camera`.
    ///
    /// Fails if the configuration is out of range.
    pub fn new(camera: Entity, config: config::ControllerConfig) -> Result<Self, error::ControllerError> {
        config.validate()?;
        Ok(Self {
            controller: config::CharacterController::new(camera),
            config,
            intent: intent::MotionIntent::default(),
            state: state::MovementState::default(),
            orientation: orientation::OrientationState::default(),
            blend: animation::LocomotionBlend::default(),
        })
    }

    /// Use a prepared intent, e.g. [`MotionIntent::hold_to_sprint`](intent::MotionIntent::hold_to_sprint).
    pub fn with_intent(mut self, intent: intent::MotionIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Start with the camera yaw and body target at `yaw` degrees.
    pub fn facing(mut self, yaw: f32) -> Self {
        self.orientation = orientation::OrientationState::facing(yaw);
        self
    }
}
