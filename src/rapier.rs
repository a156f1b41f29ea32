//! Rapier3D physics backend implementation.
//!
//! This module drives Bevy Rapier3D's kinematic character controller.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::GroundSensors;
use crate::config::{CharacterController, ControllerConfig};
use crate::error::{ControllerError, ControllerReady};

/// Rapier3D physics backend for the character controller.
///
/// Displacements go through [`KinematicCharacterController::translation`];
/// Rapier clips them against the world during its own step and reports the
/// result in [`KinematicCharacterControllerOutput`]. Ground sensing is done
/// by a dedicated system that receives the Rapier context as a parameter.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        let dt = Self::get_fixed_timestep(world);
        world
            .get::<KinematicCharacterControllerOutput>(entity)
            .map(|output| output.effective_translation / dt)
            .unwrap_or(Vec3::ZERO)
    }

    fn request_move(world: &mut World, entity: Entity, delta: Vec3) {
        if let Some(mut character) = world.get_mut::<KinematicCharacterController>(entity) {
            character.translation = Some(delta);
        }
    }

    fn set_step_offset(world: &mut World, entity: Entity, offset: f32) {
        if let Some(mut character) = world.get_mut::<KinematicCharacterController>(entity) {
            character.autostep = autostep(offset);
        }
    }

    fn validate_body(world: &World, entity: Entity) -> Result<(), ControllerError> {
        if world.get::<KinematicCharacterController>(entity).is_none() {
            return Err(ControllerError::MissingBodyComponent {
                entity,
                component: "KinematicCharacterController",
            });
        }
        if world.get::<Collider>(entity).is_none() {
            return Err(ControllerError::MissingBodyComponent {
                entity,
                component: "Collider",
            });
        }
        Ok(())
    }

    fn configure_body(world: &mut World, entity: Entity, config: &ControllerConfig) {
        if let Some(mut character) = world.get_mut::<KinematicCharacterController>(entity) {
            character.max_slope_climb_angle = config.slope_limit.to_radians();
            character.min_slope_slide_angle = config.slope_limit.to_radians();
            character.autostep = autostep(config.step_offset);
        }
    }
}

/// Autostep settings for a step offset. Zero disables stepping.
fn autostep(offset: f32) -> Option<CharacterAutostep> {
    (offset > 0.0).then(|| CharacterAutostep {
        max_height: CharacterLength::Absolute(offset),
        ..default()
    })
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        app.add_systems(
            FixedUpdate,
            rapier_ground_sensors.in_set(CharacterControllerSet::Sensors),
        );
    }
}

/// Get the distance from collider center to bottom for a given collider.
/// For capsules, this is half_height + radius.
pub fn get_collider_bottom_offset(collider: &Collider) -> f32 {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
        half_height + capsule.radius()
    } else if let Some(ball) = collider.as_ball() {
        ball.radius()
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents().y
    } else {
        0.0
    }
}

/// Horizontal radius of a collider, used as the probe sphere radius.
pub fn get_collider_radius(collider: &Collider) -> f32 {
    if let Some(capsule) = collider.as_capsule() {
        capsule.radius()
    } else if let Some(ball) = collider.as_ball() {
        ball.radius()
    } else if let Some(cuboid) = collider.as_cuboid() {
        let extents = cuboid.half_extents();
        extents.x.min(extents.z)
    } else {
        0.0
    }
}

/// Fill [`GroundSensors`] for every ready controller.
///
/// - `overlap`: a sphere of the body radius centered one radius below the feet
/// - `surface_normal`: normal hit by a downward ball cast from the feet
/// - `body_grounded`: the grounded flag of Rapier's last character move
fn rapier_ground_sensors(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<
        (
            Entity,
            &GlobalTransform,
            &Collider,
            &ControllerConfig,
            &mut CharacterController,
            Option<&KinematicCharacterControllerOutput>,
            Option<&CollisionGroups>,
        ),
        With<ControllerReady>,
    >,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, collider, config, mut controller, output, collision_groups) in
        &mut q_controllers
    {
        let radius = get_collider_radius(collider);
        let feet = transform.translation() - Vec3::Y * get_collider_bottom_offset(collider);
        let probe = Collider::ball(radius.max(f32::EPSILON));

        let mut filter = QueryFilter::default()
            .exclude_collider(entity)
            .exclude_rigid_body(entity)
            .exclude_sensors();
        if let Some(groups) = collision_groups {
            filter = filter.groups(*groups);
        }

        let mut overlap = false;
        context.intersections_with_shape(feet - Vec3::Y * radius, Quat::IDENTITY, &probe, filter, |_| {
            overlap = true;
            false
        });

        let cast_origin = feet + Vec3::Y * radius;
        let surface_normal = context
            .cast_shape(
                cast_origin,
                Quat::IDENTITY,
                Vec3::NEG_Y,
                &probe,
                ShapeCastOptions {
                    max_time_of_impact: radius + config.ground_probe_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                filter,
            )
            .map(|(_, hit)| hit.details.map(|d| d.normal1).unwrap_or(Vec3::Y));

        controller.sensors = GroundSensors {
            overlap,
            surface_normal,
            body_grounded: output.is_some_and(|o| o.grounded),
        };
    }
}

/// Bundle for creating a character with Rapier3D physics.
///
/// Pair it with a [`Collider`] (a capsule is typical) and a
/// [`CharacterControllerBundle`](crate::CharacterControllerBundle).
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use tps_character_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands, camera: Entity) -> Result<(), ControllerError> {
///     commands.spawn((
///         Transform::from_xyz(0.0, 1.0, 0.0),
///         CharacterControllerBundle::new(camera, ControllerConfig::default())?,
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.3),
///     ));
///     Ok(())
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::KinematicPositionBased`]
/// - `character`: sliding enabled, no snap to ground (the anti-bump bias
///   keeps the body on slopes). Slope limit and step offset are pushed from
///   [`ControllerConfig`] once the controller is validated.
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// Rigid body type. Kinematic, moved by the character controller only.
    pub rigid_body: RigidBody,
    /// Rapier's kinematic character controller.
    pub character: KinematicCharacterController,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// Create a kinematic character bundle.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            character: KinematicCharacterController {
                slide: true,
                snap_to_ground: None,
                ..default()
            },
        }
    }

    /// Set the skin width Rapier keeps between the body and the world.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.character.offset = CharacterLength::Absolute(offset);
        self
    }

    /// Let the body push dynamic rigid bodies it runs into.
    pub fn with_dynamic_impulses(mut self, enabled: bool) -> Self {
        self.character.apply_impulse_to_dynamic_bodies = enabled;
        self
    }
}
