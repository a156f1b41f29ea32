//! Core controller systems.
//!
//! These systems wire the pure grounding, state machine, integrator and
//! orientation logic into the ECS. Systems that talk to the body are
//! generic over the physics backend.

use bevy::prelude::*;

use crate::animation::LocomotionBlend;
use crate::backend::{fixed_timestep, CharacterPhysicsBackend};
use crate::config::{CharacterController, ControllerConfig};
use crate::detection::probe_ground;
use crate::error::{ControllerError, ControllerFault, ControllerReady};
use crate::intent::MotionIntent;
use crate::lateral::{lateral_velocity, CameraBasis};
use crate::orientation::OrientationState;
use crate::state::{
    airborne_override, step_movement_state, Airborne, Grounded, LocomotionFlags, MovementState,
};
use crate::vertical::integrate_vertical;

/// Check the wiring of newly spawned controllers.
///
/// A controller only starts ticking once it carries [`ControllerReady`].
/// Any fault is logged and recorded as [`ControllerFault`]; that controller
/// never runs.
pub fn validate_new_controllers<B: CharacterPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, Entity, ControllerConfig)> = world
        .query_filtered::<(Entity, &CharacterController, &ControllerConfig), (
            Without<ControllerReady>,
            Without<ControllerFault>,
        )>()
        .iter(world)
        .map(|(e, controller, config)| (e, controller.camera, *config))
        .collect();

    for (entity, camera, config) in pending {
        match validate_controller::<B>(world, entity, camera, &config) {
            Ok(()) => {
                B::configure_body(world, entity, &config);
                world.entity_mut(entity).insert(ControllerReady);
                debug!("character controller {entity} ready (camera {camera})");
            }
            Err(err) => {
                error!("character controller {entity} disabled: {err}");
                world.entity_mut(entity).insert(ControllerFault(err));
            }
        }
    }
}

fn validate_controller<B: CharacterPhysicsBackend>(
    world: &World,
    entity: Entity,
    camera: Entity,
    config: &ControllerConfig,
) -> Result<(), ControllerError> {
    config.validate()?;

    if !world.entities().contains(camera) {
        return Err(ControllerError::MissingCamera(camera));
    }
    if world.get::<Transform>(camera).is_none() {
        return Err(ControllerError::CameraWithoutTransform(camera));
    }
    if world.get::<Transform>(entity).is_none() {
        return Err(ControllerError::MissingBodyComponent {
            entity,
            component: "Transform",
        });
    }
    B::validate_body(world, entity)
}

/// Snapshot the state the previous tick ended in.
pub fn begin_tick(mut q: Query<(&mut CharacterController, &MovementState), With<ControllerReady>>) {
    for (mut controller, state) in &mut q {
        controller.previous_state = *state;
    }
}

/// Read the velocity the body actually moved with.
pub fn read_body_velocity<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<CharacterController>, With<ControllerReady>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let velocity = B::get_velocity(world, entity);
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.body_velocity = velocity;
            controller.velocity_magnitude = (velocity.length() * 1000.0).round() / 1000.0;
        }
    }
}

/// Resolve ground support from this tick's sensor readings.
pub fn update_grounding(
    mut q: Query<(&mut CharacterController, &MovementState, &ControllerConfig), With<ControllerReady>>,
) {
    for (mut controller, state, config) in &mut q {
        let contact = probe_ground(*state, &controller.sensors, config.slope_limit);
        controller.grounded = contact.grounded;
        controller.ground_normal = contact.normal;
    }
}

/// Derive this tick's movement state.
pub fn update_movement_state(
    mut q: Query<
        (
            Entity,
            &mut CharacterController,
            &mut MovementState,
            &MotionIntent,
            &ControllerConfig,
        ),
        With<ControllerReady>,
    >,
) {
    for (entity, mut controller, mut state, intent, config) in &mut q {
        let flags = LocomotionFlags::evaluate(
            intent,
            controller.lateral_body_velocity().length(),
            config.moving_threshold,
        );
        let transition = step_movement_state(
            &flags,
            controller.grounded,
            controller.jumped_last_frame,
            controller.body_velocity.y,
        );

        if transition.latch_consumed {
            controller.jumped_last_frame = false;
        }
        if *state != transition.state {
            debug!("{entity}: {:?} -> {:?}", *state, transition.state);
            *state = transition.state;
        }
    }
}

/// Integrate gravity, anti-bump and jumps.
///
/// A jump classifies the character as Jumping on the same tick and raises
/// the latch the next state machine pass consumes.
pub fn apply_vertical_motion(
    time: Res<Time<Fixed>>,
    mut q: Query<
        (
            Entity,
            &mut CharacterController,
            &mut MovementState,
            &MotionIntent,
            &ControllerConfig,
        ),
        With<ControllerReady>,
    >,
) {
    let dt = fixed_timestep(&time);

    for (entity, mut controller, mut state, intent, config) in &mut q {
        let step = integrate_vertical(
            controller.vertical_speed,
            *state,
            controller.previous_state,
            intent.jump_pressed,
            config,
            dt,
        );
        controller.vertical_speed = step.vertical_speed;

        if step.jumped {
            controller.jumped_last_frame = true;
            if let Some(airborne) = airborne_override(controller.grounded, true, step.vertical_speed) {
                debug!("{entity}: jump {:?} -> {:?}", *state, airborne);
                *state = airborne;
            }
        }
    }
}

/// Integrate horizontal motion and queue this tick's displacement.
pub fn apply_lateral_motion(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    cameras: Query<&Transform>,
    mut q: Query<
        (
            Entity,
            &mut CharacterController,
            &MovementState,
            &MotionIntent,
            &ControllerConfig,
        ),
        With<ControllerReady>,
    >,
) {
    let dt = fixed_timestep(&time);

    for (entity, mut controller, state, intent, config) in &mut q {
        let Ok(camera) = cameras.get(controller.camera) else {
            let err = ControllerError::CameraWithoutTransform(controller.camera);
            error!("character controller {entity} disabled: {err}");
            commands
                .entity(entity)
                .remove::<ControllerReady>()
                .insert(ControllerFault(err));
            continue;
        };

        let basis = CameraBasis::from_transform(camera);
        let mut velocity = lateral_velocity(
            controller.body_velocity,
            *state,
            intent.movement,
            &basis,
            controller.vertical_speed,
            controller.sensors.normal(),
            config,
            dt,
        );

        if !velocity.is_finite() {
            warn!("{entity}: non-finite velocity {velocity:?}, resetting");
            velocity = Vec3::ZERO;
            controller.vertical_speed = 0.0;
        }

        controller.velocity = velocity;
        controller.pending_displacement = Some(velocity * dt);
    }
}

/// Suppress the body's step offset while airborne, restore it on landing.
pub fn sync_step_offset<B: CharacterPhysicsBackend>(world: &mut World) {
    let changes: Vec<(Entity, f32, bool)> = world
        .query_filtered::<(Entity, &CharacterController, &MovementState, &ControllerConfig), With<ControllerReady>>()
        .iter(world)
        .filter_map(|(e, controller, state, config)| {
            match (state.is_airborne(), controller.step_offset_disabled) {
                (true, false) => Some((e, 0.0, true)),
                (false, true) => Some((e, config.step_offset, false)),
                _ => None,
            }
        })
        .collect();

    for (entity, offset, disabled) in changes {
        B::set_step_offset(world, entity, offset);
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.step_offset_disabled = disabled;
        }
    }
}

/// Hand each queued displacement to the body.
///
/// This is the only place that calls
/// [`CharacterPhysicsBackend::request_move`]. The displacement is taken out
/// of the controller, so a tick can never move the body twice.
pub fn apply_displacement<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<CharacterController>, With<ControllerReady>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let delta = world
            .get_mut::<CharacterController>(entity)
            .and_then(|mut controller| controller.take_displacement());
        if let Some(delta) = delta {
            B::request_move(world, entity, delta);
        }
    }
}

/// Turn the camera and the body.
///
/// Runs after displacement, so the lateral integrator always sees the
/// camera as it was at the end of the previous tick.
pub fn update_orientation(
    time: Res<Time<Fixed>>,
    mut q: Query<
        (
            &CharacterController,
            &mut OrientationState,
            &mut Transform,
            &MotionIntent,
            &MovementState,
            &ControllerConfig,
        ),
        With<ControllerReady>,
    >,
    mut cameras: Query<&mut Transform, Without<CharacterController>>,
) {
    let dt = fixed_timestep(&time);

    for (controller, mut orientation, mut body, intent, state, config) in &mut q {
        let is_idling = *state == MovementState::Idling;
        let output = orientation.update(intent.look, body.rotation, is_idling, config, dt);

        body.rotation = output.body_rotation;
        if let Ok(mut camera) = cameras.get_mut(controller.camera) {
            camera.rotation = output.camera_rotation;
        }
    }
}

/// Advance the locomotion blend published for animation.
pub fn update_locomotion_blend(
    time: Res<Time<Fixed>>,
    mut q: Query<
        (&mut LocomotionBlend, &MotionIntent, &MovementState, &ControllerConfig),
        With<ControllerReady>,
    >,
) {
    let dt = fixed_timestep(&time);

    for (mut blend, intent, state, config) in &mut q {
        blend.advance(intent.movement, *state, config.locomotion_blend_speed, dt);
    }
}

/// Sync the [`Grounded`]/[`Airborne`] markers with the movement state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &MovementState, Has<Grounded>, Has<Airborne>), With<ControllerReady>>,
) {
    for (entity, state, has_grounded, has_airborne) in &q_controllers {
        if state.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if state.is_airborne() && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}

/// Clear edge-triggered jump input at the end of each fixed tick.
pub fn reset_jump_requests(mut q: Query<&mut MotionIntent>) {
    for mut intent in &mut q {
        if intent.jump_pressed {
            intent.clear_jump();
        }
    }
}
