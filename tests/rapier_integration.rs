//! Integration tests against Rapier3D physics.
//!
//! These drive the full fixed tick through `Rapier3dBackend`, so the sensor
//! queries, the measured velocity and the autostep toggling all run against
//! real colliders.

#![cfg(feature = "rapier3d")]

use bevy::prelude::*;
use bevy::time::Virtual;
use bevy_rapier3d::prelude::*;
use tps_character_controller::prelude::*;

fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static box. Its top face is at `position.y + half_size.y` when
/// `rotation` is identity.
fn spawn_ground(app: &mut App, position: Vec3, half_size: Vec3, rotation: Quat) -> Entity {
    let transform = Transform::from_translation(position).with_rotation(rotation);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(half_size.x, half_size.y, half_size.z),
        ))
        .id()
}

/// Flat floor whose top face is at `y = 0`.
fn spawn_floor(app: &mut App) -> Entity {
    spawn_ground(app, Vec3::new(0.0, -0.5, 0.0), Vec3::new(20.0, 0.5, 20.0), Quat::IDENTITY)
}

fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    let camera_transform = Transform::default();
    let camera = app
        .world_mut()
        .spawn((camera_transform, GlobalTransform::from(camera_transform)))
        .id();

    let transform = Transform::from_translation(position);
    let bundle = CharacterControllerBundle::new(camera, ControllerConfig::default()).expect("valid config");
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            bundle,
            Rapier3dCharacterBundle::new(),
            Collider::capsule_y(0.5, 0.3),
        ))
        .id()
}

fn tick(app: &mut App) {
    let timestep = std::time::Duration::from_secs_f64(1.0 / 60.0);
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .advance_by(timestep);
    app.update();
    app.world_mut().run_schedule(FixedUpdate);
    app.update();
}

fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

fn state(app: &App, entity: Entity) -> MovementState {
    *app.world().get::<MovementState>(entity).unwrap()
}

fn position(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn autostep_enabled(app: &App, entity: Entity) -> bool {
    app.world()
        .get::<KinematicCharacterController>(entity)
        .unwrap()
        .autostep
        .is_some()
}

mod landing {
    use super::*;

    #[test]
    fn falls_onto_floor_and_idles() {
        let mut app = create_test_app();
        spawn_floor(&mut app);
        let character = spawn_character(&mut app, Vec3::new(0.0, 2.0, 0.0));

        run_frames(&mut app, 60);

        let y = position(&app, character).y;
        let controller = app.world().get::<CharacterController>(character).unwrap();
        println!(
            "PROOF: state={:?} y={y} sensors={:?}",
            state(&app, character),
            controller.sensors
        );

        assert!(app.world().get::<ControllerReady>(character).is_some());
        assert_eq!(state(&app, character), MovementState::Idling);
        assert!(controller.sensors.overlap, "sphere below the feet touches the floor");
        assert!(controller.sensors.body_grounded, "rapier reports contact");
        assert!(
            (controller.sensors.normal() - Vec3::Y).length() < 1e-3,
            "downward cast hits the floor's top face"
        );
        // Capsule center rests half height plus radius above the floor.
        assert!(y > 0.7 && y < 0.95, "resting height {y}");
        assert!(autostep_enabled(&app, character));
    }

    #[test]
    fn runs_forward_on_floor() {
        let mut app = create_test_app();
        spawn_floor(&mut app);
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.0, 0.0));
        run_frames(&mut app, 30);

        let start = position(&app, character);
        app.world_mut()
            .get_mut::<MotionIntent>(character)
            .unwrap()
            .set_movement(Vec2::Y);
        run_frames(&mut app, 60);

        let end = position(&app, character);
        let controller = app.world().get::<CharacterController>(character).unwrap();
        println!(
            "PROOF: moved {:?}, measured speed {}",
            end - start,
            controller.velocity_magnitude
        );

        // Default camera looks down -Z.
        assert!(start.z - end.z > 1.0, "moved forward: {start:?} -> {end:?}");
        assert!(controller.velocity_magnitude > 0.5);
        assert!(state(&app, character).is_grounded());
    }
}

mod jumping {
    use super::*;

    #[test]
    fn jump_rises_falls_and_lands() {
        let mut app = create_test_app();
        spawn_floor(&mut app);
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.0, 0.0));
        run_frames(&mut app, 60);
        assert_eq!(state(&app, character), MovementState::Idling);
        let rest_y = position(&app, character).y;

        app.world_mut()
            .get_mut::<MotionIntent>(character)
            .unwrap()
            .set_jump_pressed(true);
        tick(&mut app);
        {
            let mut intent = app.world_mut().get_mut::<MotionIntent>(character).unwrap();
            intent.clear_jump();
            intent.set_jump_pressed(false);
        }

        let mut saw_jumping = state(&app, character) == MovementState::Jumping;
        let mut saw_falling = false;
        let mut peak = rest_y;
        for _ in 0..180 {
            tick(&mut app);
            let current = state(&app, character);
            saw_jumping |= current == MovementState::Jumping;
            saw_falling |= current == MovementState::Falling;
            peak = peak.max(position(&app, character).y);

            // Stepping is suppressed while airborne.
            assert_eq!(autostep_enabled(&app, character), current.is_grounded(), "{current:?}");
        }

        println!("PROOF: rest_y={rest_y} peak={peak} final={:?}", state(&app, character));
        assert!(saw_jumping);
        assert!(saw_falling);
        assert!(peak > rest_y + 0.5, "jump left the floor: peak {peak}");
        assert_eq!(state(&app, character), MovementState::Idling);
    }
}

mod slopes {
    use super::*;

    #[test]
    fn airborne_body_never_lands_on_steep_face() {
        let mut app = create_test_app();
        let steepness = 60.0_f32;
        spawn_ground(
            &mut app,
            Vec3::ZERO,
            Vec3::new(20.0, 0.5, 20.0),
            Quat::from_rotation_z(steepness.to_radians()),
        );
        let character = spawn_character(&mut app, Vec3::new(0.0, 4.0, 0.0));

        let mut touched = false;
        for _ in 0..45 {
            tick(&mut app);
            let controller = app.world().get::<CharacterController>(character).unwrap();
            touched |= controller.sensors.surface_normal.is_some();
            assert!(
                state(&app, character).is_airborne(),
                "grounded on a {steepness} degree face: {:?}",
                controller.sensors
            );
        }

        let controller = app.world().get::<CharacterController>(character).unwrap();
        println!("PROOF: touched={touched} normal={:?}", controller.sensors.normal());
        assert!(touched, "the cast reached the slope");
    }
}
