//! Integration tests for the platformer controller plugin.
//!
//! These tests drive the full system set through a Bevy `App` using a small
//! deterministic backend: an analytic level (a floor and an optional wall)
//! and bodies that integrate their velocity and are clamped by the level.

use bevy::prelude::*;
use msg_platformer_controller::detection::scan_surfaces;
use msg_platformer_controller::prelude::*;

const HALF_HEIGHT: f32 = 0.5;
const RADIUS: f32 = 0.5;

// ==================== Test backend ====================

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Body {
    position: Vec2,
    velocity: Vec2,
}

impl Body {
    fn shape(&self) -> ProbeShape {
        ProbeShape::capsule(self.position, HALF_HEIGHT, RADIUS)
    }
}

#[derive(Resource, Debug, Clone, Copy)]
struct Level {
    floor: f32,
    wall: Option<f32>,
}

impl Default for Level {
    fn default() -> Self {
        Self {
            floor: 0.0,
            wall: None,
        }
    }
}

impl TerrainQuery for Level {
    fn cast(
        &self,
        shape: &ProbeShape,
        direction: Vec2,
        max_distance: f32,
        _filter: &ProbeFilter,
    ) -> Option<CollisionData> {
        let (gap, normal) = if direction == Vec2::NEG_Y {
            (shape.center.y - shape.half_extent_y() - self.floor, Vec2::Y)
        } else if direction == Vec2::X {
            (self.wall? - (shape.center.x + shape.radius), Vec2::NEG_X)
        } else {
            return None;
        };
        (gap >= 0.0 && gap <= max_distance)
            .then(|| CollisionData::new(gap, normal, shape.center + direction * gap, None))
    }

    fn overlaps(&self, shape: &ProbeShape, _filter: &ProbeFilter) -> bool {
        shape.center.y - shape.half_extent_y() < self.floor
    }
}

struct TestBackend;

impl CharacterPhysicsBackend for TestBackend {
    type VelocityComponent = Body;

    fn plugin() -> impl Plugin {
        TestPhysicsPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Body>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut body) = world.get_mut::<Body>(entity) {
            body.velocity = velocity;
        }
    }
}

struct TestPhysicsPlugin;

impl Plugin for TestPhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Level>();
        app.add_systems(FixedUpdate, probe_level.in_set(ControllerSet::Sensors));
        app.add_systems(
            FixedUpdate,
            step_bodies.after(ControllerSet::FinalApplication),
        );
    }
}

fn probe_level(
    level: Res<Level>,
    mut q: Query<(&Body, &MovementConfig, &mut SurfaceReadings)>,
) {
    for (body, config, mut readings) in &mut q {
        *readings = scan_surfaces(level.as_ref(), &body.shape(), config);
    }
}

fn step_bodies(world: &mut World) {
    let dt = TestBackend::get_fixed_timestep(world);
    let level = *world.resource::<Level>();
    let mut q = world.query::<&mut Body>();
    for mut body in q.iter_mut(world) {
        let velocity = body.velocity;
        body.position += velocity * dt;

        let bottom = level.floor + HALF_HEIGHT + RADIUS;
        if body.position.y < bottom {
            body.position.y = bottom;
            body.velocity.y = body.velocity.y.max(0.0);
        }
        if let Some(wall) = level.wall {
            let limit = wall - RADIUS;
            if body.position.x > limit {
                body.position.x = limit;
                body.velocity.x = body.velocity.x.min(0.0);
            }
        }
    }
}

// ==================== Helpers ====================

fn create_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(PlatformerControllerPlugin::<TestBackend>::without_keyboard());
    app.insert_resource(Time::<Fixed>::from_hz(64.0));
    app.finish();
    app.cleanup();
    app
}

fn spawn_player(app: &mut App, position: Vec2) -> Entity {
    app.world_mut()
        .spawn((
            PlatformerBundle::new(MovementConfig::default()),
            Body {
                position,
                velocity: Vec2::ZERO,
            },
        ))
        .id()
}

/// Run one fixed tick.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

fn drain_messages(app: &mut App) -> Vec<ControllerMessage> {
    app.world_mut()
        .resource_mut::<Events<ControllerMessage>>()
        .drain()
        .collect()
}

fn keys(app: &mut App, entity: Entity) -> Mut<'_, ControlKeys> {
    app.world_mut().get_mut::<ControlKeys>(entity).unwrap()
}

fn body(app: &App, entity: Entity) -> Body {
    *app.world().get::<Body>(entity).unwrap()
}

fn state(app: &App, entity: Entity) -> PlayerState {
    *app.world().get::<PlayerState>(entity).unwrap()
}

/// Spawn a player standing on the floor with no pending events.
fn landed_player(app: &mut App) -> Entity {
    let player = spawn_player(app, Vec2::new(0.0, 1.0));
    tick(app);
    drain_messages(app);
    player
}

// ==================== Landing ====================

mod landing {
    use super::*;

    #[test]
    fn falling_player_lands_and_settles_to_idle() {
        let mut app = create_test_app();
        let player = spawn_player(&mut app, Vec2::new(0.0, 3.0));

        tick(&mut app);
        assert!(app.world().get::<Airborne>(player).is_some());
        assert_eq!(state(&app, player), PlayerState::Airborne);

        run_ticks(&mut app, 64);

        assert!(app.world().get::<Grounded>(player).is_some());
        assert!(app.world().get::<Airborne>(player).is_none());
        assert_eq!(state(&app, player), PlayerState::Idle);
        assert!((body(&app, player).position.y - 1.0).abs() < 1e-4);

        let landings: Vec<_> = drain_messages(&mut app)
            .into_iter()
            .filter(|m| m.entity == player)
            .filter_map(|m| match m.event {
                ControllerEvent::Grounded {
                    grounded: true,
                    impact_speed,
                } => Some(impact_speed),
                _ => None,
            })
            .collect();
        assert_eq!(landings.len(), 1);
        assert!(landings[0] > 0.0);
    }

    #[test]
    fn spawning_on_ground_does_not_jump() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);
        run_ticks(&mut app, 16);

        assert!(drain_messages(&mut app).is_empty());
        assert!((body(&app, player).position.y - 1.0).abs() < 1e-4);
    }
}

// ==================== Movement ====================

mod movement {
    use super::*;

    #[test]
    fn holding_right_runs() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        keys(&mut app, player).right = true;
        tick(&mut app);
        assert_eq!(state(&app, player), PlayerState::Run);

        run_ticks(&mut app, 16);
        let body = body(&app, player);
        assert_eq!(body.velocity.x, 10.0);
        assert!(body.position.x > 0.0);

        let controller = app.world().get::<PlatformerController>(player).unwrap();
        assert_eq!(controller.facing(), Facing::Right);
    }

    #[test]
    fn releasing_input_returns_to_idle() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        keys(&mut app, player).left = true;
        run_ticks(&mut app, 8);
        keys(&mut app, player).left = false;
        run_ticks(&mut app, 16);

        assert_eq!(state(&app, player), PlayerState::Idle);
        assert_eq!(body(&app, player).velocity.x, 0.0);
        let controller = app.world().get::<PlatformerController>(player).unwrap();
        assert_eq!(controller.facing(), Facing::Left);
    }

    #[test]
    fn pushing_into_wall_marks_touching_wall() {
        let mut app = create_test_app();
        app.world_mut().resource_mut::<Level>().wall = Some(1.5);
        let player = landed_player(&mut app);

        keys(&mut app, player).right = true;
        run_ticks(&mut app, 32);

        let wall = app.world().get::<TouchingWall>(player).copied().unwrap();
        assert!(wall.is_right());
        assert_eq!(wall.normal, Vec2::NEG_X);
        assert_eq!(body(&app, player).velocity.x, 0.0);

        keys(&mut app, player).right = false;
        keys(&mut app, player).left = true;
        run_ticks(&mut app, 8);
        assert!(app.world().get::<TouchingWall>(player).is_none());
    }
}

// ==================== Abilities ====================

mod abilities {
    use super::*;

    #[test]
    fn jump_press_emits_jump_and_leaves_ground() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        keys(&mut app, player).jump = true;
        tick(&mut app);
        let events: Vec<_> = drain_messages(&mut app)
            .into_iter()
            .map(|m| m.event)
            .collect();
        assert_eq!(events, vec![ControllerEvent::Jumped]);
        assert_eq!(body(&app, player).velocity.y, 18.0);

        tick(&mut app);
        assert!(app.world().get::<Airborne>(player).is_some());
        assert_eq!(state(&app, player), PlayerState::Airborne);

        // Holding the key does not jump again.
        run_ticks(&mut app, 4);
        assert!(
            !drain_messages(&mut app)
                .iter()
                .any(|m| matches!(m.event, ControllerEvent::Jumped | ControllerEvent::AirJumped))
        );
    }

    #[test]
    fn dash_press_dashes_and_ends() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        keys(&mut app, player).dash = true;
        tick(&mut app);
        assert_eq!(state(&app, player), PlayerState::Dash);
        assert_eq!(body(&app, player).velocity, Vec2::new(25.0, 0.0));

        run_ticks(&mut app, 32);
        assert_ne!(state(&app, player), PlayerState::Dash);

        let dashes: Vec<_> = drain_messages(&mut app)
            .into_iter()
            .filter_map(|m| match m.event {
                ControllerEvent::Dash { started } => Some(started),
                _ => None,
            })
            .collect();
        assert_eq!(dashes, vec![true, false]);
    }

    #[test]
    fn paused_input_does_nothing() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        {
            let mut keys = keys(&mut app, player);
            keys.paused = true;
            keys.jump = true;
            keys.right = true;
        }
        run_ticks(&mut app, 4);

        assert!(drain_messages(&mut app).is_empty());
        assert_eq!(state(&app, player), PlayerState::Idle);
    }

    #[test]
    fn without_control_body_is_left_alone() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        app.world_mut()
            .get_mut::<PlatformerController>(player)
            .unwrap()
            .set_control(false);
        app.world_mut().get_mut::<Body>(player).unwrap().velocity = Vec2::new(5.0, 0.0);
        keys(&mut app, player).jump = true;
        tick(&mut app);

        assert_eq!(body(&app, player).velocity, Vec2::new(5.0, 0.0));
        assert!(drain_messages(&mut app).is_empty());
    }

    #[test]
    fn knockback_adds_to_body_velocity() {
        let mut app = create_test_app();
        let player = landed_player(&mut app);

        app.world_mut()
            .get_mut::<PlatformerController>(player)
            .unwrap()
            .apply_velocity(Vec2::new(3.0, 0.0), ForceChannel::External);
        run_ticks(&mut app, 4);

        assert_eq!(body(&app, player).velocity.x, 3.0);
    }
}

// ==================== Keyboard ====================

mod keyboard {
    use super::*;

    fn create_keyboard_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(PlatformerControllerPlugin::<TestBackend>::default());
        app.init_resource::<ButtonInput<KeyCode>>();
        app.insert_resource(Time::<Fixed>::from_hz(64.0));
        app.finish();
        app.cleanup();
        app
    }

    fn keyboard(app: &mut App) -> Mut<'_, ButtonInput<KeyCode>> {
        app.world_mut().resource_mut::<ButtonInput<KeyCode>>()
    }

    /// Render frame: read the keyboard, then forget this frame's edges.
    fn frame(app: &mut App) {
        app.world_mut().run_schedule(PreUpdate);
        keyboard(app).clear();
    }

    fn keyboard_player(app: &mut App) -> Entity {
        let player = landed_player(app);
        app.world_mut().entity_mut(player).insert(KeyboardControlled);
        player
    }

    fn events(app: &mut App) -> Vec<ControllerEvent> {
        drain_messages(app).into_iter().map(|m| m.event).collect()
    }

    #[test]
    fn held_space_jumps() {
        let mut app = create_keyboard_app();
        let player = keyboard_player(&mut app);

        keyboard(&mut app).press(KeyCode::Space);
        frame(&mut app);
        tick(&mut app);

        assert_eq!(events(&mut app), vec![ControllerEvent::Jumped]);
        assert_eq!(body(&app, player).velocity.y, 18.0);
    }

    #[test]
    fn tap_within_one_frame_still_jumps() {
        let mut app = create_keyboard_app();
        let player = keyboard_player(&mut app);

        let mut input = keyboard(&mut app);
        input.press(KeyCode::Space);
        input.release(KeyCode::Space);
        frame(&mut app);
        tick(&mut app);

        assert_eq!(events(&mut app), vec![ControllerEvent::Jumped]);
        assert_eq!(body(&app, player).velocity.y, 18.0);

        // The tap is consumed by the first tick.
        run_ticks(&mut app, 8);
        assert!(!events(&mut app).contains(&ControllerEvent::Jumped));
    }

    #[test]
    fn press_released_before_fixed_tick_still_dashes() {
        let mut app = create_keyboard_app();
        let player = keyboard_player(&mut app);

        keyboard(&mut app).press(KeyCode::ShiftLeft);
        frame(&mut app);
        keyboard(&mut app).release(KeyCode::ShiftLeft);
        frame(&mut app);
        tick(&mut app);

        assert_eq!(state(&app, player), PlayerState::Dash);
        assert!(events(&mut app).contains(&ControllerEvent::Dash { started: true }));
    }
}

// ==================== Determinism ====================

#[test]
fn identical_scripts_produce_identical_motion() {
    let run = || {
        let mut app = create_test_app();
        let player = spawn_player(&mut app, Vec2::new(0.0, 2.0));
        let mut trace = Vec::new();
        for step in 0..96 {
            {
                let mut keys = keys(&mut app, player);
                keys.right = step > 20 && step < 60;
                keys.jump = (40..44).contains(&step);
                keys.dash = (50..52).contains(&step);
            }
            tick(&mut app);
            trace.push((body(&app, player), state(&app, player)));
        }
        trace
    };
    assert_eq!(run(), run());
}
