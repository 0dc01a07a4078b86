//! Core controller systems.
//!
//! These systems run the pure controller tick inside the ECS. They are
//! generic over the physics backend where they touch the body, so any
//! engine implementing [`CharacterPhysicsBackend`] can drive a controller.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::SurfaceReadings;
use crate::config::MovementConfig;
use crate::controller::{ControllerEvent, PlatformerController};
use crate::intent::{ControlKey, ControlKeys, InputBuffer};
use crate::state::{Airborne, Grounded, PlayerState, TouchingWall};

/// A [`ControllerEvent`] tagged with the entity that produced it.
///
/// Written once per event, in tick order, for render and audio listeners.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ControllerMessage {
    pub entity: Entity,
    pub event: ControllerEvent,
}

/// Run one controller tick for every controlled entity.
///
/// Samples [`ControlKeys`] through the entity's [`InputBuffer`], ticks the
/// controller against the latest [`SurfaceReadings`] and forwards the
/// produced events as [`ControllerMessage`]s.
pub fn run_controller_tick<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let mut query = world.query::<(
        Entity,
        &mut PlatformerController,
        &mut InputBuffer,
        &mut ControlKeys,
        &SurfaceReadings,
        &MovementConfig,
    )>();

    let mut messages = Vec::new();
    for (entity, mut controller, mut input, mut keys, readings, config) in query.iter_mut(world) {
        let frame = input.sample(&mut *keys);
        controller.tick(dt, &frame, readings, config);
        messages.extend(
            controller
                .drain_events()
                .map(|event| ControllerMessage { entity, event }),
        );
    }

    if !messages.is_empty() {
        world.send_event_batch(messages);
    }
}

/// Write the velocity computed by the last tick to the physics body.
///
/// Runs in [`ControllerSet::FinalApplication`](crate::ControllerSet). Entities
/// without control are left to the physics engine.
pub fn apply_body_velocity<B: CharacterPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, Vec2)> = world
        .query::<(Entity, &PlatformerController)>()
        .iter(world)
        .filter_map(|(entity, controller)| controller.body_velocity().map(|v| (entity, v)))
        .collect();

    for (entity, velocity) in pending {
        B::set_velocity(world, entity, velocity);
    }
}

/// Keep marker components and [`PlayerState`] in sync with the controller.
pub fn sync_state_markers(
    mut commands: Commands,
    mut q_controllers: Query<(
        Entity,
        &PlatformerController,
        Option<&mut PlayerState>,
        Has<Grounded>,
        Has<Airborne>,
        Option<&TouchingWall>,
    )>,
) {
    for (entity, controller, state, has_grounded, has_airborne, wall) in &mut q_controllers {
        match state {
            Some(mut state) => {
                state.set_if_neq(controller.state());
            }
            None => {
                commands.entity(entity).insert(controller.state());
            }
        }

        // Sync Grounded/Airborne
        let grounded = controller.is_grounded();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && (has_grounded || !has_airborne) {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        let contacts = controller.contacts();
        match (contacts.on_wall, wall) {
            (true, Some(wall))
                if wall.side == contacts.wall_direction && wall.normal == contacts.wall_normal => {}
            (true, _) => {
                commands
                    .entity(entity)
                    .insert(TouchingWall::new(contacts.wall_direction, contacts.wall_normal));
            }
            (false, Some(_)) => {
                commands.entity(entity).remove::<TouchingWall>();
            }
            (false, None) => {}
        }
    }
}

/// Marker for entities whose [`ControlKeys`] are read from the keyboard.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct KeyboardControlled;

/// Global gameplay pause. While set, keyboard-driven controllers receive
/// neutral input.
#[derive(Resource, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Resource)]
pub struct InputPaused(pub bool);

/// Keyboard layout used by [`read_keyboard_controls`].
#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<ControlKey, Vec<KeyCode>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = HashMap::default();
        bindings.insert(ControlKey::Left, vec![KeyCode::KeyA, KeyCode::ArrowLeft]);
        bindings.insert(ControlKey::Right, vec![KeyCode::KeyD, KeyCode::ArrowRight]);
        bindings.insert(ControlKey::Up, vec![KeyCode::KeyW, KeyCode::ArrowUp]);
        bindings.insert(ControlKey::Down, vec![KeyCode::KeyS, KeyCode::ArrowDown]);
        bindings.insert(ControlKey::Jump, vec![KeyCode::Space]);
        bindings.insert(ControlKey::Dash, vec![KeyCode::ShiftLeft, KeyCode::KeyK]);
        bindings.insert(ControlKey::Glide, vec![KeyCode::KeyJ]);
        bindings.insert(ControlKey::Grapple, vec![KeyCode::KeyL]);
        Self { bindings }
    }
}

impl KeyBindings {
    /// Replace the keys bound to `key`.
    pub fn bind(&mut self, key: ControlKey, codes: impl IntoIterator<Item = KeyCode>) {
        self.bindings.insert(key, codes.into_iter().collect());
    }

    /// Keys bound to `key`.
    pub fn codes(&self, key: ControlKey) -> &[KeyCode] {
        self.bindings.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any key bound to `key` is held.
    pub fn held(&self, keyboard: &ButtonInput<KeyCode>, key: ControlKey) -> bool {
        keyboard.any_pressed(self.codes(key).iter().copied())
    }

    /// Whether any key bound to `key` went down this frame.
    pub fn just_pressed(&self, keyboard: &ButtonInput<KeyCode>, key: ControlKey) -> bool {
        keyboard.any_just_pressed(self.codes(key).iter().copied())
    }
}

/// Copy held keyboard state into [`ControlKeys`] for [`KeyboardControlled`]
/// entities.
///
/// Presses of [`ControlKey::PRESSABLE`] keys are also latched, so a tap that
/// starts and ends between two fixed ticks still reaches the next tick.
pub fn read_keyboard_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    paused: Res<InputPaused>,
    mut query: Query<&mut ControlKeys, With<KeyboardControlled>>,
) {
    for mut keys in &mut query {
        keys.paused = paused.0;
        if paused.0 {
            continue;
        }
        for key in [
            ControlKey::Left,
            ControlKey::Right,
            ControlKey::Up,
            ControlKey::Down,
            ControlKey::Jump,
            ControlKey::Dash,
            ControlKey::Glide,
            ControlKey::Grapple,
        ] {
            keys.set(key, bindings.held(&keyboard, key));
        }
        for key in ControlKey::PRESSABLE {
            if bindings.just_pressed(&keyboard, key) {
                keys.latch(key);
            }
        }
    }
}
