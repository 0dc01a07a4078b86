//! # `msg_platformer_controller`
//!
//! A deterministic fixed-timestep 2D platformer movement controller with
//! physics backend abstraction.
//!
//! This crate provides a responsive, tuneable player controller that:
//! - Runs horizontal acceleration and gravity with instant direction reversal
//! - Buffers jump and dash presses and grants coyote time after ledges
//! - Supports a configurable number of air jumps and early jump release
//! - Dashes at a locked velocity with cooldown, buffering and coyote time
//! - Classifies ground, walls and ceilings from short shape casts
//! - Abstracts physics backend for easy swapping (Rapier2D included)
//!
//! ## Architecture
//!
//! All movement rules live in [`PlatformerController::tick`], a pure function
//! of the previous state, this tick's [`InputFrame`](intent::InputFrame), the
//! probe [`SurfaceReadings`](collision::SurfaceReadings) and the
//! [`MovementConfig`](config::MovementConfig). Each fixed tick:
//! 1. The backend probes the terrain ([`ControllerSet::Sensors`])
//! 2. Input is sampled and the controller ticks ([`ControllerSet::Simulation`])
//! 3. Marker components and events are published ([`ControllerSet::Feedback`])
//! 4. The computed velocity is written to the body ([`ControllerSet::FinalApplication`])
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_platformer_controller::prelude::*;
//!
//! let config = MovementConfig::default().with_jump(18.0, 1);
//! let mut controller = PlatformerController::new();
//! let mut input = InputBuffer::new();
//!
//! let mut keys = ControlKeys::default();
//! keys.right = true;
//! let frame = input.sample(&mut keys);
//!
//! controller.tick(1.0 / 60.0, &frame, &SurfaceReadings::ground(Vec2::Y), &config);
//! assert!(controller.is_grounded());
//! ```
//!
//! [`PlatformerController::tick`]: controller::PlatformerController::tick

use std::marker::PhantomData;

use bevy::input::InputSystem;
use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod dash;
pub mod detection;
pub mod error;
pub mod intent;
pub mod jump;
pub mod motion;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::collision::{CollisionData, SurfaceReading, SurfaceReadings};
    pub use crate::config::{MovementConfig, TerrainMask};
    pub use crate::controller::{
        ControllerEvent, ForceChannel, PlatformerBundle, PlatformerController,
    };
    pub use crate::detection::{ProbeFilter, ProbeShape, SurfaceContacts, TerrainQuery};
    pub use crate::error::{ConfigError, SetupError};
    pub use crate::intent::{ControlKey, ControlKeys, InputBuffer, InputFrame, InputSource};
    pub use crate::state::{Airborne, Facing, Grounded, PlayerState, TouchingWall};
    pub use crate::systems::{ControllerMessage, InputPaused, KeyBindings, KeyboardControlled};
    pub use crate::{ControllerSet, PlatformerControllerPlugin};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dPlatformerBundle};
}

/// Phases of one controller tick inside `FixedUpdate`, run in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Backend collision probes fill `SurfaceReadings`.
    Sensors,
    /// Input sampling and the controller tick.
    Simulation,
    /// Marker components and `PlayerState` mirror the controller.
    Feedback,
    /// Velocities are written to the physics bodies.
    FinalApplication,
}

/// Main plugin for the platformer controller.
///
/// This plugin is generic over a physics backend `B` which owns the body and
/// the terrain probes.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(PlatformerControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct PlatformerControllerPlugin<B: backend::CharacterPhysicsBackend> {
    keyboard: bool,
    _marker: PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for PlatformerControllerPlugin<B> {
    fn default() -> Self {
        Self {
            keyboard: true,
            _marker: PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> PlatformerControllerPlugin<B> {
    /// Disable the built-in keyboard reader, for games that write
    /// [`ControlKeys`](intent::ControlKeys) themselves.
    pub fn without_keyboard() -> Self {
        Self {
            keyboard: false,
            ..default()
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for PlatformerControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::MovementConfig>();
        app.register_type::<config::TerrainMask>();
        app.register_type::<controller::PlatformerController>();
        app.register_type::<collision::SurfaceReadings>();
        app.register_type::<intent::ControlKeys>();
        app.register_type::<intent::InputBuffer>();
        app.register_type::<state::PlayerState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<systems::KeyboardControlled>();
        app.register_type::<systems::InputPaused>();

        app.add_event::<systems::ControllerMessage>();
        app.init_resource::<systems::InputPaused>();
        app.init_resource::<systems::KeyBindings>();

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Sensors,
                ControllerSet::Simulation,
                ControllerSet::Feedback,
                ControllerSet::FinalApplication,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::run_controller_tick::<B>.in_set(ControllerSet::Simulation),
                systems::sync_state_markers.in_set(ControllerSet::Feedback),
                systems::apply_body_velocity::<B>.in_set(ControllerSet::FinalApplication),
            ),
        );

        if self.keyboard {
            app.add_systems(
                PreUpdate,
                systems::read_keyboard_controls
                    .after(InputSystem)
                    .run_if(resource_exists::<ButtonInput<KeyCode>>),
            );
        }
    }
}
