//! The controller orchestrator.
//!
//! [`PlatformerController`] owns all mutable movement state of one character
//! and advances it with [`PlatformerController::tick`]. The tick is pure with
//! respect to its inputs: the same frames, readings and config always produce
//! the same velocities and events.

use bevy::prelude::*;

use crate::collision::SurfaceReadings;
use crate::config::MovementConfig;
use crate::dash::{DashContext, DashState};
use crate::detection::{ProbeShape, SurfaceContacts, TerrainQuery, scan_surfaces};
use crate::intent::{ControlKeys, InputBuffer, InputFrame, InputSource};
use crate::jump::{JumpContext, JumpKind, JumpState};
use crate::motion::{IntegrationContext, integrate_horizontal, integrate_vertical};
use crate::state::{Facing, PlayerState, StateInputs};

/// Which velocity an outside force is written to.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceChannel {
    /// The controller's own velocity. Overwritten by integration and dashes.
    Burst,
    /// Persistent external velocity such as knockback or moving platforms.
    /// Never decays on its own.
    External,
}

/// Notifications produced by a tick, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// Ground contact changed. `impact_speed` is the absolute vertical speed
    /// at landing, zero when leaving the ground.
    Grounded { grounded: bool, impact_speed: f32 },
    Jumped,
    AirJumped,
    Dash { started: bool },
}

/// Movement state of one platformer character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// let config = MovementConfig::default();
/// let mut controller = PlatformerController::new();
/// let frame = InputFrame { axis: Vec2::X, ..default() };
/// let readings = SurfaceReadings::ground(Vec2::Y);
///
/// let body = controller.tick(1.0 / 60.0, &frame, &readings, &config);
/// assert!(body.is_some());
/// assert_eq!(controller.state(), PlayerState::Run);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct PlatformerController {
    velocity: Vec2,
    external_velocity: Vec2,
    /// Classification from the most recent tick.
    contacts: SurfaceContacts,
    jump: JumpState,
    dash: DashState,
    state: PlayerState,
    facing: Facing,
    has_control: bool,
    /// Velocity computed by the last tick for the physics body, if in control.
    body_velocity: Option<Vec2>,
    #[reflect(ignore)]
    events: Vec<ControllerEvent>,
}

impl Default for PlatformerController {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            external_velocity: Vec2::ZERO,
            contacts: SurfaceContacts::default(),
            jump: JumpState::default(),
            dash: DashState::default(),
            state: PlayerState::Idle,
            facing: Facing::Right,
            has_control: true,
            body_velocity: None,
            events: Vec::new(),
        }
    }
}

impl PlatformerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn external_velocity(&self) -> Vec2 {
        self.external_velocity
    }

    /// Velocity the last tick asked the body to move at. `None` while out of
    /// control, in which case the body keeps whatever the physics engine
    /// gives it.
    pub fn body_velocity(&self) -> Option<Vec2> {
        self.body_velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.contacts.on_ground
    }

    pub fn on_wall(&self) -> bool {
        self.contacts.on_wall
    }

    pub fn contacts(&self) -> &SurfaceContacts {
        &self.contacts
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn has_control(&self) -> bool {
        self.has_control
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.jump.air_jumps_remaining()
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.is_active()
    }

    pub fn jump(&self) -> &JumpState {
        &self.jump
    }

    pub fn dash(&self) -> &DashState {
        &self.dash
    }

    /// Add `velocity` to the chosen channel.
    pub fn apply_velocity(&mut self, velocity: Vec2, channel: ForceChannel) {
        match channel {
            ForceChannel::Burst => self.velocity += velocity,
            ForceChannel::External => self.external_velocity += velocity,
        }
    }

    /// Replace the chosen channel with `velocity`.
    pub fn set_velocity(&mut self, velocity: Vec2, channel: ForceChannel) {
        match channel {
            ForceChannel::Burst => self.velocity = velocity,
            ForceChannel::External => self.external_velocity = velocity,
        }
    }

    /// Enable or disable player control. Without control no jump or dash
    /// starts and no velocity is written to the body.
    pub fn set_control(&mut self, has_control: bool) {
        self.has_control = has_control;
    }

    /// Take the events queued since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ControllerEvent> + '_ {
        self.events.drain(..)
    }

    /// Whether events are waiting to be drained.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Advance the controller by one fixed step.
    ///
    /// Returns the velocity for the physics body, or `None` without control.
    pub fn tick(
        &mut self,
        dt: f32,
        frame: &InputFrame,
        readings: &SurfaceReadings,
        config: &MovementConfig,
    ) -> Option<Vec2> {
        if frame.jump_pressed {
            self.jump.register_press();
        }
        if frame.dash_pressed {
            self.dash.register_press();
        }
        self.jump.advance(dt);
        self.dash.advance(dt);

        if !self.dash.is_active() {
            let ctx = IntegrationContext {
                dt,
                input_x: frame.axis.x,
                on_ground: self.contacts.on_ground,
                wall_direction: self.contacts.wall_direction,
                ended_jump_early: self.jump.ended_early(),
            };
            integrate_vertical(&mut self.velocity, &ctx, config);
            integrate_horizontal(&mut self.velocity, &ctx, config);
        }

        self.resolve_collisions(readings, config);

        if self.has_control {
            self.resolve_jump(frame, config);
            self.start_dash(frame, config);
        }
        if self.dash.maintain(&mut self.velocity, config) {
            debug!("dash ended at {:?}", self.velocity);
            self.events.push(ControllerEvent::Dash { started: false });
        }

        self.body_velocity = self
            .has_control
            .then(|| self.velocity + self.external_velocity);

        let next = self.state.next(&StateInputs {
            on_ground: self.contacts.on_ground,
            dashing: self.dash.is_active(),
            input_x: frame.axis.x,
            velocity_x: self.velocity.x,
        });
        if next != self.state {
            trace!("state {:?} -> {:?}", self.state, next);
            self.state = next;
        }

        self.facing = Facing::from_sign(frame.facing());

        self.body_velocity
    }

    /// Sample input, probe the terrain and tick, for hosts that drive the
    /// controller without the Bevy systems.
    pub fn step(
        &mut self,
        dt: f32,
        source: &mut impl InputSource,
        input: &mut InputBuffer,
        terrain: &impl TerrainQuery,
        shape: &ProbeShape,
        config: &MovementConfig,
    ) -> Option<Vec2> {
        let frame = input.sample(source);
        let readings = scan_surfaces(terrain, shape, config);
        self.tick(dt, &frame, &readings, config)
    }

    fn resolve_collisions(&mut self, readings: &SurfaceReadings, config: &MovementConfig) {
        let was_grounded = self.contacts.on_ground;
        self.contacts = SurfaceContacts::classify(readings, config);
        let contacts = self.contacts;

        if contacts.on_ground && !was_grounded {
            self.jump.reset(config);
            self.dash.reset();
            let impact_speed = self.velocity.y.abs();
            debug!("landed, impact speed {impact_speed}");
            self.events.push(ControllerEvent::Grounded {
                grounded: true,
                impact_speed,
            });
        } else if !contacts.on_ground && was_grounded {
            self.jump.start_coyote();
            self.dash.start_coyote();
            debug!("left ground");
            self.events.push(ControllerEvent::Grounded {
                grounded: false,
                impact_speed: 0.0,
            });
        } else if contacts.on_slope() {
            self.velocity.y = self.velocity.x * contacts.slope_factor();
            if self.velocity.x != 0.0 {
                self.velocity.y += config.grounding_force;
            }
        }

        if contacts.on_ceiling {
            self.velocity.y = self.velocity.y.min(0.0);
            self.external_velocity.y = self.external_velocity.y.min(0.0);
        }
    }

    fn resolve_jump(&mut self, frame: &InputFrame, config: &MovementConfig) {
        let ctx = JumpContext {
            pressed: frame.jump_pressed,
            held: frame.jump_held,
            on_ground: self.contacts.on_ground,
            on_wall: self.contacts.on_wall,
        };
        match self
            .jump
            .resolve(&ctx, &mut self.velocity, &mut self.external_velocity, config)
        {
            Some(JumpKind::Normal) => {
                debug!("jump");
                self.events.push(ControllerEvent::Jumped);
            }
            Some(JumpKind::Air) => {
                debug!(
                    "air jump, {} remaining",
                    self.jump.air_jumps_remaining()
                );
                self.events.push(ControllerEvent::AirJumped);
            }
            None => {}
        }
    }

    fn start_dash(&mut self, frame: &InputFrame, config: &MovementConfig) {
        let ctx = DashContext {
            pressed: frame.dash_pressed,
            last_input_x: frame.facing(),
            on_ground: self.contacts.on_ground,
            on_wall: self.contacts.on_wall,
            wall_direction: self.contacts.wall_direction,
        };
        if self.dash.try_start(&ctx, &mut self.external_velocity, config) {
            debug!("dash started at {:?}", self.dash.locked_velocity());
            self.events.push(ControllerEvent::Dash { started: true });
        }
    }
}

/// Everything the core systems need on a controlled entity, without any
/// physics body.
#[derive(Bundle, Default)]
pub struct PlatformerBundle {
    pub controller: PlatformerController,
    pub config: MovementConfig,
    pub keys: ControlKeys,
    pub input: InputBuffer,
    pub readings: SurfaceReadings,
    pub state: PlayerState,
}

impl PlatformerBundle {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }
}
