//! Dashing: a fixed-duration, constant-velocity horizontal burst.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// What the dash needs to know about this tick.
#[derive(Debug, Clone, Copy)]
pub struct DashContext {
    /// Dash went down this tick.
    pub pressed: bool,
    /// Last nonzero horizontal input, used as the dash direction.
    pub last_input_x: f32,
    pub on_ground: bool,
    pub on_wall: bool,
    /// Side the wall is on: -1 left, +1 right.
    pub wall_direction: i8,
}

/// Dash bookkeeping for one controller.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DashState {
    active: bool,
    /// Primary dash charge.
    charge_available: bool,
    buffer_usable: bool,
    coyote_usable: bool,
    /// Velocity locked in at dash start.
    locked_velocity: Vec2,
    /// Time since the dash started.
    elapsed: f32,
    /// Time since the last dash ended.
    cooldown_elapsed: f32,
    buffer_elapsed: f32,
    coyote_elapsed: f32,
}

impl Default for DashState {
    fn default() -> Self {
        Self {
            active: false,
            charge_available: false,
            buffer_usable: false,
            coyote_usable: false,
            locked_velocity: Vec2::ZERO,
            elapsed: 0.0,
            cooldown_elapsed: f32::MAX,
            buffer_elapsed: f32::MAX,
            coyote_elapsed: f32::MAX,
        }
    }
}

impl DashState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn charge_available(&self) -> bool {
        self.charge_available
    }

    pub fn locked_velocity(&self) -> Vec2 {
        self.locked_velocity
    }

    pub(crate) fn register_press(&mut self) {
        self.buffer_elapsed = 0.0;
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        self.cooldown_elapsed += dt;
        self.buffer_elapsed += dt;
        self.coyote_elapsed += dt;
    }

    /// Called when leaving the ground.
    pub(crate) fn start_coyote(&mut self) {
        self.coyote_elapsed = 0.0;
    }

    /// Called on ground-enter: the charge, buffer and coyote windows become
    /// usable again. Touching a wall restores nothing.
    pub(crate) fn reset(&mut self) {
        self.charge_available = true;
        self.buffer_usable = true;
        self.coyote_usable = true;
    }

    fn buffer_live(&self, config: &MovementConfig) -> bool {
        self.buffer_usable && self.buffer_elapsed < config.dash_buffer_time
    }

    fn coyote_live(&self, config: &MovementConfig) -> bool {
        self.coyote_usable && self.coyote_elapsed < config.dash_coyote_time
    }

    /// Try to begin a dash. Returns true when one started.
    ///
    /// Starting clears `external_velocity` and locks the dash vector. An air
    /// dash that was not covered by coyote time spends the primary charge.
    pub(crate) fn try_start(
        &mut self,
        ctx: &DashContext,
        external_velocity: &mut Vec2,
        config: &MovementConfig,
    ) -> bool {
        let buffer_live = self.buffer_live(config);
        let coyote_live = self.coyote_live(config);

        if self.active
            || !(ctx.pressed || buffer_live)
            || !(self.charge_available || coyote_live)
            || self.cooldown_elapsed <= config.dash_cooldown_time
        {
            return false;
        }

        let direction = if ctx.on_wall {
            -f32::from(ctx.wall_direction)
        } else {
            ctx.last_input_x
        };
        self.locked_velocity = Vec2::new(config.dash_velocity * direction, 0.0);
        self.active = true;

        if !ctx.on_ground && !ctx.on_wall {
            if !coyote_live {
                self.charge_available = false;
                self.buffer_usable = false;
            }
            self.coyote_usable = false;
        }

        self.elapsed = 0.0;
        *external_velocity = Vec2::ZERO;
        true
    }

    /// Hold the locked dash velocity and end the dash once its time is up.
    ///
    /// Returns true on the tick the dash ends. The ending tick keeps
    /// `dash_end_horizontal_multiplier` of the horizontal speed and never
    /// leaves the body moving upward.
    pub(crate) fn maintain(&mut self, velocity: &mut Vec2, config: &MovementConfig) -> bool {
        if !self.active {
            return false;
        }

        *velocity = self.locked_velocity;
        if self.elapsed < config.dash_time {
            return false;
        }

        self.active = false;
        self.cooldown_elapsed = 0.0;
        velocity.x *= config.dash_end_horizontal_multiplier;
        velocity.y = velocity.y.min(0.0);
        true
    }
}
