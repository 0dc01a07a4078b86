//! Jumping: buffering, coyote time, air jumps and early release.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// Which kind of jump was performed.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// From the ground or within coyote time.
    Normal,
    /// Spent one of the air jumps.
    Air,
}

/// What the jump resolution needs to know about this tick.
#[derive(Debug, Clone, Copy)]
pub struct JumpContext {
    /// Jump went down this tick.
    pub pressed: bool,
    pub held: bool,
    pub on_ground: bool,
    pub on_wall: bool,
}

/// Jump bookkeeping for one controller.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct JumpState {
    /// A committed jump may still be cut short by releasing the key.
    early_end_available: bool,
    /// The current jump was cut short.
    ended_early: bool,
    buffer_usable: bool,
    coyote_usable: bool,
    /// Time since the last jump press.
    buffer_elapsed: f32,
    /// Time since leaving the ground.
    coyote_elapsed: f32,
    air_jumps_remaining: u32,
}

impl Default for JumpState {
    fn default() -> Self {
        Self {
            early_end_available: false,
            ended_early: false,
            buffer_usable: false,
            coyote_usable: false,
            buffer_elapsed: f32::MAX,
            coyote_elapsed: f32::MAX,
            air_jumps_remaining: 0,
        }
    }
}

impl JumpState {
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.air_jumps_remaining
    }

    pub fn buffer_usable(&self) -> bool {
        self.buffer_usable
    }

    pub fn coyote_usable(&self) -> bool {
        self.coyote_usable
    }

    /// Remember a fresh press; the buffer window restarts.
    pub(crate) fn register_press(&mut self) {
        self.buffer_elapsed = 0.0;
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.buffer_elapsed += dt;
        self.coyote_elapsed += dt;
    }

    /// Called when leaving the ground.
    pub(crate) fn start_coyote(&mut self) {
        self.coyote_elapsed = 0.0;
    }

    /// Called on ground-enter: buffer and coyote become usable again and air
    /// jumps are refilled.
    pub(crate) fn reset(&mut self, config: &MovementConfig) {
        self.ended_early = false;
        self.early_end_available = false;
        self.buffer_usable = true;
        self.coyote_usable = true;
        self.air_jumps_remaining = config.air_jumps;
    }

    fn buffer_live(&self, config: &MovementConfig) -> bool {
        self.buffer_usable && self.buffer_elapsed < config.jump_buffer_time
    }

    fn coyote_live(&self, config: &MovementConfig) -> bool {
        self.coyote_usable && self.coyote_elapsed < config.coyote_time
    }

    /// Resolve this tick's jump.
    ///
    /// Detects early release first, then performs a normal jump when grounded
    /// or within coyote time, otherwise an air jump if any remain.
    pub(crate) fn resolve(
        &mut self,
        ctx: &JumpContext,
        velocity: &mut Vec2,
        external_velocity: &mut Vec2,
        config: &MovementConfig,
    ) -> Option<JumpKind> {
        let buffer_live = self.buffer_live(config);
        let coyote_live = self.coyote_live(config);

        if self.early_end_available
            && !self.ended_early
            && !ctx.on_ground
            && !ctx.on_wall
            && !ctx.held
            && velocity.y > 0.0
        {
            self.ended_early = true;
            self.early_end_available = false;
        }

        if !ctx.pressed && !buffer_live {
            return None;
        }

        if ctx.on_ground || coyote_live {
            self.commit();
            self.buffer_usable = false;
            self.coyote_usable = false;
            velocity.y = config.jump_strength;
            Some(JumpKind::Normal)
        } else if self.air_jumps_remaining > 0 {
            self.commit();
            self.air_jumps_remaining -= 1;
            velocity.y = config.jump_strength;
            // An air jump never inherits upward knockback.
            external_velocity.y = 0.0;
            Some(JumpKind::Air)
        } else {
            None
        }
    }

    fn commit(&mut self) {
        self.ended_early = false;
        self.early_end_available = true;
    }
}
