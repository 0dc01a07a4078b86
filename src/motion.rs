//! Velocity integration: gravity, acceleration and deceleration.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Inputs the integrator needs besides velocity.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationContext {
    pub dt: f32,
    /// Horizontal input in {-1, 0, 1}.
    pub input_x: f32,
    pub on_ground: bool,
    /// Side of the adjacent wall: -1 left, +1 right, 0 none.
    pub wall_direction: i8,
    /// The current jump was released early.
    pub ended_jump_early: bool,
}

/// Apply gravity while airborne.
///
/// Fall speed approaches `-max_fall_speed`. Gravity is multiplied by
/// `jump_end_early_gravity_modifier` while still rising after an early
/// release.
pub fn integrate_vertical(velocity: &mut Vec2, ctx: &IntegrationContext, config: &MovementConfig) {
    if ctx.on_ground {
        return;
    }

    let mut gravity = config.fall_acceleration;
    if ctx.ended_jump_early && velocity.y > 0.0 {
        gravity *= config.jump_end_early_gravity_modifier;
    }
    velocity.y = move_towards(velocity.y, -config.max_fall_speed, gravity * ctx.dt);
}

/// Apply horizontal acceleration or deceleration.
///
/// Input against the current motion stops it dead; no input decelerates
/// (ground or air rate); otherwise accelerate toward the run speed. Pushing
/// into an adjacent wall zeroes horizontal velocity; pushing away from it
/// accelerates normally.
pub fn integrate_horizontal(velocity: &mut Vec2, ctx: &IntegrationContext, config: &MovementConfig) {
    let input = ctx.input_x;

    if input != 0.0 && velocity.x != 0.0 && input.signum() != velocity.x.signum() {
        velocity.x = 0.0;
    } else if input == 0.0 {
        let deceleration = if ctx.on_ground {
            config.ground_deceleration
        } else {
            config.air_deceleration
        };
        velocity.x = move_towards(velocity.x, 0.0, deceleration * ctx.dt);
    } else {
        velocity.x = move_towards(
            velocity.x,
            input * config.max_run_speed,
            config.acceleration * ctx.dt,
        );
        if ctx.wall_direction != 0 && input.signum() == f32::from(ctx.wall_direction) {
            velocity.x = 0.0;
        }
    }
}
