//! Movement configuration.
//!
//! [`MovementConfig`] is an immutable bundle of tuning constants read by every
//! part of the controller. It can be built in code through the `with_*`
//! builders or loaded from a RON file.

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use ron::Options;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Collision filter bits identifying terrain.
///
/// Backends map this onto their own filtering (Rapier `CollisionGroups`
/// filters, for example). A probe only hits colliders whose membership
/// intersects the mask.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerrainMask(pub u32);

impl TerrainMask {
    /// Matches every collider.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing.
    pub const NONE: Self = Self(0);

    /// The raw filter bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for TerrainMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Tuning parameters for the platformer controller.
///
/// All speeds are in world units per second, accelerations in world units
/// per second squared and durations in seconds.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct MovementConfig {
    // === Movement ===
    /// Maximum horizontal velocity.
    pub max_run_speed: f32,
    /// Rate of horizontal velocity gain.
    pub acceleration: f32,
    /// Rate of horizontal velocity loss while on ground.
    pub ground_deceleration: f32,
    /// Rate of horizontal velocity loss while airborne.
    pub air_deceleration: f32,
    /// Constant vertical velocity added while moving on sloped ground.
    /// Negative values push the body into the slope.
    pub grounding_force: f32,

    // === Jump ===
    /// Number of jumps available while airborne, refilled on landing.
    pub air_jumps: u32,
    /// Vertical velocity set instantly on jumping.
    pub jump_strength: f32,
    /// Maximum downward vertical speed.
    pub max_fall_speed: f32,
    /// Rate of downward velocity gain while airborne.
    pub fall_acceleration: f32,
    /// Gravity multiplier while still rising after the jump key was released.
    pub jump_end_early_gravity_modifier: f32,
    /// How long a jump press is remembered.
    pub jump_buffer_time: f32,
    /// How long after leaving ground a jump still counts as grounded.
    pub coyote_time: f32,

    // === Dash ===
    /// Horizontal speed of a dash.
    pub dash_velocity: f32,
    /// Duration of a dash.
    pub dash_time: f32,
    /// Time that must pass after a dash ends before another can start.
    pub dash_cooldown_time: f32,
    /// Fraction of horizontal dash speed kept when the dash ends.
    pub dash_end_horizontal_multiplier: f32,
    /// How long a dash press is remembered.
    pub dash_buffer_time: f32,
    /// How long after leaving ground a dash is still usable.
    pub dash_coyote_time: f32,

    // === Collision ===
    /// Shape-cast distance for contact detection.
    pub probe_distance: f32,
    /// Maximum angle of walkable ground, in degrees from straight up.
    pub max_walk_angle: f32,
    /// Colliders considered terrain.
    pub terrain_mask: TerrainMask,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Movement
            max_run_speed: 10.0,
            acceleration: 100.0,
            ground_deceleration: 200.0,
            air_deceleration: 100.0,
            grounding_force: -2.0,

            // Jump
            air_jumps: 1,
            jump_strength: 18.0,
            max_fall_speed: 40.0,
            fall_acceleration: 50.0,
            jump_end_early_gravity_modifier: 5.0,
            jump_buffer_time: 0.1,
            coyote_time: 0.1,

            // Dash
            dash_velocity: 25.0,
            dash_time: 0.2,
            dash_cooldown_time: 0.2,
            dash_end_horizontal_multiplier: 0.25,
            dash_buffer_time: 0.1,
            dash_coyote_time: 0.1,

            // Collision
            probe_distance: 0.05,
            max_walk_angle: 30.0,
            terrain_mask: TerrainMask::ALL,
        }
    }
}

/// RON options with implicit `Some` so optional fields read naturally.
fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

impl MovementConfig {
    /// Create a config with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuning for games measured in pixels rather than meters.
    ///
    /// Every distance-based value is multiplied by `pixels_per_unit`;
    /// durations, counts and ratios are unchanged.
    pub fn pixels(pixels_per_unit: f32) -> Self {
        let base = Self::default();
        Self {
            max_run_speed: base.max_run_speed * pixels_per_unit,
            acceleration: base.acceleration * pixels_per_unit,
            ground_deceleration: base.ground_deceleration * pixels_per_unit,
            air_deceleration: base.air_deceleration * pixels_per_unit,
            grounding_force: base.grounding_force * pixels_per_unit,
            jump_strength: base.jump_strength * pixels_per_unit,
            max_fall_speed: base.max_fall_speed * pixels_per_unit,
            fall_acceleration: base.fall_acceleration * pixels_per_unit,
            dash_velocity: base.dash_velocity * pixels_per_unit,
            probe_distance: base.probe_distance * pixels_per_unit,
            ..base
        }
    }

    /// Parse a config from RON text. Missing fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron_options().from_str(text)?)
    }

    /// Load a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Serialize to pretty RON, suitable for writing a tuning file.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron_options().to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Builder: set horizontal movement parameters.
    pub fn with_movement(mut self, max_run_speed: f32, acceleration: f32) -> Self {
        self.max_run_speed = max_run_speed;
        self.acceleration = acceleration;
        self
    }

    /// Builder: set ground and air deceleration.
    pub fn with_deceleration(mut self, ground: f32, air: f32) -> Self {
        self.ground_deceleration = ground;
        self.air_deceleration = air;
        self
    }

    /// Builder: set the slope grounding force.
    pub fn with_grounding_force(mut self, force: f32) -> Self {
        self.grounding_force = force;
        self
    }

    /// Builder: set jump strength and number of air jumps.
    pub fn with_jump(mut self, strength: f32, air_jumps: u32) -> Self {
        self.jump_strength = strength;
        self.air_jumps = air_jumps;
        self
    }

    /// Builder: set the number of air jumps.
    pub fn with_air_jumps(mut self, air_jumps: u32) -> Self {
        self.air_jumps = air_jumps;
        self
    }

    /// Builder: set fall speed cap and gravity.
    pub fn with_fall(mut self, max_fall_speed: f32, fall_acceleration: f32) -> Self {
        self.max_fall_speed = max_fall_speed;
        self.fall_acceleration = fall_acceleration;
        self
    }

    /// Builder: set jump buffer and coyote windows.
    pub fn with_jump_windows(mut self, buffer_time: f32, coyote_time: f32) -> Self {
        self.jump_buffer_time = buffer_time;
        self.coyote_time = coyote_time;
        self
    }

    /// Builder: set dash speed, duration and cooldown.
    pub fn with_dash(mut self, velocity: f32, time: f32, cooldown: f32) -> Self {
        self.dash_velocity = velocity;
        self.dash_time = time;
        self.dash_cooldown_time = cooldown;
        self
    }

    /// Builder: set dash buffer and coyote windows.
    pub fn with_dash_windows(mut self, buffer_time: f32, coyote_time: f32) -> Self {
        self.dash_buffer_time = buffer_time;
        self.dash_coyote_time = coyote_time;
        self
    }

    /// Builder: set probe distance and max walkable angle (degrees).
    pub fn with_probe(mut self, distance: f32, max_walk_angle: f32) -> Self {
        self.probe_distance = distance;
        self.max_walk_angle = max_walk_angle;
        self
    }

    /// Builder: set the terrain mask.
    pub fn with_terrain_mask(mut self, mask: TerrainMask) -> Self {
        self.terrain_mask = mask;
        self
    }
}
