//! Raw collision query results.
//!
//! These structures hold what the probes saw this tick, before any
//! classification into ground, wall or ceiling.

use bevy::prelude::*;

/// Information about a shapecast collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance travelled along the cast before the hit.
    pub distance: f32,
    /// Normal of the surface at hit point.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// One probe direction's result: a hit flag and the contact normal.
///
/// The normal is [`Vec2::ZERO`] when nothing was found within the extended
/// normal-sampling distance.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceReading {
    pub hit: bool,
    pub normal: Vec2,
    /// Distance to the hit, `f32::MAX` on a miss.
    pub distance: f32,
}

impl SurfaceReading {
    /// Nothing in range.
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            distance: f32::MAX,
        }
    }

    /// A contact with the given normal at distance zero.
    pub fn touching(normal: Vec2) -> Self {
        Self {
            hit: true,
            normal,
            distance: 0.0,
        }
    }

    /// Build a reading from an optional cast result.
    ///
    /// `hit_distance` is the probe distance: a result further away than that
    /// still supplies a normal but does not count as contact.
    pub fn from_cast(cast: Option<CollisionData>, hit_distance: f32) -> Self {
        match cast {
            Some(data) => Self {
                hit: data.distance <= hit_distance,
                normal: data.normal,
                distance: data.distance,
            },
            None => Self::miss(),
        }
    }
}

/// Probe results for all four directions, refreshed every tick by the
/// backend's sensor systems.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct SurfaceReadings {
    pub down: SurfaceReading,
    pub up: SurfaceReading,
    pub left: SurfaceReading,
    pub right: SurfaceReading,
}

impl Default for SurfaceReadings {
    fn default() -> Self {
        Self::none()
    }
}

impl SurfaceReadings {
    /// Nothing detected in any direction.
    pub fn none() -> Self {
        Self {
            down: SurfaceReading::miss(),
            up: SurfaceReading::miss(),
            left: SurfaceReading::miss(),
            right: SurfaceReading::miss(),
        }
    }

    /// Standing on ground with the given normal, nothing else around.
    pub fn ground(normal: Vec2) -> Self {
        Self {
            down: SurfaceReading::touching(normal),
            ..Self::none()
        }
    }

    /// Builder: add a ceiling contact.
    pub fn with_ceiling(mut self, normal: Vec2) -> Self {
        self.up = SurfaceReading::touching(normal);
        self
    }

    /// Builder: add a wall contact on the left.
    pub fn with_left_wall(mut self, normal: Vec2) -> Self {
        self.left = SurfaceReading::touching(normal);
        self
    }

    /// Builder: add a wall contact on the right.
    pub fn with_right_wall(mut self, normal: Vec2) -> Self {
        self.right = SurfaceReading::touching(normal);
        self
    }
}
