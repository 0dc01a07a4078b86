//! Terrain probing and contact classification.
//!
//! Backends implement [`TerrainQuery`]; [`scan_surfaces`] turns it into
//! [`SurfaceReadings`] for the four probe directions, and
//! [`SurfaceContacts::classify`] decides what counts as ground, wall and
//! ceiling for the controller.

use bevy::prelude::*;

use crate::collision::{CollisionData, SurfaceReading, SurfaceReadings};
use crate::config::{MovementConfig, TerrainMask};

/// Size reduction applied to the collider for clearance checks, so the body
/// does not report itself as overlapping the surface it rests on.
pub const CLEARANCE_SHRINK: f32 = 0.1;

/// Vertical capsule used for probing, matching the live collider.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProbeShape {
    /// World-space center of the capsule.
    pub center: Vec2,
    /// Half length of the capsule's inner segment.
    pub half_height: f32,
    pub radius: f32,
}

impl ProbeShape {
    /// Capsule with its inner segment along Y.
    pub fn capsule(center: Vec2, half_height: f32, radius: f32) -> Self {
        Self {
            center,
            half_height: half_height.max(0.0),
            radius: radius.max(0.0),
        }
    }

    /// Capsule fitting a box of the given full `size`, as an engine would
    /// build one from collider width/height.
    pub fn from_size(center: Vec2, size: Vec2) -> Self {
        let radius = size.x * 0.5;
        Self::capsule(center, size.y * 0.5 - radius, radius)
    }

    /// A shape without any extent never hits anything.
    pub fn is_degenerate(&self) -> bool {
        self.radius <= 0.0 && self.half_height <= 0.0
    }

    /// Same shape moved to `center`.
    pub fn at(self, center: Vec2) -> Self {
        Self { center, ..self }
    }

    /// Same shape with its overall width and height reduced by `amount`.
    pub fn shrunk(self, amount: f32) -> Self {
        Self {
            radius: (self.radius - amount * 0.5).max(0.0),
            ..self
        }
    }

    /// Distance from center to the bottom of the capsule.
    pub fn half_extent_y(&self) -> f32 {
        self.half_height + self.radius
    }
}

/// Per-query filtering.
///
/// Trigger volumes are excluded unless `include_triggers` is set, on every
/// call, without touching any engine-wide query settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeFilter {
    pub mask: TerrainMask,
    pub include_triggers: bool,
}

impl ProbeFilter {
    /// Solid terrain only.
    pub fn terrain(mask: TerrainMask) -> Self {
        Self {
            mask,
            include_triggers: false,
        }
    }
}

/// Point-in-time geometry queries against the current terrain snapshot.
///
/// Implemented by physics backends. Implementations must exclude the casting
/// body itself.
pub trait TerrainQuery {
    /// Sweep `shape` along `direction` (normalized) for up to `max_distance`
    /// and return the first hit.
    fn cast(
        &self,
        shape: &ProbeShape,
        direction: Vec2,
        max_distance: f32,
        filter: &ProbeFilter,
    ) -> Option<CollisionData>;

    /// Whether `shape` overlaps anything matching `filter`.
    fn overlaps(&self, shape: &ProbeShape, filter: &ProbeFilter) -> bool;
}

/// Cast the probes in all four directions.
///
/// Each cast reaches twice the probe distance so that a normal is available
/// just before contact; only hits within `probe_distance` count as contact.
pub fn scan_surfaces(
    query: &impl TerrainQuery,
    shape: &ProbeShape,
    config: &MovementConfig,
) -> SurfaceReadings {
    if shape.is_degenerate() {
        return SurfaceReadings::none();
    }

    let filter = ProbeFilter::terrain(config.terrain_mask);
    let reach = config.probe_distance * 2.0;
    let read = |direction: Vec2| {
        SurfaceReading::from_cast(
            query.cast(shape, direction, reach, &filter),
            config.probe_distance,
        )
    };

    SurfaceReadings {
        down: read(Vec2::NEG_Y),
        up: read(Vec2::Y),
        left: read(Vec2::NEG_X),
        right: read(Vec2::X),
    }
}

/// Whether the body would fit at `position`.
///
/// Reserved for stand/crouch style transitions. The shape is shrunk by
/// [`CLEARANCE_SHRINK`] to avoid false positives against resting contacts.
pub fn position_clear(
    query: &impl TerrainQuery,
    shape: &ProbeShape,
    position: Vec2,
    config: &MovementConfig,
) -> bool {
    let shape = shape.at(position).shrunk(CLEARANCE_SHRINK);
    if shape.is_degenerate() {
        return true;
    }
    !query.overlaps(&shape, &ProbeFilter::terrain(config.terrain_mask))
}

/// Angle between `normal` and straight up, in degrees. Zero for a zero normal.
pub fn angle_from_up(normal: Vec2) -> f32 {
    let length = normal.length();
    if length <= f32::EPSILON {
        return 0.0;
    }
    (normal.y / length).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Contact classification derived from one tick's readings.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceContacts {
    pub on_ground: bool,
    pub ground_normal: Vec2,
    /// Ground slope in degrees from up. Meaningful when `ground_normal` is nonzero.
    pub ground_angle: f32,

    pub on_ceiling: bool,
    pub ceiling_normal: Vec2,

    pub on_wall: bool,
    /// Side the wall is on: -1 left, +1 right, 0 none.
    pub wall_direction: i8,
    pub wall_normal: Vec2,
}

impl SurfaceContacts {
    /// Classify readings against the walkable-angle limit.
    pub fn classify(readings: &SurfaceReadings, config: &MovementConfig) -> Self {
        let ground_normal = readings.down.normal;
        let ground_angle = angle_from_up(ground_normal);
        let on_ground = readings.down.hit && ground_angle <= config.max_walk_angle;

        let ceiling_normal = readings.up.normal;
        let on_ceiling = readings.up.hit && ceiling_normal.y.abs() > ceiling_normal.x.abs();

        let is_wall =
            |reading: &SurfaceReading| reading.hit && angle_from_up(reading.normal) > config.max_walk_angle;
        let side = match (is_wall(&readings.left), is_wall(&readings.right)) {
            (true, true) if readings.right.distance < readings.left.distance => Some((1, readings.right)),
            (true, _) => Some((-1, readings.left)),
            (false, true) => Some((1, readings.right)),
            (false, false) => None,
        };
        let (wall_direction, wall_normal) = side
            .map(|(direction, reading)| (direction, reading.normal))
            .unwrap_or((0, Vec2::ZERO));

        Self {
            on_ground,
            ground_normal,
            ground_angle,
            on_ceiling,
            ceiling_normal,
            on_wall: wall_direction != 0,
            wall_direction,
            wall_normal,
        }
    }

    /// Whether the ground under the body is sloped (normal not vertical).
    pub fn on_slope(&self) -> bool {
        self.on_ground
            && self.ground_normal != Vec2::ZERO
            && (self.ground_normal.y.abs() - 1.0).abs() > 1e-6
    }

    /// Vertical velocity per unit of horizontal velocity that follows the
    /// ground surface.
    pub fn slope_factor(&self) -> f32 {
        if self.ground_normal.y == 0.0 {
            0.0
        } else {
            -self.ground_normal.x / self.ground_normal.y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat floor at y = 0 and optional wall at x = `wall_x`, probed
    /// analytically against the capsule's extents.
    struct Room {
        wall_x: Option<f32>,
        ceiling_y: Option<f32>,
    }

    impl TerrainQuery for Room {
        fn cast(
            &self,
            shape: &ProbeShape,
            direction: Vec2,
            max_distance: f32,
            _filter: &ProbeFilter,
        ) -> Option<CollisionData> {
            let bottom = shape.center.y - shape.half_extent_y();
            let top = shape.center.y + shape.half_extent_y();
            let (gap, normal) = if direction == Vec2::NEG_Y {
                (bottom, Vec2::Y)
            } else if direction == Vec2::Y {
                (self.ceiling_y? - top, Vec2::NEG_Y)
            } else if direction == Vec2::X {
                (self.wall_x? - (shape.center.x + shape.radius), Vec2::NEG_X)
            } else {
                return None;
            };
            (gap >= 0.0 && gap <= max_distance)
                .then(|| CollisionData::new(gap, normal, shape.center + direction * gap, None))
        }

        fn overlaps(&self, shape: &ProbeShape, _filter: &ProbeFilter) -> bool {
            shape.center.y - shape.half_extent_y() < 0.0
        }
    }

    fn body_at(y: f32) -> ProbeShape {
        ProbeShape::from_size(Vec2::new(0.0, y), Vec2::new(1.0, 2.0))
    }

    #[test]
    fn from_size_builds_capsule() {
        let shape = body_at(1.0);
        assert_eq!(shape.radius, 0.5);
        assert_eq!(shape.half_height, 0.5);
        assert_eq!(shape.half_extent_y(), 1.0);
    }

    #[test]
    fn resting_body_touches_ground() {
        let room = Room { wall_x: None, ceiling_y: None };
        let readings = scan_surfaces(&room, &body_at(1.0), &MovementConfig::default());
        assert!(readings.down.hit);
        assert_eq!(readings.down.normal, Vec2::Y);
        assert!(!readings.up.hit);
        assert_eq!(readings.up.normal, Vec2::ZERO);
    }

    #[test]
    fn hovering_body_samples_normal_without_contact() {
        let room = Room { wall_x: None, ceiling_y: None };
        // 0.075 above ground: beyond probe distance, inside normal reach.
        let readings = scan_surfaces(&room, &body_at(1.075), &MovementConfig::default());
        assert!(!readings.down.hit);
        assert_eq!(readings.down.normal, Vec2::Y);
    }

    #[test]
    fn degenerate_shape_sees_nothing() {
        let room = Room { wall_x: None, ceiling_y: None };
        let shape = ProbeShape::capsule(Vec2::ZERO, 0.0, 0.0);
        assert_eq!(
            scan_surfaces(&room, &shape, &MovementConfig::default()),
            SurfaceReadings::none()
        );
    }

    #[test]
    fn walls_and_ceilings_are_detected() {
        let room = Room {
            wall_x: Some(0.52),
            ceiling_y: Some(2.01),
        };
        let config = MovementConfig::default();
        let readings = scan_surfaces(&room, &body_at(1.0), &config);
        let contacts = SurfaceContacts::classify(&readings, &config);
        assert!(contacts.on_ground);
        assert!(contacts.on_ceiling);
        assert!(contacts.on_wall);
        assert_eq!(contacts.wall_direction, 1);
        assert_eq!(contacts.wall_normal, Vec2::NEG_X);
    }

    #[test]
    fn position_clear_ignores_resting_contact() {
        let room = Room { wall_x: None, ceiling_y: None };
        let config = MovementConfig::default();
        let shape = body_at(1.0);
        assert!(position_clear(&room, &shape, Vec2::new(0.0, 1.0), &config));
        assert!(!position_clear(&room, &shape, Vec2::new(0.0, 0.5), &config));
    }

    #[test]
    fn steep_ground_is_not_ground() {
        let config = MovementConfig::default();
        let steep = Vec2::new(-0.6, 0.8); // ~36.9 degrees
        let contacts = SurfaceContacts::classify(&SurfaceReadings::ground(steep), &config);
        assert!(!contacts.on_ground);

        let gentle = Vec2::new(-0.5, 1.0).normalize(); // ~26.6 degrees
        let contacts = SurfaceContacts::classify(&SurfaceReadings::ground(gentle), &config);
        assert!(contacts.on_ground);
        assert!(contacts.on_slope());
    }

    #[test]
    fn sideways_ceiling_is_not_ceiling() {
        let config = MovementConfig::default();
        let readings = SurfaceReadings::none().with_ceiling(Vec2::new(0.8, -0.6));
        assert!(!SurfaceContacts::classify(&readings, &config).on_ceiling);

        let readings = SurfaceReadings::none().with_ceiling(Vec2::new(0.6, -0.8));
        assert!(SurfaceContacts::classify(&readings, &config).on_ceiling);
    }

    #[test]
    fn walkable_side_hit_is_not_wall() {
        let config = MovementConfig::default();
        let readings = SurfaceReadings::none().with_left_wall(Vec2::new(0.3, 0.95).normalize());
        assert!(!SurfaceContacts::classify(&readings, &config).on_wall);
    }

    #[test]
    fn nearer_wall_wins() {
        let config = MovementConfig::default();
        let mut readings = SurfaceReadings::none()
            .with_left_wall(Vec2::X)
            .with_right_wall(Vec2::NEG_X);
        readings.left.distance = 0.04;
        readings.right.distance = 0.01;
        let contacts = SurfaceContacts::classify(&readings, &config);
        assert_eq!(contacts.wall_direction, 1);
    }

    #[test]
    fn slope_factor_follows_surface() {
        let config = MovementConfig::default();
        let normal = Vec2::new(-0.25, 1.0).normalize();
        let contacts = SurfaceContacts::classify(&SurfaceReadings::ground(normal), &config);
        assert!((contacts.slope_factor() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn angle_from_up_degrees() {
        assert_eq!(angle_from_up(Vec2::ZERO), 0.0);
        assert!((angle_from_up(Vec2::X) - 90.0).abs() < 1e-4);
        assert!(angle_from_up(Vec2::Y).abs() < 1e-4);
    }
}
