//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::parry::shape::{Capsule, SharedShape};
use bevy_rapier2d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::{CollisionData, SurfaceReadings};
use crate::config::MovementConfig;
use crate::controller::{PlatformerBundle, PlatformerController};
use crate::detection::{ProbeFilter, ProbeShape, TerrainQuery, scan_surfaces};
use crate::error::SetupError;
use crate::ControllerSet;

/// Rapier2D physics backend for the platformer controller.
///
/// Velocities are written straight to [`Velocity::linvel`]. Terrain probing
/// is done by [`rapier_probe_surfaces`], which receives the Rapier context as
/// a system parameter.
pub struct Rapier2dBackend;

impl CharacterPhysicsBackend for Rapier2dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }
}

/// Plugin that sets up Rapier2D-specific systems for the platformer controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (validate_new_controllers, rapier_probe_surfaces)
                .chain()
                .in_set(ControllerSet::Sensors),
        );
    }
}

/// Probe capsule for a collider at `position`.
///
/// Capsules are used as is, balls become a capsule without inner segment and
/// cuboids are approximated by the capsule fitting their extents. Other shapes
/// are not supported.
pub fn probe_shape(collider: &Collider, position: Vec2) -> Option<ProbeShape> {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let center = (segment.a() + segment.b()) * 0.5;
        let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
        Some(ProbeShape::capsule(
            position + center,
            half_height,
            capsule.radius(),
        ))
    } else if let Some(ball) = collider.as_ball() {
        Some(ProbeShape::capsule(position, 0.0, ball.radius()))
    } else {
        collider
            .as_cuboid()
            .map(|cuboid| ProbeShape::from_size(position, cuboid.half_extents() * 2.0))
    }
}

/// [`TerrainQuery`] over the Rapier query pipeline, excluding one body.
pub struct RapierTerrain<'a> {
    context: &'a RapierContext<'a>,
    exclude: Entity,
}

impl<'a> RapierTerrain<'a> {
    pub fn new(context: &'a RapierContext<'a>, exclude: Entity) -> Self {
        Self { context, exclude }
    }

    fn filter(&self, filter: &ProbeFilter) -> QueryFilter<'static> {
        let mut query = QueryFilter::default()
            .exclude_rigid_body(self.exclude)
            .exclude_collider(self.exclude)
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(filter.mask.bits()),
            ));
        if !filter.include_triggers {
            query = query.exclude_sensors();
        }
        query
    }
}

/// Shape used by the Rapier queries, kept clear of resting contacts by
/// `skin` on every side.
fn parry_capsule(shape: &ProbeShape, skin: f32) -> Capsule {
    let radius = (shape.radius - skin).max(f32::EPSILON);
    Capsule::new_y(shape.half_height, radius)
}

impl TerrainQuery for RapierTerrain<'_> {
    fn cast(
        &self,
        shape: &ProbeShape,
        direction: Vec2,
        max_distance: f32,
        filter: &ProbeFilter,
    ) -> Option<CollisionData> {
        // The cast starts from a slightly thinner capsule so the surface the
        // body rests on is not reported by the sideways and upward probes.
        let skin = (max_distance * 0.25).min(shape.radius * 0.5);
        let capsule = Collider::from(SharedShape::new(parry_capsule(shape, skin)));

        self.context
            .cast_shape(
                shape.center,
                0.0,
                direction,
                &capsule,
                ShapeCastOptions {
                    max_time_of_impact: max_distance + skin,
                    stop_at_penetration: false,
                    compute_impact_geometry_on_penetration: true,
                    ..default()
                },
                self.filter(filter),
            )
            .map(|(hit_entity, hit)| {
                let mut normal = hit
                    .details
                    .map(|d| d.normal1)
                    .unwrap_or(-direction)
                    .normalize_or_zero();
                // Report the surface normal, which faces against the cast.
                if normal.dot(direction) > 0.0 {
                    normal = -normal;
                }
                let distance = (hit.time_of_impact - skin).max(0.0);
                let hit_point = hit
                    .details
                    .map(|d| d.witness1)
                    .unwrap_or(shape.center + direction * hit.time_of_impact);
                CollisionData::new(distance, normal, hit_point, Some(hit_entity))
            })
    }

    fn overlaps(&self, shape: &ProbeShape, filter: &ProbeFilter) -> bool {
        let capsule = Collider::from(SharedShape::new(parry_capsule(shape, 0.0)));
        self.context
            .query_pipeline
            .intersection_with_shape(
                self.context.colliders,
                self.context.rigidbody_set,
                shape.center,
                0.0,
                &capsule,
                self.filter(filter),
            )
            .is_some()
    }
}

/// Refresh [`SurfaceReadings`] for every controller from Rapier shape casts.
pub fn rapier_probe_surfaces(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<
        (
            Entity,
            &GlobalTransform,
            &Collider,
            &MovementConfig,
            &mut SurfaceReadings,
        ),
        With<PlatformerController>,
    >,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, collider, config, mut readings) in &mut q_controllers {
        let position = transform.translation().xy();
        let Some(shape) = probe_shape(collider, position) else {
            *readings = SurfaceReadings::none();
            continue;
        };

        let terrain = RapierTerrain::new(&context, entity);
        *readings = scan_surfaces(&terrain, &shape, config);
    }
}

/// Check setup preconditions once for each newly added controller.
pub fn validate_new_controllers(
    q_added: Query<
        (Entity, Option<&Collider>, Has<RigidBody>, Has<Velocity>),
        Added<PlatformerController>,
    >,
) {
    for (entity, collider, has_body, has_velocity) in &q_added {
        let problem = match collider {
            None => Some(SetupError::MissingCollider(entity)),
            Some(collider) if probe_shape(collider, Vec2::ZERO).is_none() => {
                Some(SetupError::UnsupportedCollider(entity))
            }
            Some(_) if !has_body || !has_velocity => Some(SetupError::MissingBody(entity)),
            Some(_) => None,
        };
        if let Some(problem) = problem {
            error!("{problem}");
        }
    }
}

/// Complete Rapier2D platformer character: controller components and a
/// dynamic body that only moves at the velocities the controller writes.
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `gravity_scale`: zero, the controller applies its own gravity
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `friction`: zero with the `Min` combine rule, so walls do not hold the body
///
/// # Example
///
/// ```ignore
/// commands.spawn((
///     Rapier2dPlatformerBundle::new(MovementConfig::default()),
///     Collider::capsule_y(0.5, 0.5),
///     Transform::from_xyz(0.0, 2.0, 0.0),
/// ));
/// ```
#[derive(Bundle)]
pub struct Rapier2dPlatformerBundle {
    pub platformer: PlatformerBundle,
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub gravity_scale: GravityScale,
    pub locked_axes: LockedAxes,
    pub friction: Friction,
}

impl Default for Rapier2dPlatformerBundle {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}

impl Rapier2dPlatformerBundle {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            platformer: PlatformerBundle::new(config),
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::zero(),
            gravity_scale: GravityScale(0.0),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
        }
    }

    /// Set the rigid body type, e.g. [`RigidBody::KinematicVelocityBased`].
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::SystemState;

    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, TransformPlugin));
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec2::new(50.0, 30.0)),
            ))
            .id();

        app.update();

        let vel = Rapier2dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 50.0).abs() < 0.01);

        Rapier2dBackend::set_velocity(app.world_mut(), entity, Vec2::new(100.0, 0.0));

        let vel = Rapier2dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 100.0).abs() < 0.01);
        assert!(vel.y.abs() < 0.01);
    }

    #[test]
    fn probe_shape_from_colliders() {
        let capsule = probe_shape(&Collider::capsule_y(0.5, 0.25), Vec2::new(1.0, 2.0));
        let capsule = capsule.unwrap();
        assert_eq!(capsule.center, Vec2::new(1.0, 2.0));
        assert!((capsule.half_height - 0.5).abs() < 1e-6);
        assert!((capsule.radius - 0.25).abs() < 1e-6);

        let ball = probe_shape(&Collider::ball(0.5), Vec2::ZERO).unwrap();
        assert_eq!(ball.half_height, 0.0);
        assert_eq!(ball.radius, 0.5);

        let cuboid = probe_shape(&Collider::cuboid(0.5, 1.0), Vec2::ZERO).unwrap();
        assert_eq!(cuboid.half_extent_y(), 1.0);

        let triangle = Collider::triangle(Vec2::ZERO, Vec2::X, Vec2::Y);
        assert!(probe_shape(&triangle, Vec2::ZERO).is_none());
    }

    #[test]
    fn bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier2dPlatformerBundle::default(),
                Collider::capsule_y(0.5, 0.5),
            ))
            .id();

        app.update();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<Velocity>(entity).is_some());
        assert!(app.world().get::<PlatformerController>(entity).is_some());
        assert_eq!(
            app.world().get::<GravityScale>(entity).map(|g| g.0),
            Some(0.0)
        );
    }

    #[test]
    fn terrain_cast_finds_floor_below() {
        let mut app = create_test_app();
        app.world_mut().spawn((
            Transform::from_xyz(0.0, -0.5, 0.0),
            RigidBody::Fixed,
            Collider::cuboid(10.0, 0.5),
        ));
        let body = app
            .world_mut()
            .spawn((Transform::from_xyz(0.0, 1.02, 0.0), Collider::capsule_y(0.5, 0.5)))
            .id();

        for _ in 0..3 {
            app.update();
        }

        let mut state: SystemState<ReadRapierContext> = SystemState::new(app.world_mut());
        let param = state.get(app.world());
        let context = param.single().unwrap();
        let terrain = RapierTerrain::new(&context, body);
        let shape = ProbeShape::capsule(Vec2::new(0.0, 1.02), 0.5, 0.5);
        let filter = ProbeFilter::terrain(Default::default());

        let down = terrain.cast(&shape, Vec2::NEG_Y, 0.1, &filter).unwrap();
        assert!((down.distance - 0.02).abs() < 0.01);
        assert!(down.normal.y > 0.99);

        assert!(terrain.cast(&shape, Vec2::Y, 0.1, &filter).is_none());
        assert!(terrain.cast(&shape, Vec2::X, 0.1, &filter).is_none());

        assert!(!terrain.overlaps(&shape, &filter));
        assert!(terrain.overlaps(&shape.at(Vec2::new(0.0, 0.5)), &filter));
    }
}
