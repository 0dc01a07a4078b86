//! Physics backend abstraction.
//!
//! A backend owns the rigid body. It receives the velocity the controller
//! computed each tick and keeps [`SurfaceReadings`](crate::collision::SurfaceReadings)
//! up to date from its own collision queries, usually through a system it
//! adds to [`ControllerSet::Sensors`](crate::ControllerSet::Sensors) in
//! [`CharacterPhysicsBackend::plugin`].

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// # Example
///
/// For an example implementation, see the `rapier` module's `Rapier2dBackend`
/// which implements this trait for Bevy Rapier2D.
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
/// use msg_platformer_controller::backend::NoOpBackendPlugin;
///
/// #[derive(Component, Default)]
/// struct Velocity(Vec2);
///
/// struct Kinematic;
///
/// impl CharacterPhysicsBackend for Kinematic {
///     type VelocityComponent = Velocity;
///
///     fn plugin() -> impl Plugin {
///         NoOpBackendPlugin
///     }
///
///     fn get_velocity(world: &World, entity: Entity) -> Vec2 {
///         world.get::<Velocity>(entity).map(|v| v.0).unwrap_or(Vec2::ZERO)
///     }
///
///     fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
///         if let Some(mut v) = world.get_mut::<Velocity>(entity) {
///             v.0 = velocity;
///         }
///     }
/// }
/// ```
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// The velocity component type used by this backend.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend, including its sensor
    /// systems.
    fn plugin() -> impl Plugin;

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec2;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Get the fixed timestep delta time.
    ///
    /// Falls back to the configured timestep when `FixedUpdate` is run by
    /// hand and no fixed delta has been produced yet.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|time| {
                let delta = time.delta_secs();
                if delta > 0.0 {
                    delta
                } else {
                    time.timestep().as_secs_f32()
                }
            })
            .unwrap_or(1.0 / 64.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
