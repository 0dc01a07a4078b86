//! Error types.
//!
//! The per-tick simulation never fails. Errors only arise while loading
//! configuration or when a controller entity is missing a collaborator it
//! needs, and both are reported once at setup time.

use std::path::PathBuf;

use bevy::prelude::Entity;
use thiserror::Error;

/// Failure loading a [`MovementConfig`](crate::config::MovementConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read movement config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid RON for a movement config.
    #[error("failed to parse movement config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// A controller entity is missing a collaborator the backend requires.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    #[error("platformer controller {0} has no collider to probe terrain with")]
    MissingCollider(Entity),

    #[error("platformer controller {0} has a collider that is not a capsule, ball or cuboid")]
    UnsupportedCollider(Entity),

    #[error("platformer controller {0} has no rigid body velocity to drive")]
    MissingBody(Entity),
}
