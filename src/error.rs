//! Error types surfaced by the physics core.

use thiserror::Error;

use crate::core::shape::ShapeKind;
use crate::world::WorldState;

/// Errors returned by configuration, lifecycle, and shape construction calls.
///
/// Anomalies that happen *during* a simulation step (slow frames, stale
/// constraint handles) are logged and absorbed instead of being returned.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A configuration value is out of range.
    #[error("invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// A collision shape kind cannot be built from dimensions alone.
    #[error("unsupported collision shape kind: {0:?}")]
    UnsupportedShape(ShapeKind),

    /// The world lifecycle does not allow the requested transition.
    #[error("invalid world state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// State the world was in.
        from: WorldState,
        /// State that was requested.
        to: WorldState,
    },

    /// The simulation thread could not be spawned.
    #[error("failed to spawn simulation thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// The simulation thread panicked before it could be joined.
    #[error("simulation thread panicked")]
    ThreadPanicked,
}
