//! Collision core error types

use thiserror::Error;

use crate::foundation::collections::{ColliderId, ListenerId};

/// Errors raised by collision core operations.
///
/// All of these are programmer errors at the call site; degenerate geometry
/// is never reported here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A broad-phase proxy was inserted twice for the same id
    #[error("Collider is already registered in the broad-phase")]
    AlreadyRegistered,

    /// The collider handle is stale or was never issued by this world
    #[error("Unknown collider: {0:?}")]
    UnknownCollider(ColliderId),

    /// The listener handle is stale or was never issued by this world
    #[error("Unknown listener: {0:?}")]
    UnknownListener(ListenerId),

    /// Shape parameters are malformed (negative radius, concave polygon, ...)
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Layer index outside `0..32`
    #[error("Invalid layer index {0} (expected 0..=31)")]
    InvalidLayer(u32),

    /// Layer name or index registered twice
    #[error("Layer already registered: {0}")]
    DuplicateLayer(String),

    /// Layer name is not in the registry
    #[error("Unknown layer name: {0}")]
    UnknownLayer(String),

    /// Transform or offset contains NaN or infinity
    #[error("Transform contains a non-finite component")]
    NonFiniteTransform,

    /// World configuration failed validation
    #[error("Invalid collision world config: {0}")]
    InvalidConfig(String),

    /// The world behind a command sender has been dropped
    #[error("Collision world has been dropped")]
    WorldClosed,
}

/// Result alias for collision core operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
