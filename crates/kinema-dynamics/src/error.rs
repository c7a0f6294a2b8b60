//! Error type shared by the dynamics entry points.

use kinema_shape::{ShapeError, ShapeId};
use thiserror::Error;

use crate::{BodyHandle, MaterialId};

/// Failures surfaced by integration, impulse resolution, and world bookkeeping.
///
/// Numeric degeneracies (singular inertia, zero-length tangents) are not
/// errors; they resolve to zero contributions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A precondition on the inputs was violated: non-positive `dt`, a
    /// non-finite field, or a separating contact handed to the resolver.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The handle refers to a body that was removed.
    #[error("stale body handle {0:?}")]
    StaleHandle(BodyHandle),

    #[error("unknown shape {0:?}")]
    UnknownShape(ShapeId),

    #[error("unknown material {0:?}")]
    UnknownMaterial(MaterialId),

    /// All 65 536 material slots are taken.
    #[error("material registry is full (max 65536 materials)")]
    RegistryFull,

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl PhysicsError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T, E = PhysicsError> = std::result::Result<T, E>;
