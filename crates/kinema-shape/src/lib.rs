//! Collision shapes: a safe sum type over every supported geometry, an
//! append-only shape arena, and a flat, position-independent byte encoding.
//!
//! Shapes are created once (usually by an asset pipeline), never mutated, and
//! shared by any number of rigid bodies through [`ShapeId`] handles.

mod arena;
mod bvh;
mod codec;
mod error;
mod shape;
mod terrain;

pub use arena::{ShapeArena, ShapeId};
pub use bvh::{BvhNode, BvhNodeKind, ShapeBvh};
pub use codec::{HEADER_SIZE, MAX_NESTING, ShapeBuffer, ShapeHeader};
pub use error::ShapeError;
pub use shape::{Shape, ShapeFlags, ShapeKind, ShapeTag};
pub use terrain::Terrain;
