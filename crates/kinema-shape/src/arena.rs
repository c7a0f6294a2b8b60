//! Append-only storage for shared, immutable shapes.

use crate::Shape;

/// Stable handle to a shape stored in a [`ShapeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// Owns every shape in a physics world. Shapes are never removed or mutated,
/// so a [`ShapeId`] stays valid for the arena's lifetime and any number of
/// bodies may reference the same shape.
#[derive(Clone, Debug, Default)]
pub struct ShapeArena {
    shapes: Vec<Shape>,
}

impl ShapeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a shape and returns its handle. IDs are assigned sequentially from 0.
    pub fn insert(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        tracing::debug!(id = id.0, tag = ?shape.tag(), "shape inserted");
        self.shapes.push(shape);
        id
    }

    /// Returns the shape for `id`, or `None` if no such shape was inserted.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0 as usize)
    }

    /// Returns the number of stored shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if no shapes have been inserted.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Iterates over `(id, shape)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .map(|(i, s)| (ShapeId(i as u32), s))
    }
}
