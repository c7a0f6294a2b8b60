//! Bounding-volume tree over a list of child shapes.
//!
//! Nodes live in one flat array and refer to each other and to their leaf
//! shapes by index, so the tree survives byte copies without fix-up. Node 0
//! is the root; every internal node's children have larger indices than the
//! node itself.

use kinema_math::Aabb;

use crate::{Shape, ShapeError};

/// Payload of a single tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BvhNodeKind {
    /// References `children[child]`.
    Leaf { child: u32 },
    /// References two nodes in the node array.
    Internal { left: u32, right: u32 },
}

/// One node of a [`ShapeBvh`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhNode {
    /// Bounds of everything below this node, in the tree's frame.
    pub bounds: Aabb,
    pub kind: BvhNodeKind,
}

/// Flat bounding-volume hierarchy. Immutable once built.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ShapeBvh {
    nodes: Vec<BvhNode>,
    children: Vec<Shape>,
}

/// Encoded size of one node: bounds (6 × f32) plus kind, a, b, padding (4 × u32).
pub(crate) const NODE_SIZE: usize = 40;

impl ShapeBvh {
    /// Builds a tree by recursive median split on the longest axis of the
    /// child centroids.
    pub fn build(children: Vec<Shape>) -> Self {
        let mut nodes = Vec::with_capacity(children.len().saturating_mul(2));
        if !children.is_empty() {
            let bounds: Vec<Aabb> = children.iter().map(Shape::aabb).collect();
            let mut order: Vec<u32> = (0..children.len() as u32).collect();
            build_node(&mut nodes, &bounds, &mut order);
        }
        tracing::trace!(
            children = children.len(),
            nodes = nodes.len(),
            "built shape bvh"
        );
        Self { nodes, children }
    }

    /// Reassembles a tree from decoded parts, validating every index.
    pub(crate) fn from_parts(nodes: Vec<BvhNode>, children: Vec<Shape>) -> Result<Self, ShapeError> {
        if nodes.is_empty() != children.is_empty() {
            return Err(ShapeError::InvalidIndex {
                what: "bvh root",
                index: 0,
                len: nodes.len(),
            });
        }
        for (i, node) in nodes.iter().enumerate() {
            match node.kind {
                BvhNodeKind::Leaf { child } => {
                    if child as usize >= children.len() {
                        return Err(ShapeError::InvalidIndex {
                            what: "bvh leaf child",
                            index: child,
                            len: children.len(),
                        });
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    for index in [left, right] {
                        // Children must come after their parent; this also rules out cycles.
                        if index as usize <= i || index as usize >= nodes.len() {
                            return Err(ShapeError::InvalidIndex {
                                what: "bvh node",
                                index,
                                len: nodes.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(Self { nodes, children })
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    /// Bounds of the whole tree (the root node), or an empty box.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|n| n.bounds).unwrap_or_default()
    }

    /// Indices of the child shapes whose leaf bounds overlap `query`.
    pub fn overlapping(&self, query: &Aabb) -> Vec<usize> {
        let mut hits = Vec::new();
        if self.nodes.is_empty() {
            return hits;
        }
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bounds.intersects(query) {
                continue;
            }
            match node.kind {
                BvhNodeKind::Leaf { child } => hits.push(child as usize),
                BvhNodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        hits
    }

    pub(crate) fn payload_size(&self) -> usize {
        8 + self.nodes.len() * NODE_SIZE + self.children.iter().map(Shape::byte_size).sum::<usize>()
    }
}

fn build_node(nodes: &mut Vec<BvhNode>, bounds: &[Aabb], order: &mut [u32]) -> u32 {
    let enclosing = order
        .iter()
        .map(|&i| bounds[i as usize])
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();
    let index = nodes.len() as u32;

    if let [only] = order {
        nodes.push(BvhNode {
            bounds: enclosing,
            kind: BvhNodeKind::Leaf { child: *only },
        });
        return index;
    }

    // Placeholder, patched once both subtrees exist.
    nodes.push(BvhNode {
        bounds: enclosing,
        kind: BvhNodeKind::Internal { left: 0, right: 0 },
    });

    let centroids = Aabb::from_points(order.iter().map(|&i| bounds[i as usize].center()))
        .unwrap_or_default();
    let size = centroids.size();
    let axis = if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    };
    order.sort_by(|&a, &b| {
        let ca = bounds[a as usize].center()[axis];
        let cb = bounds[b as usize].center()[axis];
        ca.total_cmp(&cb)
    });

    let mid = order.len() / 2;
    let (lo, hi) = order.split_at_mut(mid);
    let left = build_node(nodes, bounds, lo);
    let right = build_node(nodes, bounds, hi);
    nodes[index as usize].kind = BvhNodeKind::Internal { left, right };
    index
}
