//! Flat, position-independent byte encoding for [`Shape`].
//!
//! ## Record Layout
//!
//! Every shape, including each child of a compound, is one self-describing
//! record:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | Tag ([`ShapeTag`] as `u8`) |
//! | 1 | 1 | Flags ([`ShapeFlags`] bits) |
//! | 2 | 2 | Reserved (zero) |
//! | 4 | 4 | Record size in bytes, header included (`u32`) |
//! | 8 | 36 | Local rotation, 9 × `f32`, column-major |
//! | 44 | 12 | Local translation, 3 × `f32` |
//! | 56 | 24 | Parent-frame bounds, min then max, 6 × `f32` |
//! | 80 | … | Variant payload |
//!
//! Compound payloads embed their children as complete nested records and
//! refer to them by ordinal index only, so a record can be copied, appended
//! to a [`ShapeBuffer`], or moved to any byte offset without fix-up.
//! Numbers use the host's native byte order.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec2, Vec3};
use kinema_math::{Aabb, Pose};

use crate::bvh::NODE_SIZE;
use crate::shape::validate_faces;
use crate::{BvhNode, BvhNodeKind, Shape, ShapeBvh, ShapeError, ShapeFlags, ShapeKind, ShapeTag, Terrain};

/// Size of the fixed record header.
pub const HEADER_SIZE: usize = 80;

/// Deepest compound nesting the decoder accepts.
pub const MAX_NESTING: usize = 32;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawHeader {
    tag: u8,
    flags: u8,
    reserved: u16,
    byte_size: u32,
    rotation: [f32; 9],
    translation: [f32; 3],
    aabb_min: [f32; 3],
    aabb_max: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawBvhNode {
    min: [f32; 3],
    max: [f32; 3],
    kind: u32,
    a: u32,
    b: u32,
    reserved: u32,
}

static_assertions::assert_eq_size!(RawHeader, [u8; HEADER_SIZE]);
static_assertions::assert_eq_size!(RawBvhNode, [u8; NODE_SIZE]);

const NODE_LEAF: u32 = 0;
const NODE_INTERNAL: u32 = 1;

/// Decoded common header of a shape record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeHeader {
    pub tag: ShapeTag,
    pub flags: ShapeFlags,
    /// Record size in bytes, header and children included.
    pub byte_size: usize,
    pub local: Pose,
    /// Bounds in the parent frame.
    pub aabb: Aabb,
}

impl ShapeHeader {
    /// Reads and validates the header at the start of `data` without decoding
    /// the payload.
    pub fn peek(data: &[u8]) -> Result<Self, ShapeError> {
        if data.len() < HEADER_SIZE {
            return Err(ShapeError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let raw: RawHeader = bytemuck::pod_read_unaligned(&data[..HEADER_SIZE]);
        let tag = ShapeTag::try_from(raw.tag)?;
        let flags = ShapeFlags::from_bits(raw.flags).ok_or(ShapeError::UnknownFlags(raw.flags))?;
        let byte_size = raw.byte_size as usize;
        if byte_size < HEADER_SIZE {
            return Err(ShapeError::SizeMismatch {
                declared: byte_size,
                consumed: HEADER_SIZE,
            });
        }
        if byte_size > data.len() {
            return Err(ShapeError::Truncated {
                expected: byte_size,
                actual: data.len(),
            });
        }
        Ok(Self {
            tag,
            flags,
            byte_size,
            local: Pose::new(
                Mat3::from_cols_array(&raw.rotation),
                Vec3::from_array(raw.translation),
            ),
            aabb: Aabb::new(Vec3::from_array(raw.aabb_min), Vec3::from_array(raw.aabb_max)),
        })
    }
}

impl Shape {
    /// Appends this shape's record to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + HEADER_SIZE, 0);

        match &self.kind {
            ShapeKind::Sphere { radius } => put(out, radius),
            ShapeKind::Triangle { vertices } => {
                for v in vertices {
                    put(out, &v.to_array());
                }
            }
            ShapeKind::Box { half_extents } => put(out, &half_extents.to_array()),
            ShapeKind::Capsule {
                radius,
                half_height,
            }
            | ShapeKind::Cylinder {
                radius,
                half_height,
            } => {
                put(out, radius);
                put(out, half_height);
            }
            ShapeKind::Polytope { vertices, faces } => {
                put(out, &(vertices.len() as u32));
                put(out, &(faces.len() as u32));
                for v in vertices {
                    put(out, &v.to_array());
                }
                for f in faces {
                    put(out, f);
                }
            }
            ShapeKind::Array(children) => {
                put(out, &(children.len() as u32));
                put(out, &0u32);
                for child in children {
                    child.encode(out);
                }
            }
            ShapeKind::Bvh(bvh) => {
                put(out, &(bvh.nodes().len() as u32));
                put(out, &(bvh.children().len() as u32));
                for node in bvh.nodes() {
                    let (kind, a, b) = match node.kind {
                        BvhNodeKind::Leaf { child } => (NODE_LEAF, child, 0),
                        BvhNodeKind::Internal { left, right } => (NODE_INTERNAL, left, right),
                    };
                    put(
                        out,
                        &RawBvhNode {
                            min: node.bounds.min.to_array(),
                            max: node.bounds.max.to_array(),
                            kind,
                            a,
                            b,
                            reserved: 0,
                        },
                    );
                }
                for child in bvh.children() {
                    child.encode(out);
                }
            }
            ShapeKind::Terrain(terrain) => {
                put(out, &terrain.rows());
                put(out, &terrain.cols());
                put(out, &terrain.cell_size().to_array());
                out.extend_from_slice(bytemuck::cast_slice(terrain.heights()));
            }
        }

        let byte_size = out.len() - start;
        debug_assert_eq!(byte_size, self.byte_size());
        let aabb = self.aabb();
        let header = RawHeader {
            tag: self.tag() as u8,
            flags: self.flags.bits(),
            reserved: 0,
            byte_size: byte_size as u32,
            rotation: self.local.rotation.to_cols_array(),
            translation: self.local.translation.to_array(),
            aabb_min: aabb.min.to_array(),
            aabb_max: aabb.max.to_array(),
        };
        out[start..start + HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
    }

    /// Encodes this shape into a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_size());
        self.encode(&mut out);
        out
    }

    /// Decodes the record at the start of `data`.
    ///
    /// Returns the shape and the number of bytes its record occupies; bytes
    /// after the record are ignored.
    pub fn decode(data: &[u8]) -> Result<(Shape, usize), ShapeError> {
        decode_at(data, 0)
    }
}

fn put<T: Pod>(out: &mut Vec<u8>, value: &T) {
    out.extend_from_slice(bytemuck::bytes_of(value));
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ShapeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(ShapeError::Truncated {
                expected: self.pos.saturating_add(len),
                actual: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read<T: Pod>(&mut self) -> Result<T, ShapeError> {
        Ok(bytemuck::pod_read_unaligned(self.take(size_of::<T>())?))
    }

    fn read_vec3(&mut self) -> Result<Vec3, ShapeError> {
        Ok(Vec3::from_array(self.read()?))
    }

    fn read_many<T: Pod>(&mut self, count: usize) -> Result<Vec<T>, ShapeError> {
        let len = count.checked_mul(size_of::<T>()).ok_or(ShapeError::Truncated {
            expected: usize::MAX,
            actual: self.data.len(),
        })?;
        let bytes = self.take(len)?;
        Ok(bytes
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    fn read_children(&mut self, count: usize, depth: usize) -> Result<Vec<Shape>, ShapeError> {
        // Every child needs at least a header, which bounds the allocation.
        let remaining = self.data.len() - self.pos;
        let mut children = Vec::with_capacity(count.min(remaining / HEADER_SIZE));
        for _ in 0..count {
            let (child, used) = decode_at(&self.data[self.pos..], depth + 1)?;
            self.pos += used;
            children.push(child);
        }
        Ok(children)
    }
}

fn decode_at(data: &[u8], depth: usize) -> Result<(Shape, usize), ShapeError> {
    if depth > MAX_NESTING {
        return Err(ShapeError::NestingTooDeep(MAX_NESTING));
    }
    let header = ShapeHeader::peek(data)?;
    let mut r = Reader {
        data: &data[..header.byte_size],
        pos: HEADER_SIZE,
    };

    let kind = match header.tag {
        ShapeTag::Sphere => ShapeKind::Sphere { radius: r.read()? },
        ShapeTag::Triangle => ShapeKind::Triangle {
            vertices: [r.read_vec3()?, r.read_vec3()?, r.read_vec3()?],
        },
        ShapeTag::Box => ShapeKind::Box {
            half_extents: r.read_vec3()?,
        },
        ShapeTag::Capsule => ShapeKind::Capsule {
            radius: r.read()?,
            half_height: r.read()?,
        },
        ShapeTag::Cylinder => ShapeKind::Cylinder {
            radius: r.read()?,
            half_height: r.read()?,
        },
        ShapeTag::Polytope => {
            let vertex_count = r.read::<u32>()? as usize;
            let face_count = r.read::<u32>()? as usize;
            let vertices: Vec<Vec3> = r
                .read_many::<[f32; 3]>(vertex_count)?
                .into_iter()
                .map(Vec3::from_array)
                .collect();
            let faces = r.read_many::<[u32; 3]>(face_count)?;
            validate_faces(&faces, vertices.len())?;
            ShapeKind::Polytope { vertices, faces }
        }
        ShapeTag::Array => {
            let count = r.read::<u32>()? as usize;
            let _reserved = r.read::<u32>()?;
            ShapeKind::Array(r.read_children(count, depth)?)
        }
        ShapeTag::Bvh => {
            let node_count = r.read::<u32>()? as usize;
            let child_count = r.read::<u32>()? as usize;
            let nodes = r
                .read_many::<RawBvhNode>(node_count)?
                .into_iter()
                .map(node_from_raw)
                .collect::<Result<Vec<_>, _>>()?;
            let children = r.read_children(child_count, depth)?;
            ShapeKind::Bvh(ShapeBvh::from_parts(nodes, children)?)
        }
        ShapeTag::Terrain => {
            let rows = r.read::<u32>()?;
            let cols = r.read::<u32>()?;
            let cell_size = Vec2::from_array(r.read()?);
            let samples = (rows as usize)
                .checked_mul(cols as usize)
                .ok_or(ShapeError::InvalidTerrain {
                    rows,
                    cols,
                    samples: 0,
                })?;
            let heights = r.read_many::<f32>(samples)?;
            ShapeKind::Terrain(Terrain::new(rows, cols, cell_size, heights)?)
        }
    };

    if r.pos != header.byte_size {
        return Err(ShapeError::SizeMismatch {
            declared: header.byte_size,
            consumed: r.pos,
        });
    }

    let shape = Shape {
        local: header.local,
        flags: header.flags,
        kind,
    };
    if !shape.is_finite() {
        return Err(ShapeError::NonFinite);
    }
    if shape.aabb() != header.aabb {
        return Err(ShapeError::BoundsMismatch);
    }
    Ok((shape, header.byte_size))
}

fn node_from_raw(raw: RawBvhNode) -> Result<BvhNode, ShapeError> {
    let kind = match raw.kind {
        NODE_LEAF => BvhNodeKind::Leaf { child: raw.a },
        NODE_INTERNAL => BvhNodeKind::Internal {
            left: raw.a,
            right: raw.b,
        },
        other => {
            return Err(ShapeError::InvalidIndex {
                what: "bvh node kind",
                index: other,
                len: 2,
            });
        }
    };
    Ok(BvhNode {
        bounds: Aabb::new(Vec3::from_array(raw.min), Vec3::from_array(raw.max)),
        kind,
    })
}

/// Many shape records packed back to back in one allocation.
///
/// The buffer is a plain byte vector; it can be written to disk or copied
/// anywhere and reopened with [`ShapeBuffer::from_bytes`].
#[derive(Clone, Debug, Default)]
pub struct ShapeBuffer {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl ShapeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a shape record and returns its index in the buffer.
    pub fn push(&mut self, shape: &Shape) -> usize {
        self.offsets.push(self.bytes.len());
        shape.encode(&mut self.bytes);
        self.offsets.len() - 1
    }

    /// Wraps existing bytes, walking the record headers to index them.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ShapeError> {
        let mut offsets = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let header = ShapeHeader::peek(&bytes[pos..])?;
            offsets.push(pos);
            pos += header.byte_size;
        }
        Ok(Self { bytes, offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Reads the header of record `index` without decoding its payload.
    pub fn header(&self, index: usize) -> Option<Result<ShapeHeader, ShapeError>> {
        let offset = *self.offsets.get(index)?;
        Some(ShapeHeader::peek(&self.bytes[offset..]))
    }

    /// Decodes record `index`.
    pub fn get(&self, index: usize) -> Option<Result<Shape, ShapeError>> {
        let offset = *self.offsets.get(index)?;
        Some(Shape::decode(&self.bytes[offset..]).map(|(shape, _)| shape))
    }

    /// Decodes every record in order.
    pub fn decode_all(&self) -> Result<Vec<Shape>, ShapeError> {
        self.offsets
            .iter()
            .map(|&offset| Shape::decode(&self.bytes[offset..]).map(|(shape, _)| shape))
            .collect()
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
