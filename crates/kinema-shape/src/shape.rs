//! The [`Shape`] sum type and its header-level properties.

use glam::Vec3;
use kinema_math::{Aabb, Pose};

use crate::codec::HEADER_SIZE;
use crate::{ShapeBvh, ShapeError, Terrain};

/// Stable discriminant written into every encoded shape record.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeTag {
    Sphere = 1,
    Triangle = 2,
    Box = 3,
    Capsule = 4,
    Cylinder = 5,
    Polytope = 6,
    Array = 7,
    Bvh = 8,
    Terrain = 9,
}

impl TryFrom<u8> for ShapeTag {
    type Error = ShapeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ShapeTag::Sphere,
            2 => ShapeTag::Triangle,
            3 => ShapeTag::Box,
            4 => ShapeTag::Capsule,
            5 => ShapeTag::Cylinder,
            6 => ShapeTag::Polytope,
            7 => ShapeTag::Array,
            8 => ShapeTag::Bvh,
            9 => ShapeTag::Terrain,
            other => return Err(ShapeError::UnknownTag(other)),
        })
    }
}

bitflags::bitflags! {
    /// Per-shape behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u8 {
        /// Only meaningful on immovable bodies (terrain, level geometry).
        const STATIC_ONLY = 0b0000_0001;
        /// Reports overlaps but never produces a collision response.
        const SENSOR = 0b0000_0010;
        /// Contributes no mass or inertia to its body.
        const NO_MASS = 0b0000_0100;
    }
}

/// Variant-specific geometry. Capsules and cylinders are aligned with local Z.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Sphere {
        radius: f32,
    },
    Triangle {
        vertices: [Vec3; 3],
    },
    Box {
        half_extents: Vec3,
    },
    Capsule {
        radius: f32,
        half_height: f32,
    },
    Cylinder {
        radius: f32,
        half_height: f32,
    },
    /// Closed convex polytope with outward-wound triangular faces.
    Polytope {
        vertices: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
    },
    /// Flat list of child shapes, each positioned by its own `local` pose.
    Array(Vec<Shape>),
    Bvh(ShapeBvh),
    Terrain(Terrain),
}

/// A relocatable geometric descriptor.
///
/// `local` places the geometry in its parent frame (the owning body's shape
/// frame, or the enclosing compound). Shapes carry no pointers; compound
/// variants own their children and refer to them by index only.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub local: Pose,
    pub flags: ShapeFlags,
    pub kind: ShapeKind,
}

impl Shape {
    fn from_kind(kind: ShapeKind) -> Self {
        Self {
            local: Pose::IDENTITY,
            flags: ShapeFlags::empty(),
            kind,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::from_kind(ShapeKind::Sphere { radius })
    }

    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_kind(ShapeKind::Triangle {
            vertices: [a, b, c],
        })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::from_kind(ShapeKind::Box { half_extents })
    }

    pub fn capsule(radius: f32, half_height: f32) -> Self {
        Self::from_kind(ShapeKind::Capsule {
            radius,
            half_height,
        })
    }

    pub fn cylinder(radius: f32, half_height: f32) -> Self {
        Self::from_kind(ShapeKind::Cylinder {
            radius,
            half_height,
        })
    }

    /// Builds a polytope, checking that every face index names a vertex.
    pub fn polytope(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Result<Self, ShapeError> {
        validate_faces(&faces, vertices.len())?;
        Ok(Self::from_kind(ShapeKind::Polytope { vertices, faces }))
    }

    pub fn array(children: Vec<Shape>) -> Self {
        Self::from_kind(ShapeKind::Array(children))
    }

    /// Builds a bounding-volume tree over `children`.
    pub fn bvh(children: Vec<Shape>) -> Self {
        Self::from_kind(ShapeKind::Bvh(ShapeBvh::build(children)))
    }

    pub fn terrain(terrain: Terrain) -> Self {
        Self::from_kind(ShapeKind::Terrain(terrain))
    }

    /// Replaces the local-to-parent pose.
    pub fn with_local(mut self, local: Pose) -> Self {
        self.local = local;
        self
    }

    /// Replaces the flag bits.
    pub fn with_flags(mut self, flags: ShapeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Discriminant of the variant.
    pub fn tag(&self) -> ShapeTag {
        match self.kind {
            ShapeKind::Sphere { .. } => ShapeTag::Sphere,
            ShapeKind::Triangle { .. } => ShapeTag::Triangle,
            ShapeKind::Box { .. } => ShapeTag::Box,
            ShapeKind::Capsule { .. } => ShapeTag::Capsule,
            ShapeKind::Cylinder { .. } => ShapeTag::Cylinder,
            ShapeKind::Polytope { .. } => ShapeTag::Polytope,
            ShapeKind::Array(_) => ShapeTag::Array,
            ShapeKind::Bvh(_) => ShapeTag::Bvh,
            ShapeKind::Terrain(_) => ShapeTag::Terrain,
        }
    }

    /// Returns `true` for variants that own child shapes.
    pub fn is_compound(&self) -> bool {
        matches!(self.kind, ShapeKind::Array(_) | ShapeKind::Bvh(_))
    }

    /// Bounds in the shape's own frame (before `local` is applied).
    pub fn local_aabb(&self) -> Aabb {
        match &self.kind {
            ShapeKind::Sphere { radius } => {
                Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius))
            }
            ShapeKind::Triangle { vertices } => {
                Aabb::from_points(vertices.iter().copied()).unwrap_or_default()
            }
            ShapeKind::Box { half_extents } => {
                Aabb::from_center_half_extents(Vec3::ZERO, *half_extents)
            }
            ShapeKind::Capsule {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, *radius, half_height + radius),
            ),
            ShapeKind::Cylinder {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, *radius, *half_height),
            ),
            ShapeKind::Polytope { vertices, .. } => {
                Aabb::from_points(vertices.iter().copied()).unwrap_or_default()
            }
            ShapeKind::Array(children) => children
                .iter()
                .map(Shape::aabb)
                .reduce(|a, b| a.union(&b))
                .unwrap_or_default(),
            ShapeKind::Bvh(bvh) => bvh.bounds(),
            ShapeKind::Terrain(terrain) => terrain.bounds(),
        }
    }

    /// Bounds in the parent frame (after `local` is applied).
    pub fn aabb(&self) -> Aabb {
        self.local_aabb().transformed(&self.local)
    }

    /// Size in bytes of this shape's encoded record, children included.
    pub fn byte_size(&self) -> usize {
        let payload = match &self.kind {
            ShapeKind::Sphere { .. } => 4,
            ShapeKind::Triangle { .. } => 36,
            ShapeKind::Box { .. } => 12,
            ShapeKind::Capsule { .. } | ShapeKind::Cylinder { .. } => 8,
            ShapeKind::Polytope { vertices, faces } => 8 + vertices.len() * 12 + faces.len() * 12,
            ShapeKind::Array(children) => {
                8 + children.iter().map(Shape::byte_size).sum::<usize>()
            }
            ShapeKind::Bvh(bvh) => bvh.payload_size(),
            ShapeKind::Terrain(terrain) => 16 + terrain.heights().len() * 4,
        };
        HEADER_SIZE + payload
    }

    /// Returns `true` if every geometric parameter is finite.
    pub fn is_finite(&self) -> bool {
        if !self.local.is_finite() {
            return false;
        }
        match &self.kind {
            ShapeKind::Sphere { radius } => radius.is_finite(),
            ShapeKind::Triangle { vertices } => vertices.iter().all(|v| v.is_finite()),
            ShapeKind::Box { half_extents } => half_extents.is_finite(),
            ShapeKind::Capsule {
                radius,
                half_height,
            }
            | ShapeKind::Cylinder {
                radius,
                half_height,
            } => radius.is_finite() && half_height.is_finite(),
            ShapeKind::Polytope { vertices, .. } => vertices.iter().all(|v| v.is_finite()),
            ShapeKind::Array(children) => children.iter().all(Shape::is_finite),
            ShapeKind::Bvh(bvh) => bvh.children().iter().all(Shape::is_finite),
            ShapeKind::Terrain(terrain) => terrain.heights().iter().all(|h| h.is_finite()),
        }
    }

    /// Checks the variant tag, for callers that need a specific geometry.
    pub fn expect_tag(&self, expected: ShapeTag) -> Result<&ShapeKind, ShapeError> {
        let found = self.tag();
        if found == expected {
            Ok(&self.kind)
        } else {
            Err(ShapeError::TagMismatch { expected, found })
        }
    }

    pub fn as_sphere(&self) -> Option<f32> {
        match self.kind {
            ShapeKind::Sphere { radius } => Some(radius),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<Vec3> {
        match self.kind {
            ShapeKind::Box { half_extents } => Some(half_extents),
            _ => None,
        }
    }

    pub fn as_polytope(&self) -> Option<(&[Vec3], &[[u32; 3]])> {
        match &self.kind {
            ShapeKind::Polytope { vertices, faces } => Some((vertices, faces)),
            _ => None,
        }
    }

    pub fn as_terrain(&self) -> Option<&Terrain> {
        match &self.kind {
            ShapeKind::Terrain(terrain) => Some(terrain),
            _ => None,
        }
    }

    /// Child shapes of a compound, or an empty slice for primitives.
    pub fn children(&self) -> &[Shape] {
        match &self.kind {
            ShapeKind::Array(children) => children,
            ShapeKind::Bvh(bvh) => bvh.children(),
            _ => &[],
        }
    }
}

pub(crate) fn validate_faces(faces: &[[u32; 3]], vertex_count: usize) -> Result<(), ShapeError> {
    for face in faces {
        for &index in face {
            if index as usize >= vertex_count {
                return Err(ShapeError::InvalidIndex {
                    what: "polytope vertex",
                    index,
                    len: vertex_count,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat3;

    #[test]
    fn test_tag_roundtrip() {
        for raw in 1u8..=9 {
            let tag = ShapeTag::try_from(raw).unwrap();
            assert_eq!(tag as u8, raw);
        }
        assert_eq!(ShapeTag::try_from(0), Err(ShapeError::UnknownTag(0)));
        assert_eq!(ShapeTag::try_from(42), Err(ShapeError::UnknownTag(42)));
    }

    #[test]
    fn test_sphere_aabb() {
        let aabb = Shape::sphere(2.0).aabb();
        assert_eq!(aabb.min, Vec3::splat(-2.0));
        assert_eq!(aabb.max, Vec3::splat(2.0));
    }

    #[test]
    fn test_capsule_aabb_includes_caps() {
        let aabb = Shape::capsule(0.5, 1.0).aabb();
        assert_eq!(aabb.max, Vec3::new(0.5, 0.5, 1.5));
    }

    #[test]
    fn test_aabb_follows_local_pose() {
        let shape = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0)).with_local(Pose::new(
            Mat3::from_axis_angle(Vec3::X, std::f32::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        ));
        let aabb = shape.aabb();
        assert!(aabb.center().abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(aabb.half_extents().abs_diff_eq(Vec3::new(1.0, 3.0, 2.0), 1e-5));
    }

    #[test]
    fn test_array_aabb_is_union_of_children() {
        let shape = Shape::array(vec![
            Shape::sphere(1.0).with_local(Pose::from_translation(Vec3::new(-3.0, 0.0, 0.0))),
            Shape::sphere(1.0).with_local(Pose::from_translation(Vec3::new(3.0, 0.0, 0.0))),
        ]);
        let aabb = shape.aabb();
        assert_eq!(aabb.min, Vec3::new(-4.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 1.0, 1.0));
    }

    #[test]
    fn test_polytope_rejects_bad_face() {
        let err = Shape::polytope(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 3]]);
        assert!(matches!(err, Err(ShapeError::InvalidIndex { index: 3, .. })));
    }

    #[test]
    fn test_expect_tag() {
        let shape = Shape::sphere(1.0);
        assert!(shape.expect_tag(ShapeTag::Sphere).is_ok());
        assert_eq!(
            shape.expect_tag(ShapeTag::Box),
            Err(ShapeError::TagMismatch {
                expected: ShapeTag::Box,
                found: ShapeTag::Sphere
            })
        );
    }

    #[test]
    fn test_downcasts() {
        assert_eq!(Shape::sphere(1.5).as_sphere(), Some(1.5));
        assert_eq!(Shape::sphere(1.5).as_box(), None);
        assert_eq!(Shape::cuboid(Vec3::ONE).as_box(), Some(Vec3::ONE));
    }

    #[test]
    fn test_byte_size_primitives() {
        assert_eq!(Shape::sphere(1.0).byte_size(), HEADER_SIZE + 4);
        assert_eq!(Shape::cuboid(Vec3::ONE).byte_size(), HEADER_SIZE + 12);
        let nested = Shape::array(vec![Shape::sphere(1.0), Shape::capsule(1.0, 1.0)]);
        assert_eq!(nested.byte_size(), HEADER_SIZE + 8 + (HEADER_SIZE + 4) + (HEADER_SIZE + 8));
    }

    #[test]
    fn test_is_finite() {
        assert!(Shape::sphere(1.0).is_finite());
        assert!(!Shape::sphere(f32::NAN).is_finite());
        assert!(!Shape::cuboid(Vec3::new(1.0, f32::INFINITY, 1.0)).is_finite());
    }
}
