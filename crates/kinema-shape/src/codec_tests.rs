//! Tests for the shape record codec.

use glam::{Mat3, Vec2, Vec3};
use kinema_math::Pose;

use super::*;

fn tetrahedron() -> Shape {
    Shape::polytope(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
    .unwrap()
}

fn terrain() -> Shape {
    let heights = (0..12).map(|i| (i % 4) as f32 * 0.25).collect();
    Shape::terrain(Terrain::new(3, 4, Vec2::new(2.0, 1.0), heights).unwrap())
}

/// A compound exercising every variant, nested two levels deep.
fn everything() -> Shape {
    let tilted = Pose::new(
        Mat3::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.6),
        Vec3::new(0.5, -1.0, 2.0),
    );
    let primitives = vec![
        Shape::sphere(0.75).with_local(tilted),
        Shape::triangle(Vec3::ZERO, Vec3::X, Vec3::Y).with_flags(ShapeFlags::SENSOR),
        Shape::cuboid(Vec3::new(1.0, 2.0, 0.5)),
        Shape::capsule(0.3, 1.2).with_local(Pose::from_translation(Vec3::new(4.0, 0.0, 0.0))),
        Shape::cylinder(0.6, 0.4).with_local(Pose::from_translation(Vec3::new(-4.0, 1.0, 0.0))),
        tetrahedron(),
    ];
    Shape::array(vec![
        Shape::bvh(primitives),
        terrain().with_flags(ShapeFlags::STATIC_ONLY | ShapeFlags::NO_MASS),
        Shape::array(vec![Shape::sphere(1.0), Shape::array(Vec::new())]),
    ])
    .with_local(Pose::from_axis_angle(Vec3::Z, 0.25))
}

// -- Position independence --

#[test]
fn test_copied_blob_decodes_identically() {
    let original = everything();
    let bytes = original.to_bytes();

    // Relocate the record to an odd offset inside a larger allocation.
    let mut relocated = vec![0xAAu8; 3];
    relocated.extend_from_slice(&bytes);
    relocated.extend_from_slice(&[0x55; 7]);

    let (decoded, used) = Shape::decode(&relocated[3..]).unwrap();
    assert_eq!(used, bytes.len());
    assert_eq!(decoded, original);
    assert_eq!(decoded.aabb(), original.aabb());
    assert_eq!(decoded.to_bytes(), bytes);
}

#[test]
fn test_encoded_length_matches_byte_size() {
    let shape = everything();
    assert_eq!(shape.to_bytes().len(), shape.byte_size());
    assert_eq!(tetrahedron().to_bytes().len(), tetrahedron().byte_size());
}

#[test]
fn test_header_peek() {
    let shape = Shape::capsule(0.5, 1.0)
        .with_flags(ShapeFlags::SENSOR)
        .with_local(Pose::from_translation(Vec3::new(1.0, 2.0, 3.0)));
    let bytes = shape.to_bytes();
    let header = ShapeHeader::peek(&bytes).unwrap();
    assert_eq!(header.tag, ShapeTag::Capsule);
    assert_eq!(header.flags, ShapeFlags::SENSOR);
    assert_eq!(header.byte_size, HEADER_SIZE + 8);
    assert_eq!(header.local, shape.local);
    assert_eq!(header.aabb, shape.aabb());
}

// -- ShapeBuffer --

#[test]
fn test_buffer_append_and_reopen() {
    let mut buffer = ShapeBuffer::new();
    assert!(buffer.is_empty());
    let a = buffer.push(&Shape::sphere(1.0));
    let b = buffer.push(&everything());
    let c = buffer.push(&terrain());
    assert_eq!((a, b, c), (0, 1, 2));

    let reopened = ShapeBuffer::from_bytes(buffer.as_bytes().to_vec()).unwrap();
    assert_eq!(reopened.len(), 3);
    assert_eq!(reopened.get(1).unwrap().unwrap(), everything());
    assert_eq!(reopened.header(2).unwrap().unwrap().tag, ShapeTag::Terrain);
    assert!(reopened.get(3).is_none());

    let all = reopened.decode_all().unwrap();
    assert_eq!(all[0].as_sphere(), Some(1.0));
}

#[test]
fn test_buffer_rejects_trailing_garbage() {
    let mut bytes = Shape::sphere(1.0).to_bytes();
    bytes.extend_from_slice(&[1, 2, 3]);
    assert!(matches!(
        ShapeBuffer::from_bytes(bytes),
        Err(ShapeError::Truncated { expected: HEADER_SIZE, actual: 3 })
    ));
}

// -- Corruption --

#[test]
fn test_truncated_header() {
    let bytes = Shape::sphere(1.0).to_bytes();
    assert_eq!(
        Shape::decode(&bytes[..10]).unwrap_err(),
        ShapeError::Truncated {
            expected: HEADER_SIZE,
            actual: 10
        }
    );
}

#[test]
fn test_truncated_payload() {
    let bytes = tetrahedron().to_bytes();
    let cut = &bytes[..bytes.len() - 4];
    assert!(matches!(Shape::decode(cut), Err(ShapeError::Truncated { .. })));
}

#[test]
fn test_unknown_tag() {
    let mut bytes = Shape::sphere(1.0).to_bytes();
    bytes[0] = 200;
    assert_eq!(Shape::decode(&bytes).unwrap_err(), ShapeError::UnknownTag(200));
}

#[test]
fn test_unknown_flags() {
    let mut bytes = Shape::sphere(1.0).to_bytes();
    bytes[1] = 0x80;
    assert_eq!(Shape::decode(&bytes).unwrap_err(), ShapeError::UnknownFlags(0x80));
}

#[test]
fn test_oversized_declared_size() {
    let mut bytes = Shape::sphere(1.0).to_bytes();
    bytes.extend_from_slice(&[0; 4]);
    let declared = (HEADER_SIZE + 8) as u32;
    bytes[4..8].copy_from_slice(&declared.to_ne_bytes());
    assert_eq!(
        Shape::decode(&bytes).unwrap_err(),
        ShapeError::SizeMismatch {
            declared: HEADER_SIZE + 8,
            consumed: HEADER_SIZE + 4
        }
    );
}

#[test]
fn test_polytope_face_out_of_range() {
    let mut bytes = tetrahedron().to_bytes();
    // Last face index lives in the final four bytes.
    let len = bytes.len();
    bytes[len - 4..].copy_from_slice(&9u32.to_ne_bytes());
    assert!(matches!(
        Shape::decode(&bytes),
        Err(ShapeError::InvalidIndex { what: "polytope vertex", index: 9, .. })
    ));
}

#[test]
fn test_non_finite_payload_rejected() {
    let mut bytes = Shape::sphere(1.0).to_bytes();
    bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&f32::NAN.to_ne_bytes());
    assert_eq!(Shape::decode(&bytes).unwrap_err(), ShapeError::NonFinite);
}

#[test]
fn test_header_bounds_must_match_payload() {
    let mut bytes = Shape::cuboid(Vec3::ONE).to_bytes();
    // aabb_max.x follows tag, flags, size, rotation, translation, and aabb_min.
    let offset = 68;
    bytes[offset..offset + 4].copy_from_slice(&5.0f32.to_ne_bytes());
    assert_eq!(ShapeHeader::peek(&bytes).unwrap().aabb.max.x, 5.0);
    assert_eq!(Shape::decode(&bytes).unwrap_err(), ShapeError::BoundsMismatch);
}

#[test]
fn test_nested_child_bounds_checked() {
    let compound = Shape::array(vec![Shape::sphere(1.0)]);
    let mut bytes = compound.to_bytes();
    // The child record starts after the parent header and its count fields.
    let offset = HEADER_SIZE + 8 + 56;
    bytes[offset..offset + 4].copy_from_slice(&(-3.0f32).to_ne_bytes());
    assert_eq!(Shape::decode(&bytes).unwrap_err(), ShapeError::BoundsMismatch);
}

#[test]
fn test_nesting_limit() {
    let mut shape = Shape::sphere(1.0);
    for _ in 0..=MAX_NESTING {
        shape = Shape::array(vec![shape]);
    }
    assert_eq!(
        Shape::decode(&shape.to_bytes()).unwrap_err(),
        ShapeError::NestingTooDeep(MAX_NESTING)
    );
}

#[test]
fn test_nesting_at_limit_is_accepted() {
    let mut shape = Shape::sphere(1.0);
    for _ in 0..MAX_NESTING {
        shape = Shape::array(vec![shape]);
    }
    assert!(Shape::decode(&shape.to_bytes()).is_ok());
}
