//! Shape construction and decoding errors.

use crate::ShapeTag;

/// Errors raised while building or decoding a [`Shape`](crate::Shape).
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ShapeError {
    /// The data is shorter than a header or than the size it declares.
    #[error("shape data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count available.
        actual: usize,
    },
    /// The tag byte does not name a known shape variant.
    #[error("unknown shape tag: {0}")]
    UnknownTag(u8),
    /// The flag byte has bits set that no [`ShapeFlags`](crate::ShapeFlags) defines.
    #[error("unknown shape flag bits: {0:#04x}")]
    UnknownFlags(u8),
    /// The declared record size does not match the bytes the payload used.
    #[error("shape size mismatch: header declares {declared} bytes, payload used {consumed}")]
    SizeMismatch {
        /// Size from the record header.
        declared: usize,
        /// Bytes consumed while decoding.
        consumed: usize,
    },
    /// An index stored in the shape points outside its table.
    #[error("{what} index {index} out of range (len {len})")]
    InvalidIndex {
        /// Which table the index refers to.
        what: &'static str,
        /// Offending index.
        index: u32,
        /// Table length.
        len: usize,
    },
    /// A typed accessor was used on the wrong variant.
    #[error("shape tag mismatch: expected {expected:?}, found {found:?}")]
    TagMismatch {
        /// Requested variant.
        expected: ShapeTag,
        /// Actual variant.
        found: ShapeTag,
    },
    /// Heightfield dimensions and sample count disagree.
    #[error("invalid terrain: {rows}x{cols} grid with {samples} samples")]
    InvalidTerrain {
        /// Row count.
        rows: u32,
        /// Column count.
        cols: u32,
        /// Number of height samples supplied.
        samples: usize,
    },
    /// A geometric parameter is NaN or infinite.
    #[error("shape contains non-finite values")]
    NonFinite,
    /// The bounds stored in the header disagree with the decoded geometry.
    #[error("shape header bounds do not match its payload")]
    BoundsMismatch,
    /// Compound shapes are nested deeper than the decoder allows.
    #[error("compound shapes nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
