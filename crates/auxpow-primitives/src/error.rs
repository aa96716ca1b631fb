/// Unified error type for all primitives operations.
///
/// Covers errors from hash parsing, wire decoding, and compact target handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("read position {position} is beyond the end of {len} bytes")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("invalid compact target {0:#010x}")]
    InvalidCompactTarget(u32),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
