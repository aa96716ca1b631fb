/// Error types for transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying primitives error (forwarded from `auxpow-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] auxpow_primitives::PrimitivesError),
}
