use auxpow_header::{AuxPowError, ChainId, HeaderError};
use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::PrimitivesError;

/// Error types for header-chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("header decode error: {0}")]
    Decode(#[from] HeaderError),

    #[error("aux pow rejected: {0}")]
    AuxPow(#[from] AuxPowError),

    #[error("unknown parent {prev_hash} for header at height {height}")]
    UnknownParent { height: u32, prev_hash: Hash },

    #[error("genesis mismatch: expected {expected}, got {actual}")]
    GenesisMismatch { expected: Hash, actual: Hash },

    #[error("checkpoint mismatch at height {height}: expected {expected}, got {actual}")]
    CheckpointMismatch { height: u32, expected: Hash, actual: Hash },

    #[error("chain work at checkpoint height {height} does not match")]
    CheckpointWorkMismatch { height: u32 },

    #[error("fork at height {height} is at or below the highest checkpoint")]
    ForkBelowCheckpoint { height: u32 },

    #[error("header at height {height} conflicts with finalized history")]
    BelowFinalized { height: u32 },

    #[error("bad bits at height {height}: expected {expected:#010x}, got {actual:#010x}")]
    BadBits { height: u32, expected: u32, actual: u32 },

    #[error("insufficient proof of work at height {height}")]
    InsufficientProofOfWork { height: u32 },

    #[error("aux pow header at height {height} has no payload")]
    MissingAuxPow { height: u32 },

    #[error("header at height {height} carries aux pow before activation")]
    UnexpectedAuxPow { height: u32 },

    #[error("wrong chain id at height {height}: expected {expected}, got {actual}")]
    WrongChainId { height: u32, expected: ChainId, actual: ChainId },

    #[error("ancestor at height {0} is not available")]
    MissingAncestor(u32),

    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid network parameters: {0}")]
    Config(String),

    #[error("network has no checkpoints")]
    NoCheckpoint,

    #[error("chain has no headers")]
    EmptyChain,
}
