use auxpow_primitives::PrimitivesError;
use auxpow_transaction::TransactionError;

/// Error types for header decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// The input is truncated or malformed, or the start position lies past
    /// its end.
    #[error("header decode error: {0}")]
    Decode(String),
    /// A complete header was decoded but bytes remain and trailing data was
    /// not expected.
    #[error("{0} unexpected trailing bytes after header")]
    TrailingData(usize),
}

impl From<PrimitivesError> for HeaderError {
    fn from(e: PrimitivesError) -> Self {
        HeaderError::Decode(e.to_string())
    }
}

impl From<TransactionError> for HeaderError {
    fn from(e: TransactionError) -> Self {
        HeaderError::Decode(format!("parent coinbase: {}", e))
    }
}

/// Which part of the coinbase commitment could not be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCommitment {
    /// The chain merkle root does not occur in the coinbase script.
    RootNotFound,
    /// The merged-mining marker is present but the root does not follow it.
    HeaderNotBeforeRoot,
    /// Fewer than eight bytes follow the root.
    SizeNonceMissing,
    /// The committed tree size is not `2^branch_len`.
    BranchSizeMismatch,
    /// The chain branch index differs from the slot derived from the nonce.
    WrongIndex,
}

impl std::fmt::Display for MissingCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            MissingCommitment::RootNotFound => "chain merkle root not found in coinbase script",
            MissingCommitment::HeaderNotBeforeRoot => {
                "merged-mining header is not just before the chain merkle root"
            }
            MissingCommitment::SizeNonceMissing => "missing chain merkle tree size and nonce",
            MissingCommitment::BranchSizeMismatch => "chain merkle tree size does not match branch",
            MissingCommitment::WrongIndex => "wrong index in chain merkle branch",
        };
        f.write_str(reason)
    }
}

/// Reasons an AuxPoW proof is rejected, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuxPowError {
    /// The header carries no AuxPoW payload.
    #[error("header has no auxpow payload")]
    MissingPayload,
    /// The parent block was mined under this chain's own chain id.
    #[error("aux pow parent has our own chain id")]
    OwnChainId,
    /// The proven transaction is not the parent block's coinbase.
    #[error("aux pow is not a generate")]
    NotGenerate,
    #[error("aux pow chain merkle branch too long ({0} hashes)")]
    ChainMerkleTooLong(usize),
    /// The coinbase is not included in the parent block's merkle tree.
    #[error("aux pow merkle root incorrect")]
    BadCoinbaseMerkleBranch,
    #[error("aux pow coinbase transaction has no inputs")]
    CoinbaseNoInputs,
    /// Implicit commitment starts beyond the backward-compatible offset.
    #[error("aux pow chain merkle root must start in the first 20 bytes of the parent coinbase (found at {0})")]
    CommitmentTooLate(usize),
    #[error("multiple merged mining headers in coinbase")]
    CommitmentDuplicated,
    #[error("aux pow commitment missing: {0}")]
    CommitmentMissing(MissingCommitment),
    /// The parent block hash does not meet the side chain's target.
    #[error("insufficient proof of work in parent block")]
    InsufficientProofOfWork,
}
