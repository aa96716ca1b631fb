//! AuxPoW SPV - Block headers and merged-mining proofs.
//!
//! Provides the block `Header` type with its optional `AuxPow` payload, the
//! binary codec for both, double-SHA256 merkle branch evaluation, and the
//! `AuxPowVerifier` that checks a parent-chain block really commits to a
//! side-chain header and carries enough proof of work for it.

pub mod header;
pub mod auxpow;
pub mod merkle;
pub mod codec;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
pub use error::{AuxPowError, HeaderError, MissingCommitment};
pub use header::{ChainId, Header, AUXPOW_VERSION_FLAG, BASE_HEADER_SIZE};
pub use auxpow::AuxPow;
pub use merkle::{compute_root, merkle_tree_parent, MerkleBranch};
pub use codec::{decode, decode_pure, encode, AuxPowMode, DecodeOptions};
pub use verify::{AuxPowVerifier, CommitmentProof};
