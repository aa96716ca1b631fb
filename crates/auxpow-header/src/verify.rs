//! AuxPoW verification.
//!
//! A side-chain header is merge-mined when the coinbase of some parent-chain
//! block commits to a "chain merkle root" whose tree contains the side
//! header's hash at a slot derived from the chain id. The parent block's own
//! hash then stands in for the side header's proof of work.
//!
//! The commitment lives in the coinbase's first input script:
//!
//! ```text
//! [..] fa be 6d 6d | chain root (32, display order) | size (4 LE) | nonce (4 LE) [..]
//! ```
//!
//! Older miners omit the `fabe6d6d` marker; the root then has to start
//! within the first 20 bytes of the script.

use tracing::debug;

use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::target::Target;

use crate::auxpow::AuxPow;
use crate::error::{AuxPowError, MissingCommitment};
use crate::header::{ChainId, Header};

/// Marker preceding an explicit merged-mining commitment.
pub const MERGED_MINING_HEADER: [u8; 4] = [0xfa, 0xbe, 0x6d, 0x6d];

/// Highest script offset at which an unmarked chain root is accepted.
pub const MAX_INDEX_PC_BACKWARDS_COMPATIBILITY: usize = 20;

/// Longest chain merkle branch accepted.
pub const MAX_CHAIN_MERKLE_BRANCH_LENGTH: usize = 30;

/// Bytes following the root: tree size and nonce.
const SIZE_NONCE_LEN: usize = 8;

/// Values established while checking a commitment, so callers can re-derive
/// and compare them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentProof {
    /// Legacy txid of the parent coinbase.
    pub coinbase_txid: Hash,
    /// Root reached from the coinbase txid; equals the parent merkle root.
    pub coinbase_root: Hash,
    /// Root reached from the side header's hash through the chain branch.
    pub chain_root: Hash,
    /// Script offset at which the committed root starts.
    pub root_offset: usize,
    /// Whether the root was preceded by the merged-mining marker.
    pub explicit_marker: bool,
    /// Leaf count of the chain merkle tree, as written after the root.
    pub tree_size: u32,
    /// Nonce that seeds the expected chain slot.
    pub nonce: u32,
}

/// Slot of a chain in the chain merkle tree, derived from the coinbase nonce.
///
/// All arithmetic wraps at 32 bits.
///
/// # Arguments
/// * `nonce` - Nonce written after the tree size in the coinbase script.
/// * `chain_id` - Id of the side chain being placed.
/// * `branch_len` - Depth of the chain merkle tree.
///
/// # Returns
/// The index the chain branch must carry, in `0..2^branch_len`.
pub fn expected_index(nonce: u32, chain_id: ChainId, branch_len: usize) -> u32 {
    let mut rand = nonce;
    rand = rand.wrapping_mul(1_103_515_245).wrapping_add(12_345);
    rand = rand.wrapping_add(chain_id.0);
    rand = rand.wrapping_mul(1_103_515_245).wrapping_add(12_345);
    match u32::try_from(branch_len).ok().and_then(|len| 1u32.checked_shl(len)) {
        Some(slots) => rand % slots,
        None => rand,
    }
}

/// Checks AuxPoW payloads for a chain with a fixed chain id.
///
/// Stateless; one verifier can be shared across threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuxPowVerifier {
    expected_chain_id: ChainId,
}

impl AuxPowVerifier {
    /// Create a verifier for one side chain.
    ///
    /// # Arguments
    /// * `expected_chain_id` - The side chain's own id. Parent headers may
    ///   not carry it, and it seeds the expected chain-tree slot.
    pub fn new(expected_chain_id: ChainId) -> Self {
        AuxPowVerifier { expected_chain_id }
    }

    /// The chain id this verifier was built for.
    pub fn expected_chain_id(&self) -> ChainId {
        self.expected_chain_id
    }

    /// Full check: commitment structure, then parent proof of work against
    /// `side_target`.
    pub fn verify(&self, header: &Header, side_target: &Target) -> Result<(), AuxPowError> {
        self.verify_commitment(header)?;

        // Presence was established by verify_commitment.
        let auxpow = header.auxpow.as_deref().ok_or(AuxPowError::MissingPayload)?;
        let parent_hash = auxpow.parent_block_hash();
        if !side_target.is_met_by(&parent_hash) {
            debug!(
                header = %header.hash(),
                parent = %parent_hash,
                target = %side_target,
                "aux pow parent does not meet side target"
            );
            return Err(AuxPowError::InsufficientProofOfWork);
        }
        Ok(())
    }

    /// Every structural check short of proof of work.
    pub fn verify_commitment(&self, header: &Header) -> Result<CommitmentProof, AuxPowError> {
        let auxpow = header.auxpow.as_deref().ok_or(AuxPowError::MissingPayload)?;
        self.check_commitment(header, auxpow).inspect_err(|e| {
            debug!(header = %header.hash(), error = %e, "rejected aux pow commitment");
        })
    }

    fn check_commitment(
        &self,
        header: &Header,
        auxpow: &AuxPow,
    ) -> Result<CommitmentProof, AuxPowError> {
        if auxpow.parent_header.chain_id() == self.expected_chain_id {
            return Err(AuxPowError::OwnChainId);
        }

        if auxpow.coinbase_branch.index != 0 {
            return Err(AuxPowError::NotGenerate);
        }

        let chain_len = auxpow.chain_branch.len();
        if chain_len > MAX_CHAIN_MERKLE_BRANCH_LENGTH {
            return Err(AuxPowError::ChainMerkleTooLong(chain_len));
        }

        let coinbase_txid = auxpow.coinbase_txid();
        let coinbase_root = auxpow.coinbase_branch.root(&coinbase_txid);
        if coinbase_root != auxpow.parent_header.merkle_root {
            return Err(AuxPowError::BadCoinbaseMerkleBranch);
        }

        let script = match auxpow.coinbase_tx.inputs.first() {
            Some(input) => &input.unlocking_script,
            None => return Err(AuxPowError::CoinbaseNoInputs),
        };

        let chain_root = auxpow.chain_branch.root(&header.hash());
        let committed_root = chain_root.to_display_bytes();

        let root_offset = script
            .find(&committed_root)
            .ok_or(AuxPowError::CommitmentMissing(MissingCommitment::RootNotFound))?;

        let mut markers = script.positions(&MERGED_MINING_HEADER);
        let explicit_marker = match markers.next() {
            Some(marker_offset) => {
                if markers.next().is_some() {
                    return Err(AuxPowError::CommitmentDuplicated);
                }
                if marker_offset + MERGED_MINING_HEADER.len() != root_offset {
                    return Err(AuxPowError::CommitmentMissing(
                        MissingCommitment::HeaderNotBeforeRoot,
                    ));
                }
                true
            }
            None => {
                if root_offset > MAX_INDEX_PC_BACKWARDS_COMPATIBILITY {
                    return Err(AuxPowError::CommitmentTooLate(root_offset));
                }
                false
            }
        };

        let tail_start = root_offset + committed_root.len();
        let tail = script
            .to_bytes()
            .get(tail_start..tail_start + SIZE_NONCE_LEN)
            .ok_or(AuxPowError::CommitmentMissing(MissingCommitment::SizeNonceMissing))?;
        let tree_size = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let nonce = u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]);

        // chain_len <= 30, so the shift cannot overflow.
        if tree_size != 1u32 << chain_len {
            return Err(AuxPowError::CommitmentMissing(MissingCommitment::BranchSizeMismatch));
        }

        if auxpow.chain_branch.index != expected_index(nonce, header.chain_id(), chain_len) {
            return Err(AuxPowError::CommitmentMissing(MissingCommitment::WrongIndex));
        }

        Ok(CommitmentProof {
            coinbase_txid,
            coinbase_root,
            chain_root,
            root_offset,
            explicit_marker,
            tree_size,
            nonce,
        })
    }
}
