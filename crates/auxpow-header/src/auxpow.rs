//! Merged-mining proof attached to a side-chain header.

use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::util::{WireReader, WireWriter};
use auxpow_transaction::Transaction;

use crate::header::Header;
use crate::merkle::MerkleBranch;
use crate::HeaderError;

/// Proof that a parent-chain block commits to a side-chain header.
///
/// # Wire format
///
/// | Field            | Size                                     |
/// |------------------|------------------------------------------|
/// | coinbase_tx      | legacy transaction                       |
/// | parent_hash      | 32 bytes                                 |
/// | coinbase_branch  | VarInt count, hashes, 4-byte index       |
/// | chain_branch     | VarInt count, hashes, 4-byte index       |
/// | parent_header    | 80 bytes                                 |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuxPow {
    /// Coinbase of the parent block; its first input script holds the
    /// commitment.
    pub coinbase_tx: Transaction,
    /// Parent block hash as transmitted. Carried for re-encoding only; the
    /// verifier always hashes `parent_header` itself.
    pub parent_hash: Hash,
    /// Path from the coinbase txid to the parent header's merkle root.
    pub coinbase_branch: MerkleBranch,
    /// Path from the side-chain header hash to the committed chain root.
    pub chain_branch: MerkleBranch,
    /// Parent block header. Never carries a nested payload.
    pub parent_header: Header,
}

impl AuxPow {
    /// Read an AuxPoW payload. The coinbase is always read in the legacy
    /// format.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, HeaderError> {
        let coinbase_tx = Transaction::read_from(reader)?;
        let parent_hash = reader.read_hash()?;
        let coinbase_branch = MerkleBranch::read_from(reader)?;
        let chain_branch = MerkleBranch::read_from(reader)?;
        let parent_header = Header::read_base_from(reader)?;
        Ok(AuxPow {
            coinbase_tx,
            parent_hash,
            coinbase_branch,
            chain_branch,
            parent_header,
        })
    }

    /// Append the payload in the layout [`AuxPow::read_from`] reads.
    pub fn write_to(&self, writer: &mut WireWriter) {
        self.coinbase_tx.write_to(writer);
        writer.write_hash(&self.parent_hash);
        self.coinbase_branch.write_to(writer);
        self.chain_branch.write_to(writer);
        self.parent_header.write_base_to(writer);
    }

    /// Legacy txid of the parent coinbase.
    pub fn coinbase_txid(&self) -> Hash {
        self.coinbase_tx.tx_id()
    }

    /// Hash of the parent header, computed from its fields.
    pub fn parent_block_hash(&self) -> Hash {
        self.parent_header.hash()
    }
}
