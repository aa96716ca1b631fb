//! Fixture builders for merged-mined and plain headers.
//!
//! Everything here constructs fresh values: a payload is never patched in
//! place, it is rebuilt around whatever coinbase or parameters a test needs.

use auxpow_primitives::chainhash::{double_hash_h, Hash};
use auxpow_primitives::target::Target;
use auxpow_transaction::{Script, Transaction, TransactionInput, TransactionOutput};

use crate::auxpow::AuxPow;
use crate::header::{ChainId, Header, AUXPOW_VERSION_FLAG};
use crate::merkle::MerkleBranch;
use crate::verify::{expected_index, MERGED_MINING_HEADER};

/// Compact form of the easiest target (regtest limit). Roughly every second
/// hash meets it.
pub const EASY_BITS: u32 = 0x207f_ffff;

/// Version of a side-chain AuxPoW header with chain id 1.
pub const SIDE_VERSION: u32 = (1 << 16) | AUXPOW_VERSION_FLAG | 1;

/// Decode [`EASY_BITS`].
pub fn easy_target() -> Target {
    Target::from_compact(EASY_BITS).expect("EASY_BITS is a valid compact target")
}

/// Placement of the chain root in the coinbase script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitmentStyle {
    /// `prefix`, marker, root, size, nonce.
    Explicit { prefix: Vec<u8> },
    /// `offset` filler bytes, then root, size, nonce. No marker.
    Implicit { offset: usize },
}

/// Builds an [`AuxPow`] committing to a given side header.
#[derive(Clone, Debug)]
pub struct AuxPowBuilder {
    parent_chain_id: ChainId,
    coinbase_branch_len: usize,
    chain_branch_len: usize,
    chain_index: Option<u32>,
    style: CommitmentStyle,
    script_suffix: Vec<u8>,
    parent_target: Option<Target>,
}

impl Default for AuxPowBuilder {
    fn default() -> Self {
        AuxPowBuilder {
            parent_chain_id: ChainId(0),
            coinbase_branch_len: 2,
            chain_branch_len: 2,
            chain_index: None,
            style: CommitmentStyle::Explicit { prefix: vec![0x03, 0x01, 0x02, 0x03] },
            script_suffix: b"/fixture/".to_vec(),
            parent_target: Some(easy_target()),
        }
    }
}

impl AuxPowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_chain_id(mut self, chain_id: ChainId) -> Self {
        self.parent_chain_id = chain_id;
        self
    }

    pub fn coinbase_branch_len(mut self, len: usize) -> Self {
        self.coinbase_branch_len = len;
        self
    }

    pub fn chain_branch_len(mut self, len: usize) -> Self {
        self.chain_branch_len = len;
        self
    }

    /// Place the side header at `index`; the commitment nonce is searched
    /// so that the derived slot matches. Must be below `2^chain_branch_len`.
    pub fn chain_index(mut self, index: u32) -> Self {
        self.chain_index = Some(index);
        self
    }

    pub fn explicit(mut self, prefix: Vec<u8>) -> Self {
        self.style = CommitmentStyle::Explicit { prefix };
        self
    }

    pub fn implicit(mut self, offset: usize) -> Self {
        self.style = CommitmentStyle::Implicit { offset };
        self
    }

    pub fn script_suffix(mut self, suffix: Vec<u8>) -> Self {
        self.script_suffix = suffix;
        self
    }

    /// Mine the parent header until its hash meets `target`; `None` leaves
    /// the parent unmined.
    pub fn parent_target(mut self, target: Option<Target>) -> Self {
        self.parent_target = target;
        self
    }

    /// Build a payload committing to `side` (its payload, if any, is
    /// ignored).
    pub fn build(&self, side: &Header) -> AuxPow {
        let nonce = self.commitment_nonce(side.chain_id());
        let index = expected_index(nonce, side.chain_id(), self.chain_branch_len);

        let chain_hashes: Vec<Hash> = (0..self.chain_branch_len)
            .map(|i| filler(b"chain", i))
            .collect();
        let chain_branch = MerkleBranch::new(chain_hashes, index);
        let chain_root = chain_branch.root(&side.hash());

        let mut script = match &self.style {
            CommitmentStyle::Explicit { prefix } => {
                let mut script = prefix.clone();
                script.extend_from_slice(&MERGED_MINING_HEADER);
                script
            }
            CommitmentStyle::Implicit { offset } => vec![0x00; *offset],
        };
        script.extend_from_slice(&chain_root.to_display_bytes());
        script.extend_from_slice(&(1u32 << self.chain_branch_len.min(31)).to_le_bytes());
        script.extend_from_slice(&nonce.to_le_bytes());
        script.extend_from_slice(&self.script_suffix);

        let coinbase_branch = MerkleBranch::new(
            (0..self.coinbase_branch_len).map(|i| filler(b"parent tx", i)).collect(),
            0,
        );

        let auxpow = AuxPow {
            coinbase_tx: coinbase_with_script(script),
            parent_hash: Hash::ZERO,
            coinbase_branch,
            chain_branch,
            parent_header: Header {
                version: (self.parent_chain_id.0 << 16) | 1,
                prev_hash: filler(b"parent prev", 0),
                merkle_root: Hash::ZERO,
                timestamp: side.timestamp,
                bits: 0x1d00_ffff,
                nonce: 0,
                auxpow: None,
            },
        };
        seal(auxpow, self.parent_target.as_ref())
    }

    /// `side` with a freshly built payload attached.
    pub fn attach(&self, side: Header) -> Header {
        let auxpow = self.build(&side);
        Header {
            auxpow: Some(Box::new(auxpow)),
            ..side
        }
    }

    fn commitment_nonce(&self, chain_id: ChainId) -> u32 {
        match self.chain_index {
            None => 0,
            Some(index) => (0..=u32::MAX)
                .find(|n| expected_index(*n, chain_id, self.chain_branch_len) == index)
                .unwrap_or(0),
        }
    }
}

/// Rebuild `auxpow` around `coinbase`: the coinbase branch becomes
/// `[txid]` at index 0, the parent merkle root follows, and the parent is
/// re-mined to the easy target.
pub fn with_coinbase(auxpow: &AuxPow, coinbase: Transaction) -> AuxPow {
    let txid = coinbase.tx_id();
    let rebuilt = AuxPow {
        coinbase_tx: coinbase,
        coinbase_branch: MerkleBranch::new(vec![txid], 0),
        ..auxpow.clone()
    };
    seal(rebuilt, Some(&easy_target()))
}

/// A coinbase with one input carrying `script` and a single output.
pub fn coinbase_with_script(script: Vec<u8>) -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::coinbase(Script::from(script)));
    tx.add_output(TransactionOutput {
        value: 50 * 100_000_000,
        locking_script: Script::from_bytes(&[0x51]),
    });
    tx
}

/// The coinbase script of `auxpow`.
pub fn coinbase_script(auxpow: &AuxPow) -> Vec<u8> {
    auxpow
        .coinbase_tx
        .inputs
        .first()
        .map(|input| input.unlocking_script.to_bytes().to_vec())
        .unwrap_or_default()
}

/// An AuxPoW-flagged side header with chain id 1 and easy bits.
pub fn side_header(prev_hash: Hash, timestamp: u32) -> Header {
    Header {
        version: SIDE_VERSION,
        prev_hash,
        merkle_root: double_hash_h(&timestamp.to_le_bytes()),
        timestamp,
        bits: EASY_BITS,
        nonce: 0,
        auxpow: None,
    }
}

/// Increment the nonce until the header hash meets `target`.
pub fn mine(mut header: Header, target: &Target) -> Header {
    while !target.is_met_by(&header.hash()) {
        header.nonce = header.nonce.wrapping_add(1);
    }
    header
}

/// Increment the nonce until the header hash does NOT meet `target`.
pub fn mine_failing(mut header: Header, target: &Target) -> Header {
    while target.is_met_by(&header.hash()) {
        header.nonce = header.nonce.wrapping_add(1);
    }
    header
}

/// Fix the parent merkle root to the coinbase branch, optionally mine the
/// parent, and record its hash.
fn seal(mut auxpow: AuxPow, target: Option<&Target>) -> AuxPow {
    auxpow.parent_header.merkle_root = auxpow.coinbase_branch.root(&auxpow.coinbase_txid());
    if let Some(target) = target {
        auxpow.parent_header = mine(auxpow.parent_header, target);
    }
    auxpow.parent_hash = auxpow.parent_header.hash();
    auxpow
}

fn filler(tag: &[u8], i: usize) -> Hash {
    let mut data = tag.to_vec();
    data.extend_from_slice(&(i as u32).to_le_bytes());
    double_hash_h(&data)
}
