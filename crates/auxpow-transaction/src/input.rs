//! Transaction inputs.
//!
//! In a coinbase the outpoint is null and the unlocking script holds
//! arbitrary miner data, which is where merged-mining commitments live.

use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::util::{WireReader, WireWriter};

use crate::script::Script;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Output index used by coinbase inputs, which spend nothing.
pub const COINBASE_OUT_INDEX: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`source_txid`) and output index (`source_tx_out_index`).
/// In a coinbase the reference is null and `unlocking_script` holds
/// arbitrary miner data, which is where merged-mining commitments live.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The transaction ID of the output being spent.
    pub source_txid: Hash,

    /// Index of the output within the source transaction.
    pub source_tx_out_index: u32,

    /// The unlocking script (scriptSig); the coinbase script for a coinbase.
    pub unlocking_script: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,
}

impl TransactionInput {
    /// Create a new `TransactionInput` with default values.
    ///
    /// The source txid is zeroed, output index is 0, sequence is finalized
    /// and the unlocking script is empty.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: Hash::ZERO,
            source_tx_out_index: 0,
            unlocking_script: Script::new(),
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
        }
    }

    /// Create a coinbase input carrying `script` as its coinbase data.
    pub fn coinbase(script: Script) -> Self {
        TransactionInput {
            source_txid: Hash::ZERO,
            source_tx_out_index: COINBASE_OUT_INDEX,
            unlocking_script: script,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
        }
    }

    /// Deserialize a `TransactionInput` from a `WireReader`.
    ///
    /// Reads the standard wire format: 32-byte txid, 4-byte output index,
    /// varint-prefixed unlocking script, and 4-byte sequence number.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a `TransactionError` if the
    /// data is truncated or malformed.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let source_txid = reader.read_hash().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            unlocking_script: Script::from_bytes(script_bytes),
            sequence_number,
        })
    }

    /// Serialize this `TransactionInput` into a `WireWriter`.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_hash(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        writer.write_var_bytes(self.unlocking_script.to_bytes());
        writer.write_u32_le(self.sequence_number);
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
