//! Parent-chain transactions.
//!
//! AuxPoW payloads carry the parent block's coinbase in the legacy layout,
//! which is also the layout ids are computed over. A coinbase with no
//! inputs or no outputs is structurally valid here; the verifier decides
//! what it accepts.

use auxpow_primitives::chainhash::{double_hash_h, Hash};
use auxpow_primitives::util::{VarInt, WireReader, WireWriter};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// Encoded size floors, used to cap preallocation from untrusted counts.
const MIN_INPUT_SIZE: usize = 32 + 4 + 1 + 4;
const MIN_OUTPUT_SIZE: usize = 8 + 1;

/// A transaction in the legacy wire layout.
///
/// | Field        | Size          |
/// |--------------|---------------|
/// | version      | 4 bytes (LE)  |
/// | input count  | VarInt        |
/// | inputs       | per input     |
/// | output count | VarInt        |
/// | outputs      | per output    |
/// | lock_time    | 4 bytes (LE)  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    /// May be empty; merged-mining coinbases with no outputs exist.
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

fn decode_err(field: &'static str) -> impl FnOnce(auxpow_primitives::PrimitivesError) -> TransactionError {
    move |e| TransactionError::SerializationError(format!("reading {}: {}", field, e))
}

impl Transaction {
    /// Version 1, no inputs or outputs, lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Read one transaction from `reader`, leaving it positioned after the
    /// lock time.
    ///
    /// # Returns
    /// The decoded transaction, or a `TransactionError` if the bytes are
    /// truncated.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(decode_err("version"))?;

        let input_count = reader.read_varint().map_err(decode_err("input count"))?.value();
        let mut inputs = Vec::with_capacity(reader.bounded_capacity(input_count, MIN_INPUT_SIZE));
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(decode_err("output count"))?.value();
        let mut outputs = Vec::with_capacity(reader.bounded_capacity(output_count, MIN_OUTPUT_SIZE));
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(decode_err("lock time"))?;
        Ok(Transaction { version, inputs, outputs, lock_time })
    }

    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        self.inputs.iter().for_each(|input| input.write_to(writer));
        writer.write_varint(VarInt::from(self.outputs.len()));
        self.outputs.iter().for_each(|output| output.write_to(writer));
        writer.write_u32_le(self.lock_time);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Double SHA-256 of the serialization, internal order.
    pub fn tx_id(&self) -> Hash {
        double_hash_h(&self.to_bytes())
    }

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
