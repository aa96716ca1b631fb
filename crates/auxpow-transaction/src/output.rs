//! Transaction outputs.

use auxpow_primitives::util::{WireReader, WireWriter};

use crate::script::Script;
use crate::TransactionError;

/// An 8-byte little-endian value followed by a length-prefixed script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Amount in the parent chain's smallest unit.
    pub value: u64,
    pub locking_script: Script,
}

impl TransactionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let value = reader
            .read_u64_le()
            .map_err(|e| TransactionError::SerializationError(format!("reading output value: {}", e)))?;
        let script = reader
            .read_var_bytes()
            .map_err(|e| TransactionError::SerializationError(format!("reading locking script: {}", e)))?;
        Ok(TransactionOutput {
            value,
            locking_script: Script::from_bytes(script),
        })
    }

    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u64_le(self.value);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }
}
