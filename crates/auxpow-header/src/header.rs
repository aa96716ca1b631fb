//! Block header type.
//!
//! A header is the six fixed fields of the 80-byte base serialization plus an
//! optional AuxPoW payload. Only the base fields are hashed.

use std::fmt;

use serde::{Deserialize, Serialize};

use auxpow_primitives::chainhash::{double_hash_h, Hash};
use auxpow_primitives::target::Target;
use auxpow_primitives::util::{WireReader, WireWriter};
use auxpow_primitives::PrimitivesError;

use crate::auxpow::AuxPow;

/// Size of the base header serialization in bytes.
pub const BASE_HEADER_SIZE: usize = 80;

/// Version bit signalling that an AuxPoW payload follows the base header.
pub const AUXPOW_VERSION_FLAG: u32 = 1 << 8;

/// Identifier of a merge-mined chain, stored in the top 16 bits of a header
/// version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u32);

impl ChainId {
    /// Extract the chain id from a header version.
    pub const fn from_version(version: u32) -> Self {
        ChainId(version >> 16)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A block header.
///
/// # Wire format
///
/// | Field        | Size           |
/// |--------------|----------------|
/// | version      | 4 bytes (LE)   |
/// | prev_hash    | 32 bytes       |
/// | merkle_root  | 32 bytes       |
/// | timestamp    | 4 bytes (LE)   |
/// | bits         | 4 bytes (LE)   |
/// | nonce        | 4 bytes (LE)   |
/// | auxpow       | variable, only when flagged and decoded above checkpoints |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    /// Merged-mining proof. Never part of the header's identity.
    pub auxpow: Option<Box<AuxPow>>,
}

impl Header {
    /// Read the 80 base bytes. Never reads an AuxPoW payload.
    pub fn read_base_from(reader: &mut WireReader) -> Result<Self, PrimitivesError> {
        Ok(Header {
            version: reader.read_u32_le()?,
            prev_hash: reader.read_hash()?,
            merkle_root: reader.read_hash()?,
            timestamp: reader.read_u32_le()?,
            bits: reader.read_u32_le()?,
            nonce: reader.read_u32_le()?,
            auxpow: None,
        })
    }

    /// Append the 80 base bytes to `writer`.
    pub fn write_base_to(&self, writer: &mut WireWriter) {
        writer.write_u32_le(self.version);
        writer.write_hash(&self.prev_hash);
        writer.write_hash(&self.merkle_root);
        writer.write_u32_le(self.timestamp);
        writer.write_u32_le(self.bits);
        writer.write_u32_le(self.nonce);
    }

    /// The 80-byte base serialization.
    pub fn base_bytes(&self) -> [u8; BASE_HEADER_SIZE] {
        let mut writer = WireWriter::with_capacity(BASE_HEADER_SIZE);
        self.write_base_to(&mut writer);
        let mut out = [0u8; BASE_HEADER_SIZE];
        out.copy_from_slice(&writer.into_bytes());
        out
    }

    /// Block hash: double SHA-256 of the base serialization.
    pub fn hash(&self) -> Hash {
        double_hash_h(&self.base_bytes())
    }

    /// Chain id carried in the top 16 bits of the version.
    pub fn chain_id(&self) -> ChainId {
        ChainId::from_version(self.version)
    }

    /// Whether the version predates chain ids: version 1, or version 2
    /// with a zero chain id.
    pub fn is_legacy(&self) -> bool {
        self.version == 1 || (self.version == 2 && self.chain_id() == ChainId(0))
    }

    /// Whether the version announces an AuxPoW payload.
    pub fn has_auxpow_flag(&self) -> bool {
        self.version & AUXPOW_VERSION_FLAG != 0
    }

    /// A copy of this header with the AuxPoW payload stripped, as stored for
    /// checkpointed history.
    pub fn truncated(&self) -> Header {
        Header {
            auxpow: None,
            ..self.clone()
        }
    }

    /// Decode `bits` into a target.
    pub fn target(&self) -> Result<Target, PrimitivesError> {
        Target::from_compact(self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bitcoin block 1; its hash is a well-known value.
    const BLOCK_ONE_HEX: &str = "010000006fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000982051fd1e4ba744bbbe680e1fee14677ba1a3c3540bf7b1cdb606e857233e0e61bc6649ffff001d01e36299";

    #[test]
    fn test_block_one_hash() {
        let bytes = hex::decode(BLOCK_ONE_HEX).unwrap();
        let header = Header::read_base_from(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.bits, 0x1d00ffff);
        assert_eq!(
            header.prev_hash.to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert_eq!(
            header.hash().to_string(),
            "00000000839a8e6886ab5951d76f411475428afc90947ee320161bbf18eb6048"
        );
        assert_eq!(header.base_bytes().to_vec(), bytes);
        assert!(header.target().unwrap().is_met_by(&header.hash()));
    }

    #[test]
    fn test_chain_id_and_flag() {
        let header = Header { version: 0x0001_0101, ..Header::default() };
        assert_eq!(header.chain_id(), ChainId(1));
        assert!(header.has_auxpow_flag());

        let plain = Header { version: 0x2000_0000, ..Header::default() };
        assert_eq!(plain.chain_id(), ChainId(0x2000));
        assert!(!plain.has_auxpow_flag());
    }

    #[test]
    fn test_legacy_versions() {
        for version in [1, 2] {
            assert!(Header { version, ..Header::default() }.is_legacy(), "version {}", version);
        }
        for version in [3, 0x0001_0002, 0x0001_0101, 0x2000_0000] {
            assert!(!Header { version, ..Header::default() }.is_legacy(), "version {:#x}", version);
        }
    }

    #[test]
    fn test_chain_id_serde_is_a_number() {
        assert_eq!(serde_json::to_string(&ChainId(1)).unwrap(), "1");
        assert_eq!(serde_json::from_str::<ChainId>("16").unwrap(), ChainId(16));
    }
}
