//! 32-byte block and transaction identifiers.
//!
//! Bytes are kept in internal (wire) order. Text forms use display order,
//! the byte-reversed hex that block explorers and configuration files show.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::{sha256d, sha256d_concat};
use crate::PrimitivesError;

pub const HASH_SIZE: usize = 32;

/// Length of a display-order hex hash.
pub const MAX_HASH_STRING_SIZE: usize = HASH_SIZE * 2;

/// A double-SHA-256 digest: block hash, txid or merkle node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Previous-block hash of a genesis header and outpoint of a coinbase.
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE]);

    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Internal-order bytes; the slice must be exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        <[u8; HASH_SIZE]>::try_from(bytes)
            .map(Hash)
            .map_err(|_| PrimitivesError::InvalidHash(format!("{} bytes, want {}", bytes.len(), HASH_SIZE)))
    }

    /// Parse 64 display-order hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.len() != MAX_HASH_STRING_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "{} hex characters, want {}",
                hex_str.len(),
                MAX_HASH_STRING_SIZE
            )));
        }
        let mut display = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex_str, &mut display)?;
        Ok(Hash::from_display_bytes(display))
    }

    pub fn from_display_bytes(mut bytes: [u8; HASH_SIZE]) -> Self {
        bytes.reverse();
        Hash(bytes)
    }

    /// Display-order bytes. Merged-mining commitments embed chain roots in
    /// this order.
    pub fn to_display_bytes(&self) -> [u8; HASH_SIZE] {
        let mut reversed = self.0;
        reversed.reverse();
        reversed
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Hash::ZERO
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_display_bytes()))
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub fn double_hash_h(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}

/// Merkle node over two children in internal byte order.
pub fn double_hash_pair(left: &Hash, right: &Hash) -> Hash {
    Hash(sha256d_concat(&left.0, &right.0))
}
