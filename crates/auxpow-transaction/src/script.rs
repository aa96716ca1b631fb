//! Raw script bytes.
//!
//! Scripts are carried opaquely: nothing here interprets opcodes. The only
//! operation beyond (de)serialization is byte-pattern search, which is what
//! merged-mining commitment parsing needs from a coinbase script.

use std::fmt;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Return the raw script bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte offset of the first occurrence of `needle`, if any.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        self.positions(needle).next()
    }

    /// Byte offsets of every (possibly overlapping) occurrence of `needle`.
    ///
    /// An empty needle matches nowhere.
    pub fn positions<'a>(&'a self, needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        let windows = if needle.is_empty() { None } else { Some(self.0.windows(needle.len())) };
        windows
            .into_iter()
            .flatten()
            .enumerate()
            .filter(move |(_, window)| *window == needle)
            .map(|(offset, _)| offset)
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let bytes = hex::decode("76a914d648686cf603c11850f39600e37312738accca8f88ac").unwrap();
        let script = Script::from_bytes(&bytes);
        assert_eq!(script.len(), 25);
        assert_eq!(script.to_hex(), "76a914d648686cf603c11850f39600e37312738accca8f88ac");
        assert_eq!(format!("{:?}", script), "Script(76a914d648686cf603c11850f39600e37312738accca8f88ac)");
    }

    #[test]
    fn test_positions_finds_overlapping_matches() {
        let script = Script::from_bytes(&[0xaa, 0xaa, 0xaa, 0x01]);
        let found: Vec<usize> = script.positions(&[0xaa, 0xaa]).collect();
        assert_eq!(found, vec![0, 1]);
        assert_eq!(script.find(&[0x01]), Some(3));
        assert_eq!(script.find(&[0x02]), None);
        assert_eq!(script.positions(&[]).count(), 0);
    }

    #[test]
    fn test_needle_longer_than_script() {
        let script = Script::from_bytes(&[0x01]);
        assert_eq!(script.find(&[0x01, 0x02]), None);
    }
}
