//! Storage of finalized headers.
//!
//! Finalized history is append-only and contiguous: the first append fixes
//! the base height, every later append must be exactly one above the tip.

use std::collections::HashMap;

use num_bigint::BigUint;

use auxpow_header::Header;
use auxpow_primitives::chainhash::Hash;

use crate::ChainError;

/// A finalized header with its cumulative work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredHeader {
    /// Stored without its payload at or below the highest checkpoint.
    pub header: Header,
    pub chain_work: BigUint,
}

/// Append-only, height-indexed header storage.
pub trait HeaderStore {
    /// Height of the last stored header, or `None` if the store is empty.
    fn tip_height(&self) -> Result<Option<u32>, ChainError>;

    fn header(&self, height: u32) -> Result<Option<StoredHeader>, ChainError>;

    fn height_of(&self, hash: &Hash) -> Result<Option<u32>, ChainError>;

    /// Append at `height`, which must be one above the tip (any height for
    /// an empty store).
    fn append(&mut self, height: u32, stored: StoredHeader) -> Result<(), ChainError>;
}

/// In-memory [`HeaderStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryHeaderStore {
    base_height: u32,
    headers: Vec<StoredHeader>,
    heights: HashMap<Hash, u32>,
}

impl MemoryHeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the first stored header.
    pub fn base_height(&self) -> Option<u32> {
        (!self.headers.is_empty()).then_some(self.base_height)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl HeaderStore for MemoryHeaderStore {
    fn tip_height(&self) -> Result<Option<u32>, ChainError> {
        Ok(self
            .headers
            .len()
            .checked_sub(1)
            .map(|top| self.base_height + top as u32))
    }

    fn header(&self, height: u32) -> Result<Option<StoredHeader>, ChainError> {
        let Some(offset) = height.checked_sub(self.base_height) else {
            return Ok(None);
        };
        Ok(self.headers.get(offset as usize).cloned())
    }

    fn height_of(&self, hash: &Hash) -> Result<Option<u32>, ChainError> {
        Ok(self.heights.get(hash).copied())
    }

    fn append(&mut self, height: u32, stored: StoredHeader) -> Result<(), ChainError> {
        match self.tip_height()? {
            None => self.base_height = height,
            Some(tip) if tip.checked_add(1) == Some(height) => {}
            Some(tip) => {
                return Err(ChainError::Storage(format!(
                    "append at height {} is not contiguous with tip {}",
                    height, tip
                )))
            }
        }
        self.heights.insert(stored.header.hash(), height);
        self.headers.push(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(nonce: u32) -> StoredHeader {
        StoredHeader {
            header: Header { nonce, ..Header::default() },
            chain_work: BigUint::from(nonce),
        }
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryHeaderStore::new();
        assert_eq!(store.tip_height().unwrap(), None);
        assert_eq!(store.header(0).unwrap(), None);
        assert_eq!(store.base_height(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_contiguous() {
        let mut store = MemoryHeaderStore::new();
        store.append(4031, stored(1)).unwrap();
        store.append(4032, stored(2)).unwrap();

        assert_eq!(store.base_height(), Some(4031));
        assert_eq!(store.tip_height().unwrap(), Some(4032));
        assert_eq!(store.header(4032).unwrap(), Some(stored(2)));
        assert_eq!(store.header(4030).unwrap(), None);
        assert_eq!(store.height_of(&stored(1).header.hash()).unwrap(), Some(4031));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_rejects_gaps_and_rewrites() {
        let mut store = MemoryHeaderStore::new();
        store.append(0, stored(1)).unwrap();
        assert!(matches!(store.append(2, stored(2)), Err(ChainError::Storage(_))));
        assert!(matches!(store.append(0, stored(2)), Err(ChainError::Storage(_))));
        assert_eq!(store.tip_height().unwrap(), Some(0));
    }
}
