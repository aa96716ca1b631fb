//! Chain tracker trait for SPV verification.

use auxpow_primitives::chainhash::Hash;

use crate::chain::HeaderChain;
use crate::retarget::RetargetPolicy;
use crate::store::HeaderStore;
use crate::ChainError;

/// Trait for verifying Merkle roots against block headers.
///
/// Implementors provide access to validated header data, allowing SPV
/// verification of transactions by checking that a computed Merkle root
/// matches the root committed to at a given height.
pub trait ChainTracker {
    /// Verify that a Merkle root is valid for a given block height.
    ///
    /// # Returns
    /// `Ok(true)` if the root matches the header at the given height on the
    /// active chain, `Ok(false)` if it differs or the height is unknown.
    fn is_valid_root_for_height(&self, root: &Hash, height: u32) -> Result<bool, ChainError>;

    /// Get the current chain tip height.
    fn current_height(&self) -> Result<u32, ChainError>;
}

impl<S: HeaderStore, P: RetargetPolicy> ChainTracker for HeaderChain<S, P> {
    fn is_valid_root_for_height(&self, root: &Hash, height: u32) -> Result<bool, ChainError> {
        Ok(self
            .header_at(height)?
            .is_some_and(|header| header.merkle_root == *root))
    }

    fn current_height(&self) -> Result<u32, ChainError> {
        self.active_tip()
            .map(|tip| tip.height)
            .ok_or(ChainError::EmptyChain)
    }
}
