//! Difficulty retargeting.
//!
//! The chain manager asks a [`RetargetPolicy`] for the compact bits a new
//! header must carry. The policy reads ancestors through a [`ChainView`] of the
//! branch the header would extend, so the same policy serves the active
//! chain and any fork.

use num_bigint::BigUint;

use auxpow_header::Header;
use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::target::Target;

use crate::params::{Checkpoint, NetworkParams};
use crate::ChainError;

/// The fields of an ancestor header a retarget rule may read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub hash: Hash,
    pub bits: u32,
    pub timestamp: u32,
}

impl From<&Header> for BlockInfo {
    fn from(header: &Header) -> Self {
        BlockInfo {
            hash: header.hash(),
            bits: header.bits,
            timestamp: header.timestamp,
        }
    }
}

/// Read access to the ancestors of a candidate header.
pub trait ChainView {
    /// The header at `height` on this branch, if known.
    fn block_at(&self, height: u32) -> Result<Option<BlockInfo>, ChainError>;
}

/// Decides the compact bits a header at a given height must carry.
///
/// The value is compared with `header.bits` as is, so inherited bits are
/// returned unchanged, never re-encoded.
pub trait RetargetPolicy: Send + Sync {
    /// Required bits for `header` at `height`, given the branch it extends.
    ///
    /// # Arguments
    /// * `chain` - Ancestors of `header` on the branch it would join.
    /// * `height` - Height `header` would occupy.
    /// * `header` - The candidate; rules may read its timestamp.
    ///
    /// # Returns
    /// The compact target, or `MissingAncestor` if the branch is too short
    /// to evaluate the rule.
    fn required_bits(
        &self,
        chain: &dyn ChainView,
        height: u32,
        header: &Header,
    ) -> Result<u32, ChainError>;
}

/// Bitcoin-style retargeting every `retarget_interval` headers.
#[derive(Clone, Debug)]
pub struct StandardRetarget {
    interval: u32,
    timespan: u32,
    spacing: u32,
    pow_limit: Target,
    pow_limit_bits: u32,
    allow_min_difficulty: bool,
    lookback_fix: bool,
    checkpoints: Vec<Checkpoint>,
}

impl StandardRetarget {
    pub fn new(params: &NetworkParams) -> Result<Self, ChainError> {
        Ok(StandardRetarget {
            interval: params.retarget_interval.max(1),
            timespan: params.target_timespan,
            spacing: params.target_spacing,
            pow_limit: params.pow_limit()?,
            pow_limit_bits: params.pow_limit_bits,
            allow_min_difficulty: params.allow_min_difficulty,
            lookback_fix: params.retarget_lookback_fix,
            checkpoints: params.checkpoints.clone(),
        })
    }

    fn ancestor(chain: &dyn ChainView, height: u32) -> Result<BlockInfo, ChainError> {
        chain.block_at(height)?.ok_or(ChainError::MissingAncestor(height))
    }

    /// Off-boundary bits under the minimum-difficulty rule.
    fn min_difficulty_bits(
        &self,
        chain: &dyn ChainView,
        height: u32,
        header: &Header,
        prev: BlockInfo,
    ) -> Result<u32, ChainError> {
        let slow = u64::from(header.timestamp)
            > u64::from(prev.timestamp) + 2 * u64::from(self.spacing);
        if slow {
            return Ok(self.pow_limit_bits);
        }

        // Walk back to the last header that did not use the pow limit.
        let mut bits = prev.bits;
        let mut at = height - 1;
        while at % self.interval != 0 && bits == self.pow_limit_bits {
            at -= 1;
            match chain.block_at(at)? {
                Some(info) => bits = info.bits,
                None => break,
            }
        }
        Ok(bits)
    }

    /// Bits for the first header of a new interval.
    fn next_interval_bits(
        &self,
        chain: &dyn ChainView,
        height: u32,
        prev: BlockInfo,
    ) -> Result<u32, ChainError> {
        let lookback = if self.lookback_fix && height != self.interval {
            self.interval
        } else {
            self.interval - 1
        };
        let first_height = (height - 1)
            .checked_sub(lookback)
            .ok_or(ChainError::MissingAncestor(0))?;
        let first = Self::ancestor(chain, first_height)?;

        let ts = i64::from(self.timespan);
        let actual = (i64::from(prev.timestamp) - i64::from(first.timestamp))
            .max(0)
            .clamp(ts / 4, ts * 4);

        let old = Target::from_compact(prev.bits)?;
        let mut new: BigUint = old.into_value() * BigUint::from(actual as u64) / BigUint::from(self.timespan);
        if &new > self.pow_limit.value() {
            new = self.pow_limit.value().clone();
        }
        Ok(Target::new(new).to_compact())
    }
}

impl RetargetPolicy for StandardRetarget {
    fn required_bits(
        &self,
        chain: &dyn ChainView,
        height: u32,
        header: &Header,
    ) -> Result<u32, ChainError> {
        if height == 0 {
            return Ok(header.bits);
        }
        let prev = Self::ancestor(chain, height - 1)?;

        if height % self.interval != 0 {
            if self.allow_min_difficulty {
                return self.min_difficulty_bits(chain, height, header, prev);
            }
            return Ok(prev.bits);
        }

        if let Ok(i) = self.checkpoints.binary_search_by_key(&(height - 1), |c| c.height) {
            return Ok(self.checkpoints[i].next_bits);
        }
        self.next_interval_bits(chain, height, prev)
    }
}
