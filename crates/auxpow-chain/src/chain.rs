//! Header-chain manager.
//!
//! [`HeaderChain`] keeps a finalized base in a [`HeaderStore`] and, above it,
//! a set of competing tips held in memory. Each tip owns its entries from
//! the base upwards; a fork copies the prefix it shares with its sibling.
//! The tip with the most cumulative work is active. Once the active tip is
//! more than `max_reorg_depth` headers above the base, the excess is moved
//! into the store and tips that disagree with it are dropped.

use std::collections::HashSet;

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use auxpow_header::{decode, AuxPowError, AuxPowVerifier, DecodeOptions, Header};
use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::target::Target;

use crate::params::NetworkParams;
use crate::retarget::{BlockInfo, ChainView, RetargetPolicy, StandardRetarget};
use crate::store::{HeaderStore, StoredHeader};
use crate::ChainError;

/// What accepting a header did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Appended to the end of a tip.
    Extended,
    /// Started a new tip branching below the end of an existing one.
    Forked,
    /// The header was already part of the chain.
    AlreadyKnown,
}

/// The end of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TipView {
    pub hash: Hash,
    pub height: u32,
    pub chain_work: BigUint,
}

/// A switch of the active tip to a branch that does not extend it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reorg {
    /// Height of the last header both branches share.
    pub fork_height: u32,
    pub old_tip: TipView,
    pub new_tip: TipView,
}

impl Reorg {
    /// Number of headers of the old branch that left the active chain.
    pub fn depth(&self) -> u32 {
        self.old_tip.height - self.fork_height
    }
}

/// Result of [`HeaderChain::accept`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainUpdate {
    pub outcome: AcceptOutcome,
    /// The active tip after the header was processed.
    pub active: TipView,
    pub tip_changed: bool,
    pub reorg: Option<Reorg>,
}

#[derive(Clone, Debug)]
struct ChainEntry {
    header: Header,
    hash: Hash,
    height: u32,
    chain_work: BigUint,
}

impl ChainEntry {
    fn view(&self) -> TipView {
        TipView {
            hash: self.hash,
            height: self.height,
            chain_work: self.chain_work.clone(),
        }
    }
}

/// Linked headers directly above the finalized base.
#[derive(Clone, Debug, Default)]
struct ChainTip {
    entries: Vec<ChainEntry>,
}

impl ChainTip {
    fn last(&self) -> Option<&ChainEntry> {
        self.entries.last()
    }

    fn work(&self) -> Option<&BigUint> {
        self.last().map(|e| &e.chain_work)
    }
}

/// Top of finalized history.
#[derive(Clone, Debug)]
struct Base {
    height: u32,
    hash: Hash,
    chain_work: BigUint,
}

impl Base {
    fn view(&self) -> TipView {
        TipView {
            hash: self.hash,
            height: self.height,
            chain_work: self.chain_work.clone(),
        }
    }

    /// Index into a tip's entries of the header at `height`.
    fn index_of(&self, height: u32) -> Option<usize> {
        height
            .checked_sub(self.height)
            .and_then(|d| d.checked_sub(1))
            .map(|i| i as usize)
    }
}

/// Where a new header's parent lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Parent {
    Base,
    Tip { tip: usize, index: usize },
}

/// Validates incoming headers and tracks the best chain.
pub struct HeaderChain<S, P = StandardRetarget> {
    params: NetworkParams,
    policy: P,
    verifier: AuxPowVerifier,
    store: S,
    base: Option<Base>,
    tips: Vec<ChainTip>,
    /// Index into `tips`; `None` while the base itself is the best header.
    active: Option<usize>,
}

impl<S: HeaderStore> HeaderChain<S, StandardRetarget> {
    /// Open a chain over `store` with Bitcoin-style retargeting.
    ///
    /// An empty store expects the genesis header at height 0 first.
    pub fn new(params: NetworkParams, store: S) -> Result<Self, ChainError> {
        let policy = StandardRetarget::new(&params)?;
        Self::with_policy(params, store, policy)
    }

    /// Start an empty store from the highest checkpoint instead of genesis.
    ///
    /// `header` must hash to the checkpoint, and the checkpoint must carry
    /// its chain work.
    pub fn from_checkpoint(params: NetworkParams, mut store: S, header: Header) -> Result<Self, ChainError> {
        let checkpoint = params.max_checkpoint().ok_or(ChainError::NoCheckpoint)?;
        let chain_work = checkpoint.chain_work.clone().ok_or_else(|| {
            ChainError::Config(format!("checkpoint {} has no chain work", checkpoint.height))
        })?;
        let hash = header.hash();
        if hash != checkpoint.hash {
            return Err(ChainError::CheckpointMismatch {
                height: checkpoint.height,
                expected: checkpoint.hash,
                actual: hash,
            });
        }
        if store.tip_height()?.is_some() {
            return Err(ChainError::Storage("store is not empty".to_string()));
        }

        store.append(
            checkpoint.height,
            StoredHeader { header: header.truncated(), chain_work },
        )?;
        info!(height = checkpoint.height, hash = %hash, "starting from checkpoint");
        Self::new(params, store)
    }
}

impl<S: HeaderStore, P: RetargetPolicy> HeaderChain<S, P> {
    pub fn with_policy(params: NetworkParams, store: S, policy: P) -> Result<Self, ChainError> {
        params.validate()?;
        let base = match store.tip_height()? {
            None => None,
            Some(height) => {
                let stored = store.header(height)?.ok_or_else(|| {
                    ChainError::Storage(format!("missing stored header at tip height {}", height))
                })?;
                Some(Base {
                    height,
                    hash: stored.header.hash(),
                    chain_work: stored.chain_work,
                })
            }
        };
        Ok(HeaderChain {
            verifier: AuxPowVerifier::new(params.auxpow_chain_id),
            params,
            policy,
            store,
            base,
            tips: Vec::new(),
            active: None,
        })
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The verifier used for AuxPoW headers. Stateless, so it can be copied
    /// to other threads for pre-verification.
    pub fn verifier(&self) -> AuxPowVerifier {
        self.verifier
    }

    pub fn finalized_height(&self) -> Option<u32> {
        self.base.as_ref().map(|b| b.height)
    }

    /// The best header, or `None` before genesis.
    pub fn active_tip(&self) -> Option<TipView> {
        match self.active.and_then(|i| self.tips.get(i)).and_then(ChainTip::last) {
            Some(entry) => Some(entry.view()),
            None => self.base.as_ref().map(Base::view),
        }
    }

    /// The end of every tip held above the finalized base.
    pub fn tips(&self) -> Vec<TipView> {
        self.tips.iter().filter_map(ChainTip::last).map(ChainEntry::view).collect()
    }

    /// Header at `height` on the active chain.
    pub fn header_at(&self, height: u32) -> Result<Option<Header>, ChainError> {
        let Some(base) = &self.base else {
            return Ok(None);
        };
        if height <= base.height {
            return Ok(self.store.header(height)?.map(|s| s.header));
        }
        let entry = self
            .active
            .and_then(|i| self.tips.get(i))
            .zip(base.index_of(height))
            .and_then(|(tip, index)| tip.entries.get(index));
        Ok(entry.map(|e| e.header.clone()))
    }

    /// Decode `bytes` for `height` and accept the result.
    pub fn accept_bytes(&mut self, bytes: &[u8], height: u32) -> Result<ChainUpdate, ChainError> {
        let mode = self.params.auxpow_mode(height);
        let (header, _) = decode(bytes, mode, DecodeOptions::default())?;
        self.accept(header, height)
    }

    /// Validate `header` as the header at `height` and attach it.
    ///
    /// A rejected header leaves the chain unchanged, with one exception: a
    /// header failing its checkpoint also discards the branch it would
    /// extend back to the last verified anchor, so the correct branch can
    /// be accepted from there.
    pub fn accept(&mut self, header: Header, height: u32) -> Result<ChainUpdate, ChainError> {
        let hash = header.hash();
        let Some(base_height) = self.finalized_height() else {
            return self.accept_genesis(header, hash, height);
        };

        if height <= base_height {
            return match self.store.header(height)? {
                Some(stored) if stored.header.hash() == hash => self.unchanged(),
                _ => Err(ChainError::BelowFinalized { height }),
            };
        }
        if self.contains(height, &hash) {
            return self.unchanged();
        }

        let parent = self
            .find_parent(height, &header.prev_hash)
            .ok_or(ChainError::UnknownParent { height, prev_hash: header.prev_hash })?;
        let extends = match parent {
            Parent::Base => self.tips.is_empty(),
            Parent::Tip { tip, index } => index + 1 == self.tips[tip].entries.len(),
        };
        if !extends && self.params.is_checkpointed(height) {
            return Err(ChainError::ForkBelowCheckpoint { height });
        }

        let expected_bits = {
            let view = BranchView { chain: self, parent };
            self.policy.required_bits(&view, height, &header)?
        };
        if header.bits != expected_bits {
            return Err(ChainError::BadBits { height, expected: expected_bits, actual: header.bits });
        }
        let target = Target::from_compact(header.bits)?;

        self.check_proof_of_work(&header, &hash, height, &target)?;

        let chain_work = self.parent_work(parent) + target.work();
        if let Err(e) = self.check_checkpoint(height, &hash, &chain_work) {
            self.discard_unverified(parent, height);
            return Err(e);
        }

        // Validation is complete; attach.
        let previous = self.active;
        let previous_tip = self.active_tip();

        let entry = ChainEntry { header, hash, height, chain_work };
        let outcome = match parent {
            Parent::Tip { tip, .. } if extends => {
                self.tips[tip].entries.push(entry);
                AcceptOutcome::Extended
            }
            Parent::Tip { tip, index } => {
                let mut entries = self.tips[tip].entries[..=index].to_vec();
                entries.push(entry);
                self.tips.push(ChainTip { entries });
                AcceptOutcome::Forked
            }
            Parent::Base => {
                self.tips.push(ChainTip { entries: vec![entry] });
                if extends {
                    AcceptOutcome::Extended
                } else {
                    AcceptOutcome::Forked
                }
            }
        };
        debug!(height, hash = %hash, ?outcome, "accepted header");

        self.select_active();
        let active = self.active_view()?;
        let tip_changed = previous_tip.as_ref().map(|t| t.hash) != Some(active.hash);
        let reorg = match previous_tip {
            Some(old_tip) if tip_changed => self.detect_reorg(previous, old_tip),
            _ => None,
        };
        if let Some(reorg) = &reorg {
            info!(
                fork_height = reorg.fork_height,
                depth = reorg.depth(),
                old = %reorg.old_tip.hash,
                new = %reorg.new_tip.hash,
                "chain reorganization"
            );
        } else if tip_changed && outcome == AcceptOutcome::Forked {
            info!(height = active.height, hash = %active.hash, "active tip moved to fork");
        }

        self.finalize()?;

        Ok(ChainUpdate {
            outcome,
            active: self.active_view()?,
            tip_changed,
            reorg,
        })
    }

    fn accept_genesis(&mut self, header: Header, hash: Hash, height: u32) -> Result<ChainUpdate, ChainError> {
        if height != 0 {
            return Err(ChainError::UnknownParent { height, prev_hash: header.prev_hash });
        }
        if !header.prev_hash.is_zero() || hash != self.params.genesis_hash {
            return Err(ChainError::GenesisMismatch {
                expected: self.params.genesis_hash,
                actual: hash,
            });
        }

        let chain_work = Target::from_compact(header.bits)?.work();
        self.store.append(
            0,
            StoredHeader { header: header.truncated(), chain_work: chain_work.clone() },
        )?;
        self.base = Some(Base { height: 0, hash, chain_work });
        info!(hash = %hash, "accepted genesis");

        Ok(ChainUpdate {
            outcome: AcceptOutcome::Extended,
            active: self.active_view()?,
            tip_changed: true,
            reorg: None,
        })
    }

    fn unchanged(&self) -> Result<ChainUpdate, ChainError> {
        Ok(ChainUpdate {
            outcome: AcceptOutcome::AlreadyKnown,
            active: self.active_view()?,
            tip_changed: false,
            reorg: None,
        })
    }

    fn active_view(&self) -> Result<TipView, ChainError> {
        self.active_tip().ok_or(ChainError::EmptyChain)
    }

    fn contains(&self, height: u32, hash: &Hash) -> bool {
        let Some(index) = self.base.as_ref().and_then(|b| b.index_of(height)) else {
            return false;
        };
        self.tips
            .iter()
            .any(|tip| tip.entries.get(index).is_some_and(|e| e.hash == *hash))
    }

    /// Locate `prev_hash` at `height - 1`. A tip ending in the parent is
    /// preferred over one that merely contains it.
    fn find_parent(&self, height: u32, prev_hash: &Hash) -> Option<Parent> {
        let base = self.base.as_ref()?;
        let parent_height = height.checked_sub(1)?;
        if parent_height == base.height {
            return (base.hash == *prev_hash).then_some(Parent::Base);
        }

        let index = base.index_of(parent_height)?;
        let mut found = None;
        for (tip, chain_tip) in self.tips.iter().enumerate() {
            if chain_tip.entries.get(index).is_some_and(|e| e.hash == *prev_hash) {
                if index + 1 == chain_tip.entries.len() {
                    return Some(Parent::Tip { tip, index });
                }
                found.get_or_insert(Parent::Tip { tip, index });
            }
        }
        found
    }

    fn parent_work(&self, parent: Parent) -> BigUint {
        match parent {
            Parent::Base => self.base.as_ref().map(|b| b.chain_work.clone()).unwrap_or_default(),
            Parent::Tip { tip, index } => self.tips[tip].entries[index].chain_work.clone(),
        }
    }

    fn check_proof_of_work(
        &self,
        header: &Header,
        hash: &Hash,
        height: u32,
        target: &Target,
    ) -> Result<(), ChainError> {
        let auxpow_active = self.params.is_auxpow_active(height);
        if auxpow_active && self.params.strict_chain_id && !header.is_legacy() {
            let chain_id = header.chain_id();
            if chain_id != self.params.auxpow_chain_id {
                return Err(ChainError::WrongChainId {
                    height,
                    expected: self.params.auxpow_chain_id,
                    actual: chain_id,
                });
            }
        }

        if auxpow_active && header.has_auxpow_flag() {
            return match &header.auxpow {
                Some(_) => self.verifier.verify(header, target).map_err(|e| match e {
                    AuxPowError::InsufficientProofOfWork => {
                        ChainError::InsufficientProofOfWork { height }
                    }
                    other => ChainError::AuxPow(other),
                }),
                // Checkpointed history is served without payloads.
                None if self.params.is_checkpointed(height) => Ok(()),
                None => Err(ChainError::MissingAuxPow { height }),
            };
        }

        if header.auxpow.is_some() {
            return Err(ChainError::UnexpectedAuxPow { height });
        }
        if !target.is_met_by(hash) {
            return Err(ChainError::InsufficientProofOfWork { height });
        }
        Ok(())
    }

    fn check_checkpoint(&self, height: u32, hash: &Hash, chain_work: &BigUint) -> Result<(), ChainError> {
        let Some(checkpoint) = self.params.checkpoint_at(height) else {
            return Ok(());
        };
        if checkpoint.hash != *hash {
            warn!(height, expected = %checkpoint.hash, actual = %hash, "checkpoint mismatch");
            return Err(ChainError::CheckpointMismatch {
                height,
                expected: checkpoint.hash,
                actual: *hash,
            });
        }
        if checkpoint.chain_work.as_ref().is_some_and(|w| w != chain_work) {
            warn!(height, hash = %hash, "checkpoint chain work mismatch");
            return Err(ChainError::CheckpointWorkMismatch { height });
        }
        Ok(())
    }

    /// Drop every tip through `parent` back to the last verified anchor
    /// after the header at `height` failed its checkpoint.
    ///
    /// The anchor is the highest checkpoint below `height`, or the base if
    /// that is higher. Below the highest checkpoint no forks exist, so
    /// every tip holding `parent` shares the same prefix up to the anchor.
    fn discard_unverified(&mut self, parent: Parent, height: u32) {
        let (Some(base_height), Parent::Tip { tip, index }) = (self.finalized_height(), parent) else {
            return;
        };
        let anchor = self
            .params
            .checkpoints
            .iter()
            .rev()
            .map(|c| c.height)
            .find(|h| *h < height)
            .map_or(base_height, |h| h.max(base_height));
        let keep = (anchor - base_height) as usize;
        let parent_hash = self.tips[tip].entries[index].hash;

        for chain_tip in &mut self.tips {
            if chain_tip.entries.get(index).is_some_and(|e| e.hash == parent_hash) {
                chain_tip.entries.truncate(keep);
            }
        }
        // Truncated tips may now end in the same header.
        let mut ends = HashSet::new();
        self.tips.retain(|t| t.last().is_some_and(|e| ends.insert(e.hash)));
        self.active = None;
        self.select_active();
        warn!(height, anchor, "discarded branch failing checkpoint");
    }

    /// Pick the tip with the most work; ties keep the current one.
    fn select_active(&mut self) {
        let mut best = self.active.filter(|i| *i < self.tips.len());
        for (i, tip) in self.tips.iter().enumerate() {
            let better = match best.and_then(|b| self.tips[b].work()) {
                None => true,
                Some(best_work) => tip.work().is_some_and(|w| w > best_work),
            };
            if better {
                best = Some(i);
            }
        }
        self.active = best;
    }

    fn detect_reorg(&self, previous: Option<usize>, old_tip: TipView) -> Option<Reorg> {
        let base = self.base.as_ref()?;
        let new_tip_chain = self.tips.get(self.active?)?;
        let old_chain = self.tips.get(previous?)?;

        let common = old_chain
            .entries
            .iter()
            .zip(&new_tip_chain.entries)
            .take_while(|(a, b)| a.hash == b.hash)
            .count();
        if common == old_chain.entries.len() {
            // The new tip descends from the old one.
            return None;
        }
        Some(Reorg {
            fork_height: base.height + common as u32,
            old_tip,
            new_tip: new_tip_chain.last()?.view(),
        })
    }

    /// Highest height that may be finalized while the active tip ends at
    /// `tip_height`. Below the highest checkpoint only a checkpoint the tip
    /// has already matched qualifies.
    fn finalization_limit(&self, tip_height: u32) -> Option<u32> {
        match self.params.max_checkpoint_height() {
            Some(max) if tip_height < max => self
                .params
                .checkpoints
                .iter()
                .rev()
                .map(|c| c.height)
                .find(|h| *h <= tip_height),
            _ => Some(tip_height),
        }
    }

    /// Move the part of the active tip deeper than `max_reorg_depth` into
    /// the store, dropping tips that do not contain it.
    fn finalize(&mut self) -> Result<(), ChainError> {
        let Some(active) = self.active else {
            return Ok(());
        };
        let entries = &self.tips[active].entries;
        let Some(limit) = entries.last().and_then(|e| self.finalization_limit(e.height)) else {
            return Ok(());
        };
        let depth = self.params.max_reorg_depth as usize;
        let finalizable = entries.iter().take_while(|e| e.height <= limit).count();
        let excess = entries.len().saturating_sub(depth).min(finalizable);
        if excess == 0 {
            return Ok(());
        }
        let active_hash = self.tips[active].last().map(|e| e.hash);

        for _ in 0..excess {
            let Some(entry) = self.tips[active].entries.first().cloned() else {
                break;
            };
            let header = if self.params.is_checkpointed(entry.height) {
                entry.header.truncated()
            } else {
                entry.header
            };
            self.store.append(
                entry.height,
                StoredHeader { header, chain_work: entry.chain_work.clone() },
            )?;
            self.base = Some(Base {
                height: entry.height,
                hash: entry.hash,
                chain_work: entry.chain_work,
            });

            for tip in &mut self.tips {
                if tip.entries.first().is_some_and(|e| e.hash == entry.hash) {
                    tip.entries.remove(0);
                } else if let Some(last) = tip.last() {
                    debug!(height = last.height, hash = %last.hash, "pruning stale tip");
                    tip.entries.clear();
                }
            }
        }

        self.tips.retain(|tip| !tip.entries.is_empty());
        self.active = self
            .tips
            .iter()
            .position(|tip| tip.last().map(|e| e.hash) == active_hash);
        self.select_active();

        if let Some(base) = &self.base {
            info!(height = base.height, hash = %base.hash, "finalized headers");
        }
        Ok(())
    }
}

/// Ancestors of a candidate header: the branch ending at its parent, then
/// the store.
struct BranchView<'a, S, P> {
    chain: &'a HeaderChain<S, P>,
    parent: Parent,
}

impl<S: HeaderStore, P> ChainView for BranchView<'_, S, P> {
    fn block_at(&self, height: u32) -> Result<Option<BlockInfo>, ChainError> {
        let Some(base) = &self.chain.base else {
            return Ok(None);
        };
        if height <= base.height {
            return Ok(self.chain.store.header(height)?.map(|s| BlockInfo::from(&s.header)));
        }
        let Parent::Tip { tip, index } = self.parent else {
            return Ok(None);
        };
        let entry = base
            .index_of(height)
            .filter(|i| *i <= index)
            .and_then(|i| self.chain.tips[tip].entries.get(i));
        Ok(entry.map(|e| BlockInfo::from(&e.header)))
    }
}
