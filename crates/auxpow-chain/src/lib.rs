//! AuxPoW SPV - Header-chain management.
//!
//! Provides `HeaderChain`, which validates headers against their parents,
//! retarget rules, checkpoints and (for merged-mined headers) AuxPoW proofs,
//! tracks competing tips, selects the one with the most work and finalizes
//! settled history into a `HeaderStore`. Network constants come from
//! `NetworkParams`.

pub mod params;
pub mod retarget;
pub mod store;
pub mod chain;
pub mod chain_tracker;

mod error;
pub use error::ChainError;
pub use params::{Checkpoint, NetworkParams};
pub use retarget::{BlockInfo, ChainView, RetargetPolicy, StandardRetarget};
pub use store::{HeaderStore, MemoryHeaderStore, StoredHeader};
pub use chain::{AcceptOutcome, ChainUpdate, HeaderChain, Reorg, TipView};
pub use chain_tracker::ChainTracker;
