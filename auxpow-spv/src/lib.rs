#![deny(missing_docs)]

//! AuxPoW SPV - Complete SDK.
//!
//! Re-exports all components for convenient single-crate usage.

pub use auxpow_primitives as primitives;
pub use auxpow_transaction as transaction;
pub use auxpow_header as header;
pub use auxpow_chain as chain;

pub use auxpow_chain::{ChainError, ChainTracker, ChainUpdate, HeaderChain, NetworkParams};
pub use auxpow_header::{AuxPowVerifier, Header};
