/// AuxPoW SPV - Hashing, chain hash, wire encoding and target primitives.
///
/// This crate provides the foundational building blocks for header validation:
/// - Hash functions (SHA-256, SHA-256d)
/// - Chain hash type for transaction and block identification
/// - Variable-length integer encoding and cursor-based wire reader/writer
/// - Compact ("bits") proof-of-work targets and chain work

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod target;

mod error;
pub use error::PrimitivesError;
