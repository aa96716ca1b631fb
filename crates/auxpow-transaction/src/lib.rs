/// AuxPoW SPV - Transaction wire format.
///
/// Provides the Transaction type with inputs and outputs, legacy wire
/// serialization and transaction ids. Used to decode and identify the
/// parent-chain coinbase carried by AuxPoW headers.

pub mod transaction;
pub mod input;
pub mod output;
pub mod script;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use script::Script;

#[cfg(test)]
mod tests;
