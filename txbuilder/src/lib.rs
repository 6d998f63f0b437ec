//! Anchor transaction builder.
//!
//! Collects everything one block does to the chain's L1 assets (consumed
//! requests, posted outputs, native token balances, foundries, NFTs) and
//! turns it into a single balanced, deterministically ordered transaction
//! essence that every node computes byte for byte the same.
//!
//! Errors come in two classes: [`LimitExceeded`] skips one request and leaves
//! the builder untouched, [`Inconsistency`] aborts the whole block.

pub mod builder;
pub mod deposit;
pub mod error;
mod essence;
mod foundries;
mod native_tokens;
mod nfts;
pub mod totals;

pub use builder::AnchorTransactionBuilder;
pub use deposit::StorageDepositAssumption;
pub use error::{Inconsistency, LimitExceeded, TxBuilderError};
pub use totals::TransactionTotals;
