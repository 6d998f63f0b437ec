//! Nullable collaborators for deterministic testing.
//!
//! The transaction builder reads pre-existing internal outputs and the rent
//! function through traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be configured programmatically
//! - Never touch a real ledger or database
//!
//! Usage: pass them to the builder in place of the chain's accounts state.

pub mod accounts;
pub mod deposit;
pub mod ids;

pub use accounts::NullAccounts;
pub use deposit::FixedDeposit;
pub use ids::NullIds;
