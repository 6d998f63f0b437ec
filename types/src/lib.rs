//! Ledger value types for the anchor transaction builder.
//!
//! This crate defines everything the builder exchanges with the host ledger:
//! identifiers, asset amounts, the output model, the canonical binary packing,
//! the rent function and the L1 parameters.

pub mod accounts;
pub mod address;
pub mod amount;
pub mod error;
pub mod essence;
pub mod id;
pub mod output;
pub mod packable;
pub mod params;
pub mod rent;
pub mod request;

pub use accounts::AccountsView;
pub use address::Address;
pub use amount::{AmountDelta, NativeToken, NativeTokens, MAX_NATIVE_TOKENS_PER_OUTPUT, U256};
pub use error::TypesError;
pub use essence::{inputs_commitment, TransactionEssence};
pub use id::{AccountId, NativeTokenId, NftId, OutputId};
pub use output::{
    AnchorOutput, BasicOutput, FoundryOutput, Metadata, NftOutput, Output, SimpleTokenScheme,
    MAX_METADATA_LENGTH,
};
pub use packable::Packable;
pub use params::L1Params;
pub use rent::{RentStructure, StorageDeposit};
pub use request::OnLedgerRequest;
