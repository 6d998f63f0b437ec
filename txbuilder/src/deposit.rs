//! Cached storage deposit constants for the outputs the builder creates itself.

use std::fmt;

use anchor_types::{
    AccountId, Address, AnchorOutput, BasicOutput, NativeTokenId, NativeTokens, Output,
    StorageDeposit, U256,
};
use serde::{Deserialize, Serialize};

/// Deposits the builder reserves without asking the rent function on every call.
///
/// `anchor_output` is kept aside from the anchor's amount for the anchor itself;
/// `native_token_output` is charged whenever a native token gets its first
/// internal output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDepositAssumption {
    pub anchor_output: u64,
    pub native_token_output: u64,
}

impl StorageDepositAssumption {
    /// Derive both constants from the real rent function for `anchor`'s chain.
    ///
    /// Packed sizes do not depend on amount values, so placeholder amounts
    /// give the exact shape of every output this chain will produce.
    pub fn from_rent(rent: &dyn StorageDeposit, anchor: &AnchorOutput) -> Self {
        Self {
            anchor_output: rent.min_deposit(&Output::Anchor(anchor.clone())),
            native_token_output: rent.min_deposit(&internal_native_token_shape(anchor.account_id)),
        }
    }
}

impl fmt::Display for StorageDepositAssumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "anchor output: {}, native token output: {}",
            self.anchor_output, self.native_token_output
        )
    }
}

fn internal_native_token_shape(chain: AccountId) -> Output {
    let address = Address::Account(chain);
    let mut output = BasicOutput::new(0, address).with_sender(address);
    if let Ok(tokens) = NativeTokens::single(NativeTokenId::new([0; 38]), U256::MAX) {
        output = output.with_native_tokens(tokens);
    }
    output.into()
}
