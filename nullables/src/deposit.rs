//! Nullable rent function: a fixed deposit per output kind.

use anchor_types::{Output, StorageDeposit};

/// Storage deposits that do not depend on output size, so tests can reason
/// about exact base-token amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedDeposit {
    pub basic: u64,
    pub nft: u64,
    pub foundry: u64,
    pub anchor: u64,
}

impl FixedDeposit {
    /// The same deposit for every output kind.
    pub fn uniform(deposit: u64) -> Self {
        Self {
            basic: deposit,
            nft: deposit,
            foundry: deposit,
            anchor: deposit,
        }
    }

    /// Nothing is ever required.
    pub fn free() -> Self {
        Self::uniform(0)
    }
}

impl StorageDeposit for FixedDeposit {
    fn min_deposit(&self, output: &Output) -> u64 {
        match output {
            Output::Basic(_) => self.basic,
            Output::Nft(_) => self.nft,
            Output::Foundry(_) => self.foundry,
            Output::Anchor(_) => self.anchor,
        }
    }
}
