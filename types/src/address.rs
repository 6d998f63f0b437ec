//! L1 addresses that can own an output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{AccountId, NftId};

/// Kind bytes as they appear on the wire.
const ED25519_ADDRESS_KIND: u8 = 0;
const ACCOUNT_ADDRESS_KIND: u8 = 8;
const NFT_ADDRESS_KIND: u8 = 16;

/// An address able to unlock outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    /// Hash of an Ed25519 public key.
    Ed25519([u8; 32]),
    /// A chain (account/anchor output).
    Account(AccountId),
    /// An NFT acting as an owner.
    Nft(NftId),
}

impl Address {
    pub fn kind(&self) -> u8 {
        match self {
            Self::Ed25519(_) => ED25519_ADDRESS_KIND,
            Self::Account(_) => ACCOUNT_ADDRESS_KIND,
            Self::Nft(_) => NFT_ADDRESS_KIND,
        }
    }

    pub fn body(&self) -> &[u8; 32] {
        match self {
            Self::Ed25519(hash) => hash,
            Self::Account(id) => id.as_bytes(),
            Self::Nft(id) => id.as_bytes(),
        }
    }

    pub fn is_account(&self, account: &AccountId) -> bool {
        matches!(self, Self::Account(id) if id == account)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519(hash) => write!(f, "ed25519:0x{}", hex::encode(hash)),
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Nft(id) => write!(f, "nft:{id}"),
        }
    }
}
