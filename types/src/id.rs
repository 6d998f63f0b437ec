//! Ledger identifiers: output ids, account (chain) ids, NFT ids and native token ids.
//!
//! Every identifier orders by its byte representation, so sorting a list of ids
//! gives the same order on every node.

use std::fmt;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Length of a transaction id.
pub const TRANSACTION_ID_LENGTH: usize = 32;
/// Length of a packed [`OutputId`].
pub const OUTPUT_ID_LENGTH: usize = TRANSACTION_ID_LENGTH + 2;
/// Length of an [`AccountId`].
pub const ACCOUNT_ID_LENGTH: usize = 32;
/// Length of an [`NftId`].
pub const NFT_ID_LENGTH: usize = 32;
/// Length of a [`NativeTokenId`] (the id of the controlling foundry).
pub const NATIVE_TOKEN_ID_LENGTH: usize = 38;

/// Address kind byte of an account address inside a foundry id.
const ACCOUNT_ADDRESS_KIND: u8 = 8;
/// Token scheme kind byte of the simple token scheme.
const SIMPLE_TOKEN_SCHEME_KIND: u8 = 0;

pub(crate) fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hex (de)serialization shared by the fixed-size ids.
macro_rules! impl_hex_id {
    ($name:ident, $len:expr) => {
        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn from_hex(s: &str) -> Result<Self, TypesError> {
                let raw = hex::decode(s.trim_start_matches("0x"))
                    .map_err(|e| TypesError::InvalidId(e.to_string()))?;
                let bytes: [u8; $len] = raw.try_into().map_err(|v: Vec<u8>| {
                    TypesError::InvalidId(format!(
                        "{}: expected {} bytes, got {}",
                        stringify!($name),
                        $len,
                        v.len()
                    ))
                })?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(D::Error::custom)
            }
        }
    };
}

/// Identifies one UTXO: the creating transaction plus the output index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId([u8; OUTPUT_ID_LENGTH]);

impl OutputId {
    pub const NULL: Self = Self([0u8; OUTPUT_ID_LENGTH]);

    pub fn new(transaction_id: [u8; TRANSACTION_ID_LENGTH], index: u16) -> Self {
        let mut bytes = [0u8; OUTPUT_ID_LENGTH];
        bytes[..TRANSACTION_ID_LENGTH].copy_from_slice(&transaction_id);
        bytes[TRANSACTION_ID_LENGTH..].copy_from_slice(&index.to_le_bytes());
        Self(bytes)
    }

    pub fn transaction_id(&self) -> [u8; TRANSACTION_ID_LENGTH] {
        let mut out = [0u8; TRANSACTION_ID_LENGTH];
        out.copy_from_slice(&self.0[..TRANSACTION_ID_LENGTH]);
        out
    }

    pub fn index(&self) -> u16 {
        u16::from_le_bytes([self.0[TRANSACTION_ID_LENGTH], self.0[TRANSACTION_ID_LENGTH + 1]])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OUTPUT_ID_LENGTH]
    }
}

impl_hex_id!(OutputId, OUTPUT_ID_LENGTH);

/// The chain's identity on L1 (the id of its anchor/account output).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId([u8; ACCOUNT_ID_LENGTH]);

impl AccountId {
    pub const NULL: Self = Self([0u8; ACCOUNT_ID_LENGTH]);

    pub fn new(bytes: [u8; ACCOUNT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// An account created by a transaction gets its id from the creating output.
    pub fn from_output_id(output_id: &OutputId) -> Self {
        Self(blake2b_256(output_id.as_bytes()))
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ACCOUNT_ID_LENGTH]
    }
}

impl_hex_id!(AccountId, ACCOUNT_ID_LENGTH);

/// Identifies one NFT for its whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NftId([u8; NFT_ID_LENGTH]);

impl NftId {
    pub const NULL: Self = Self([0u8; NFT_ID_LENGTH]);

    pub fn new(bytes: [u8; NFT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// A freshly minted NFT carries the null id; its real id is derived from
    /// the output that minted it.
    pub fn from_output_id(output_id: &OutputId) -> Self {
        Self(blake2b_256(output_id.as_bytes()))
    }

    /// Resolve a possibly-null id against the output holding it.
    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        if self.is_null() {
            Self::from_output_id(output_id)
        } else {
            self
        }
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; NFT_ID_LENGTH]
    }
}

impl_hex_id!(NftId, NFT_ID_LENGTH);

/// A native token is identified by the id of the foundry controlling it:
/// `account address kind | account id | serial number (LE) | token scheme kind`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeTokenId([u8; NATIVE_TOKEN_ID_LENGTH]);

impl NativeTokenId {
    pub fn new(bytes: [u8; NATIVE_TOKEN_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The token id minted by foundry `serial_number` of `account`.
    pub fn from_foundry(account: &AccountId, serial_number: u32) -> Self {
        let mut bytes = [0u8; NATIVE_TOKEN_ID_LENGTH];
        bytes[0] = ACCOUNT_ADDRESS_KIND;
        bytes[1..33].copy_from_slice(account.as_bytes());
        bytes[33..37].copy_from_slice(&serial_number.to_le_bytes());
        bytes[37] = SIMPLE_TOKEN_SCHEME_KIND;
        Self(bytes)
    }

    /// Serial number of the controlling foundry encoded in the id.
    pub fn foundry_serial_number(&self) -> u32 {
        u32::from_le_bytes([self.0[33], self.0[34], self.0[35], self.0[36]])
    }

    /// Account controlling the foundry encoded in the id.
    pub fn foundry_account(&self) -> AccountId {
        let mut bytes = [0u8; ACCOUNT_ID_LENGTH];
        bytes.copy_from_slice(&self.0[1..33]);
        AccountId(bytes)
    }
}

impl_hex_id!(NativeTokenId, NATIVE_TOKEN_ID_LENGTH);
