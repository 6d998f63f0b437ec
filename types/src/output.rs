//! The L1 output model: basic, NFT, foundry and anchor outputs.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::{NativeTokens, U256};
use crate::error::TypesError;
use crate::id::{AccountId, NativeTokenId, NftId};

/// Upper bound for any metadata blob carried by an output.
pub const MAX_METADATA_LENGTH: usize = 8192;

static EMPTY_NATIVE_TOKENS: NativeTokens = NativeTokens::EMPTY;

/// Opaque bytes attached to an output, bounded by [`MAX_METADATA_LENGTH`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Metadata(Vec<u8>);

impl Metadata {
    pub fn new(data: Vec<u8>) -> Result<Self, TypesError> {
        if data.len() > MAX_METADATA_LENGTH {
            return Err(TypesError::MetadataTooLong {
                len: data.len(),
                max: MAX_METADATA_LENGTH,
            });
        }
        Ok(Self(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<u8>> for Metadata {
    type Error = TypesError;

    fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(data)
    }
}

impl From<Metadata> for Vec<u8> {
    fn from(m: Metadata) -> Self {
        m.0
    }
}

/// A plain value-carrying output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub address: Address,
    pub sender: Option<Address>,
    pub metadata: Option<Metadata>,
}

impl BasicOutput {
    pub fn new(amount: u64, address: Address) -> Self {
        Self {
            amount,
            native_tokens: NativeTokens::default(),
            address,
            sender: None,
            metadata: None,
        }
    }

    pub fn with_native_tokens(mut self, native_tokens: NativeTokens) -> Self {
        self.native_tokens = native_tokens;
        self
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An output carrying one NFT.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NftOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Null when the NFT is minted by the transaction creating this output.
    pub nft_id: NftId,
    pub address: Address,
    pub sender: Option<Address>,
    pub metadata: Option<Metadata>,
    pub immutable_metadata: Option<Metadata>,
}

impl NftOutput {
    pub fn new(amount: u64, nft_id: NftId, address: Address) -> Self {
        Self {
            amount,
            native_tokens: NativeTokens::default(),
            nft_id,
            address,
            sender: None,
            metadata: None,
            immutable_metadata: None,
        }
    }

    pub fn with_native_tokens(mut self, native_tokens: NativeTokens) -> Self {
        self.native_tokens = native_tokens;
        self
    }

    pub fn with_immutable_metadata(mut self, metadata: Metadata) -> Self {
        self.immutable_metadata = Some(metadata);
        self
    }
}

/// Minting bounds of a foundry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleTokenScheme {
    pub minted: U256,
    pub melted: U256,
    pub maximum_supply: U256,
}

impl SimpleTokenScheme {
    pub fn new(maximum_supply: U256) -> Self {
        Self {
            minted: U256::ZERO,
            melted: U256::ZERO,
            maximum_supply,
        }
    }

    /// `minted - melted`, or `None` if more was melted than minted.
    pub fn circulating_supply(&self) -> Option<U256> {
        self.minted.checked_sub(self.melted)
    }

    /// Counters are consistent: `0 <= minted - melted <= maximum_supply`.
    pub fn is_within_bounds(&self) -> bool {
        matches!(self.circulating_supply(), Some(s) if s <= self.maximum_supply)
    }
}

/// The on-ledger controller of one native token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoundryOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub serial_number: u32,
    pub token_scheme: SimpleTokenScheme,
    /// The account controlling this foundry.
    pub account: AccountId,
    pub metadata: Option<Metadata>,
}

impl FoundryOutput {
    pub fn token_id(&self) -> NativeTokenId {
        NativeTokenId::from_foundry(&self.account, self.serial_number)
    }
}

/// The chain's own output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorOutput {
    pub amount: u64,
    pub account_id: AccountId,
    pub state_index: u32,
    pub state_metadata: Metadata,
    pub foundry_counter: u32,
    pub state_controller: Address,
    pub governor: Address,
    pub metadata: Option<Metadata>,
}

/// Any output the builder can consume or produce.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Output {
    Basic(BasicOutput),
    Nft(NftOutput),
    Foundry(FoundryOutput),
    Anchor(AnchorOutput),
}

impl Output {
    pub fn amount(&self) -> u64 {
        match self {
            Self::Basic(o) => o.amount,
            Self::Nft(o) => o.amount,
            Self::Foundry(o) => o.amount,
            Self::Anchor(o) => o.amount,
        }
    }

    pub fn native_tokens(&self) -> &NativeTokens {
        match self {
            Self::Basic(o) => &o.native_tokens,
            Self::Nft(o) => &o.native_tokens,
            Self::Foundry(o) => &o.native_tokens,
            Self::Anchor(_) => &EMPTY_NATIVE_TOKENS,
        }
    }

    /// The NFT id as written in the output (possibly null).
    pub fn nft_id(&self) -> Option<NftId> {
        match self {
            Self::Nft(o) => Some(o.nft_id),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Nft(_) => "nft",
            Self::Foundry(_) => "foundry",
            Self::Anchor(_) => "anchor",
        }
    }
}

impl From<BasicOutput> for Output {
    fn from(o: BasicOutput) -> Self {
        Self::Basic(o)
    }
}

impl From<NftOutput> for Output {
    fn from(o: NftOutput) -> Self {
        Self::Nft(o)
    }
}

impl From<FoundryOutput> for Output {
    fn from(o: FoundryOutput) -> Self {
        Self::Foundry(o)
    }
}

impl From<AnchorOutput> for Output {
    fn from(o: AnchorOutput) -> Self {
        Self::Anchor(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_bounded() {
        assert!(Metadata::new(vec![0; MAX_METADATA_LENGTH]).is_ok());
        assert!(matches!(
            Metadata::new(vec![0; MAX_METADATA_LENGTH + 1]),
            Err(TypesError::MetadataTooLong { .. })
        ));
    }

    #[test]
    fn token_scheme_bounds() {
        let mut scheme = SimpleTokenScheme::new(U256::from(100u64));
        assert!(scheme.is_within_bounds());
        scheme.minted = U256::from(100u64);
        assert!(scheme.is_within_bounds());
        scheme.minted = U256::from(101u64);
        assert!(!scheme.is_within_bounds());
        scheme.melted = U256::from(102u64);
        assert_eq!(scheme.circulating_supply(), None);
        assert!(!scheme.is_within_bounds());
    }

    #[test]
    fn foundry_token_id_points_back_to_foundry() {
        let foundry = FoundryOutput {
            amount: 0,
            native_tokens: NativeTokens::default(),
            serial_number: 7,
            token_scheme: SimpleTokenScheme::new(U256::from(1u64)),
            account: AccountId::new([5; 32]),
            metadata: None,
        };
        let id = foundry.token_id();
        assert_eq!(id.foundry_serial_number(), 7);
        assert_eq!(id.foundry_account(), foundry.account);
    }

    #[test]
    fn anchor_output_has_no_native_tokens() {
        let anchor = Output::Anchor(AnchorOutput {
            amount: 10,
            account_id: AccountId::NULL,
            state_index: 0,
            state_metadata: Metadata::default(),
            foundry_counter: 0,
            state_controller: Address::Ed25519([0; 32]),
            governor: Address::Ed25519([0; 32]),
            metadata: None,
        });
        assert!(anchor.native_tokens().is_empty());
        assert_eq!(anchor.nft_id(), None);
        assert_eq!(anchor.kind_name(), "anchor");
    }
}
