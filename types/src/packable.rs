//! Binary packing in the host ledger's wire layout.
//!
//! Integers are little-endian, variable-length fields carry a length prefix
//! and native tokens are written in ascending id order. Packing into a
//! `Vec<u8>` cannot fail: every length is bounded when the value is built.

use crate::address::Address;
use crate::amount::{NativeTokens, U256};
use crate::id::{AccountId, NativeTokenId, NftId, OutputId};
use crate::output::{
    AnchorOutput, BasicOutput, FoundryOutput, Metadata, NftOutput, Output, SimpleTokenScheme,
};

pub const BASIC_OUTPUT_KIND: u8 = 3;
pub const ANCHOR_OUTPUT_KIND: u8 = 4;
pub const FOUNDRY_OUTPUT_KIND: u8 = 5;
pub const NFT_OUTPUT_KIND: u8 = 6;

const ADDRESS_UNLOCK_KIND: u8 = 0;
const STATE_CONTROLLER_UNLOCK_KIND: u8 = 4;
const GOVERNOR_UNLOCK_KIND: u8 = 5;
const IMMUTABLE_ACCOUNT_UNLOCK_KIND: u8 = 6;

const SENDER_FEATURE_KIND: u8 = 0;
const METADATA_FEATURE_KIND: u8 = 2;

const SIMPLE_TOKEN_SCHEME_KIND: u8 = 0;

/// A value with a canonical binary form.
pub trait Packable {
    fn pack(&self, buf: &mut Vec<u8>);

    fn packed_len(&self) -> usize {
        self.to_packed_bytes().len()
    }

    fn to_packed_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.pack(&mut buf);
        buf
    }
}

pub(crate) fn pack_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub(crate) fn pack_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn pack_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn pack_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn pack_u256(buf: &mut Vec<u8>, v: &U256) {
    buf.extend_from_slice(&v.to_le_bytes::<32>());
}

/// Counts of bounded collections; every caller guarantees the bound.
fn pack_count_u8(buf: &mut Vec<u8>, count: usize) {
    debug_assert!(count <= u8::MAX as usize);
    pack_u8(buf, count as u8);
}

impl Packable for OutputId {
    fn pack(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Packable for AccountId {
    fn pack(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Packable for NftId {
    fn pack(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Packable for NativeTokenId {
    fn pack(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Packable for Address {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, self.kind());
        buf.extend_from_slice(self.body());
    }
}

impl Packable for Metadata {
    fn pack(&self, buf: &mut Vec<u8>) {
        // bounded by MAX_METADATA_LENGTH
        pack_u16(buf, self.len() as u16);
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Packable for NativeTokens {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_count_u8(buf, self.len());
        for token in self.iter() {
            token.id.pack(buf);
            pack_u256(buf, &token.amount);
        }
    }
}

impl Packable for SimpleTokenScheme {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, SIMPLE_TOKEN_SCHEME_KIND);
        pack_u256(buf, &self.minted);
        pack_u256(buf, &self.melted);
        pack_u256(buf, &self.maximum_supply);
    }
}

fn pack_features(buf: &mut Vec<u8>, sender: Option<&Address>, metadata: Option<&Metadata>) {
    pack_count_u8(buf, sender.is_some() as usize + metadata.is_some() as usize);
    if let Some(sender) = sender {
        pack_u8(buf, SENDER_FEATURE_KIND);
        sender.pack(buf);
    }
    if let Some(metadata) = metadata {
        pack_u8(buf, METADATA_FEATURE_KIND);
        metadata.pack(buf);
    }
}

impl Packable for BasicOutput {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, BASIC_OUTPUT_KIND);
        pack_u64(buf, self.amount);
        self.native_tokens.pack(buf);
        pack_u8(buf, 1);
        pack_u8(buf, ADDRESS_UNLOCK_KIND);
        self.address.pack(buf);
        pack_features(buf, self.sender.as_ref(), self.metadata.as_ref());
    }
}

impl Packable for NftOutput {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, NFT_OUTPUT_KIND);
        pack_u64(buf, self.amount);
        self.native_tokens.pack(buf);
        self.nft_id.pack(buf);
        pack_u8(buf, 1);
        pack_u8(buf, ADDRESS_UNLOCK_KIND);
        self.address.pack(buf);
        pack_features(buf, self.sender.as_ref(), self.metadata.as_ref());
        pack_features(buf, None, self.immutable_metadata.as_ref());
    }
}

impl Packable for FoundryOutput {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, FOUNDRY_OUTPUT_KIND);
        pack_u64(buf, self.amount);
        self.native_tokens.pack(buf);
        pack_u32(buf, self.serial_number);
        self.token_scheme.pack(buf);
        pack_u8(buf, 1);
        pack_u8(buf, IMMUTABLE_ACCOUNT_UNLOCK_KIND);
        Address::Account(self.account).pack(buf);
        pack_features(buf, None, self.metadata.as_ref());
        pack_features(buf, None, None);
    }
}

impl Packable for AnchorOutput {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, ANCHOR_OUTPUT_KIND);
        pack_u64(buf, self.amount);
        NativeTokens::EMPTY.pack(buf);
        self.account_id.pack(buf);
        pack_u32(buf, self.state_index);
        self.state_metadata.pack(buf);
        pack_u32(buf, self.foundry_counter);
        pack_u8(buf, 2);
        pack_u8(buf, STATE_CONTROLLER_UNLOCK_KIND);
        self.state_controller.pack(buf);
        pack_u8(buf, GOVERNOR_UNLOCK_KIND);
        self.governor.pack(buf);
        pack_features(
            buf,
            Some(&Address::Account(self.account_id)),
            self.metadata.as_ref(),
        );
        pack_features(buf, None, None);
    }
}

impl Packable for Output {
    fn pack(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Basic(o) => o.pack(buf),
            Self::Nft(o) => o.pack(buf),
            Self::Foundry(o) => o.pack(buf),
            Self::Anchor(o) => o.pack(buf),
        }
    }
}
