//! NFTs held by the chain in internal outputs.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anchor_types::{AccountsView, NftId, NftOutput, OutputId};

use crate::error::Inconsistency;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NftEntry {
    pub(crate) id: NftId,
    /// The internal output holding the NFT when the block started.
    pub(crate) input: Option<(NftOutput, OutputId)>,
    /// The internal output created in this block for a received NFT.
    pub(crate) output: Option<NftOutput>,
    /// The held input was sent out through a posted output.
    pub(crate) sent_out: bool,
}

impl NftEntry {
    pub(crate) fn requires_input(&self) -> bool {
        self.input.is_some() && self.sent_out
    }

    pub(crate) fn produces_output(&self) -> bool {
        self.output.is_some()
    }

    /// The chain holds the NFT right now.
    fn is_held(&self) -> bool {
        self.output.is_some() || (self.input.is_some() && !self.sent_out)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NftLedger {
    entries: HashMap<NftId, NftEntry>,
}

impl NftLedger {
    /// Record an NFT arriving with a request; `output` is its new internal output.
    /// Fails if the chain holds the NFT already, in this block or in `accounts`.
    pub(crate) fn receive(&mut self, output: NftOutput, accounts: &dyn AccountsView) -> Result<(), Inconsistency> {
        let id = output.nft_id;
        match self.entries.entry(id) {
            Entry::Occupied(e) => {
                let entry = e.into_mut();
                if entry.is_held() {
                    return Err(Inconsistency::NftAlreadyOwned(id));
                }
                entry.output = Some(output);
            }
            Entry::Vacant(v) => {
                if accounts.nft_output(&id).is_some() {
                    return Err(Inconsistency::NftAlreadyOwned(id));
                }
                v.insert(NftEntry {
                    id,
                    input: None,
                    output: Some(output),
                    sent_out: false,
                });
            }
        }
        Ok(())
    }

    /// Give up the NFT so a posted output can carry it; returns the deposit its
    /// internal output no longer needs.
    pub(crate) fn send_out(&mut self, id: &NftId, accounts: &dyn AccountsView) -> Result<u64, Inconsistency> {
        let entry = match self.entries.entry(*id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let (output, output_id) = accounts
                    .nft_output(id)
                    .ok_or(Inconsistency::NftNotOwned(*id))?;
                if output.nft_id != *id {
                    return Err(Inconsistency::InvalidInternalOutput(format!(
                        "NFT output {output_id} does not hold {id}"
                    )));
                }
                if !output.native_tokens.is_empty() {
                    return Err(Inconsistency::InvalidInternalOutput(format!(
                        "NFT output {output_id} holds native tokens"
                    )));
                }
                v.insert(NftEntry {
                    id: *id,
                    input: Some((output, output_id)),
                    output: None,
                    sent_out: false,
                })
            }
        };

        if let Some(output) = entry.output.take() {
            return Ok(output.amount);
        }
        match &entry.input {
            Some((input, _)) if !entry.sent_out => {
                entry.sent_out = true;
                Ok(input.amount)
            }
            _ => Err(Inconsistency::NftNotOwned(*id)),
        }
    }

    pub(crate) fn sorted(&self) -> Vec<&NftEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub(crate) fn num_inputs(&self) -> usize {
        self.entries.values().filter(|e| e.requires_input()).count()
    }

    pub(crate) fn num_outputs(&self) -> usize {
        self.entries.values().filter(|e| e.produces_output()).count()
    }

    /// NFTs that get a new internal output, and NFTs whose internal output is consumed.
    pub(crate) fn to_be_updated(&self) -> (Vec<NftId>, Vec<NftId>) {
        let sorted = self.sorted();
        let added = sorted
            .iter()
            .filter(|e| e.produces_output())
            .map(|e| e.id)
            .collect();
        let removed = sorted
            .iter()
            .filter(|e| e.requires_input())
            .map(|e| e.id)
            .collect();
        (added, removed)
    }
}
