//! Input and output sums of the transaction being built.
//!
//! Both sides are summed from scratch out of the builder's state; neither is
//! kept incrementally. The comparison is a consistency assertion: every
//! builder operation is self-balancing, so a mismatch means the accounting
//! itself is broken.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anchor_types::{NativeTokenId, NativeTokens, NftId, Output, SimpleTokenScheme, U256};

use crate::builder::AnchorTransactionBuilder;
use crate::error::{Inconsistency, TxBuilderError};

/// Aggregate assets on one side of the transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionTotals {
    /// Wide enough to sum `u16::MAX` outputs of `u64::MAX` each.
    pub base_tokens: u128,
    pub native_tokens: BTreeMap<NativeTokenId, U256>,
    /// `minted - melted` of every foundry on this side.
    pub token_circulating_supplies: BTreeMap<NativeTokenId, U256>,
    /// How many times each NFT appears on this side.
    pub nfts: BTreeMap<NftId, u32>,
}

impl TransactionTotals {
    fn add_base_tokens(&mut self, amount: u64) {
        self.base_tokens += u128::from(amount);
    }

    fn add_native_token(&mut self, id: NativeTokenId, amount: U256) -> Result<(), Inconsistency> {
        let total = self.native_tokens.entry(id).or_insert(U256::ZERO);
        *total = total
            .checked_add(amount)
            .ok_or(Inconsistency::NativeTokenOverflow(id))?;
        Ok(())
    }

    fn add_native_tokens(&mut self, tokens: &NativeTokens) -> Result<(), Inconsistency> {
        for token in tokens.iter() {
            self.add_native_token(token.id, token.amount)?;
        }
        Ok(())
    }

    fn add_circulating_supply(
        &mut self,
        id: NativeTokenId,
        scheme: &SimpleTokenScheme,
    ) -> Result<(), Inconsistency> {
        let supply = scheme.circulating_supply().ok_or_else(|| {
            Inconsistency::InvalidTokenScheme(format!("foundry of {id} melted more than minted"))
        })?;
        self.token_circulating_supplies.insert(id, supply);
        Ok(())
    }

    fn add_nft(&mut self, id: NftId) {
        *self.nfts.entry(id).or_insert(0) += 1;
    }

    /// Base tokens, native tokens and NFTs of a consumed or posted output.
    /// Freshly minted NFTs (null id) have no counterpart and are skipped.
    fn add_output(&mut self, output: &Output, nft: Option<NftId>) -> Result<(), Inconsistency> {
        self.add_base_tokens(output.amount());
        self.add_native_tokens(output.native_tokens())?;
        match nft {
            Some(id) if !id.is_null() => self.add_nft(id),
            _ => {}
        }
        Ok(())
    }

    /// Check `self` (inputs) against `out` (outputs).
    ///
    /// Per native token, tokens minted in the transaction raise the outputs'
    /// circulating supply and tokens melted raise the inputs', so
    /// `in + out_supply == out + in_supply` must hold.
    pub fn balanced_with(&self, out: &Self) -> Result<(), Inconsistency> {
        if self.base_tokens != out.base_tokens {
            return Err(Inconsistency::NotBalanced(format!(
                "base tokens in {} != out {}",
                self.base_tokens, out.base_tokens
            )));
        }

        let ids: BTreeSet<&NativeTokenId> = self
            .native_tokens
            .keys()
            .chain(out.native_tokens.keys())
            .chain(self.token_circulating_supplies.keys())
            .chain(out.token_circulating_supplies.keys())
            .collect();
        for id in ids {
            let get = |map: &BTreeMap<NativeTokenId, U256>| map.get(id).copied().unwrap_or(U256::ZERO);
            let lhs = get(&self.native_tokens).checked_add(get(&out.token_circulating_supplies));
            let rhs = get(&out.native_tokens).checked_add(get(&self.token_circulating_supplies));
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) if lhs == rhs => {}
                (Some(lhs), Some(rhs)) => {
                    return Err(Inconsistency::NotBalanced(format!(
                        "native token {id}: in + minted {lhs} != out + melted {rhs}"
                    )))
                }
                _ => return Err(Inconsistency::NativeTokenOverflow(*id)),
            }
        }

        if self.nfts != out.nfts {
            return Err(Inconsistency::NotBalanced(format!(
                "NFTs in {:?} != out {:?}",
                self.nfts, out.nfts
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TransactionTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "base tokens: {}", self.base_tokens)?;
        for (id, amount) in &self.native_tokens {
            writeln!(f, "  {id}: {amount}")?;
        }
        for (id, supply) in &self.token_circulating_supplies {
            writeln!(f, "  supply of {id}: {supply}")?;
        }
        write!(f, "NFTs: {}", self.nfts.values().sum::<u32>())
    }
}

impl AnchorTransactionBuilder {
    fn sum_inputs(&self) -> Result<TransactionTotals, Inconsistency> {
        let mut totals = TransactionTotals::default();
        totals.add_base_tokens(self.anchor_output.amount);

        for request in &self.consumed {
            totals.add_output(request.output(), request.nft())?;
        }
        for entry in self.native_tokens.sorted() {
            if let (true, Some((input, _))) = (entry.requires_input(), &entry.input) {
                totals.add_base_tokens(input.amount);
                totals.add_native_token(entry.id, entry.initial)?;
            }
        }
        for entry in self.foundries.sorted() {
            if let (true, Some((input, _))) = (entry.requires_input(), &entry.input) {
                totals.add_base_tokens(input.amount);
                totals.add_circulating_supply(input.token_id(), &input.token_scheme)?;
            }
        }
        for entry in self.nfts.sorted() {
            if let (true, Some((input, _))) = (entry.requires_input(), &entry.input) {
                totals.add_base_tokens(input.amount);
                totals.add_nft(entry.id);
            }
        }
        Ok(totals)
    }

    fn sum_outputs(&self) -> Result<TransactionTotals, Inconsistency> {
        let mut totals = TransactionTotals::default();
        totals.base_tokens = u128::from(self.total_base_tokens_in_l2_accounts)
            + u128::from(self.assumption.anchor_output);

        for entry in self.native_tokens.sorted() {
            if entry.produces_output() {
                let output = entry.output(self.chain_account(), self.assumption.native_token_output)?;
                totals.add_base_tokens(output.amount);
                totals.add_native_token(entry.id, entry.current)?;
            }
        }
        for entry in self.foundries.sorted() {
            if let (true, Some(output)) = (entry.produces_output(), &entry.output) {
                totals.add_base_tokens(output.amount);
                totals.add_circulating_supply(output.token_id(), &output.token_scheme)?;
            }
        }
        for entry in self.nfts.sorted() {
            if let Some(output) = &entry.output {
                totals.add_base_tokens(output.amount);
                totals.add_nft(entry.id);
            }
        }
        for output in &self.posted_outputs {
            totals.add_output(output, output.nft_id())?;
        }
        Ok(totals)
    }

    /// Input and output sums of the transaction as it stands.
    pub fn totals(&self) -> Result<(TransactionTotals, TransactionTotals), TxBuilderError> {
        Ok((self.sum_inputs()?, self.sum_outputs()?))
    }

    pub fn check_balanced(&self) -> Result<(), TxBuilderError> {
        let (inputs, outputs) = self.totals()?;
        inputs.balanced_with(&outputs).map_err(|err| {
            tracing::error!(%inputs, %outputs, error = %err, "transaction totals diverged");
            err.into()
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.check_balanced().is_ok()
    }
}
