//! Per-token internal balances held by the chain on L1.
//!
//! Every native token the chain owns sits in exactly one internal basic
//! output addressed to the chain. An entry shadows that output for the
//! duration of one block: it remembers the balance the block started with and
//! tracks the current one, plus whether the output's storage deposit is held.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anchor_types::{
    AccountId, AccountsView, Address, AmountDelta, BasicOutput, NativeTokenId, NativeTokens,
    OutputId, U256,
};

use crate::error::Inconsistency;

/// Base tokens moved between L2 accounts and storage deposits by one ledger call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DepositChange {
    None,
    /// Reserve this many base tokens out of L2 accounts.
    Charge(u64),
    /// Return this many base tokens to L2 accounts.
    Release(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NativeTokenEntry {
    pub(crate) id: NativeTokenId,
    /// The internal output holding this token when the block started.
    pub(crate) input: Option<(BasicOutput, OutputId)>,
    pub(crate) initial: U256,
    pub(crate) current: U256,
    /// Holds exactly when `current != 0`.
    deposit_charged: bool,
}

impl NativeTokenEntry {
    fn fresh(id: NativeTokenId) -> Self {
        Self {
            id,
            input: None,
            initial: U256::ZERO,
            current: U256::ZERO,
            deposit_charged: false,
        }
    }

    fn loaded(id: NativeTokenId, output: BasicOutput, output_id: OutputId) -> Result<Self, Inconsistency> {
        let amount = match (output.native_tokens.len(), output.native_tokens.get(&id)) {
            (1, Some(amount)) => amount,
            _ => {
                return Err(Inconsistency::InvalidInternalOutput(format!(
                    "internal output {output_id} must hold exactly native token {id}"
                )))
            }
        };
        Ok(Self {
            id,
            input: Some((output, output_id)),
            initial: amount,
            current: amount,
            deposit_charged: true,
        })
    }

    /// The pre-existing output must be consumed: it exists and its balance changed.
    pub(crate) fn requires_input(&self) -> bool {
        self.input.is_some() && self.current != self.initial
    }

    /// A new internal output must be produced for a non-zero changed balance.
    pub(crate) fn produces_output(&self) -> bool {
        !self.current.is_zero() && (self.input.is_none() || self.current != self.initial)
    }

    /// The deposit the internal output carries: the existing one, or the assumption.
    fn deposit(&self, assumed: u64) -> u64 {
        self.input
            .as_ref()
            .map_or(assumed, |(output, _)| output.amount)
    }

    /// The internal output holding `current` after the block.
    pub(crate) fn output(&self, chain: AccountId, assumed: u64) -> Result<BasicOutput, Inconsistency> {
        let tokens = NativeTokens::single(self.id, self.current)
            .map_err(|e| Inconsistency::InvalidInternalOutput(e.to_string()))?;
        Ok(match &self.input {
            Some((input, _)) => input.clone().with_native_tokens(tokens),
            None => {
                let chain = Address::Account(chain);
                BasicOutput::new(assumed, chain)
                    .with_sender(chain)
                    .with_native_tokens(tokens)
            }
        })
    }
}

/// Lookup by id, enumeration in ascending id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NativeTokenLedger {
    entries: HashMap<NativeTokenId, NativeTokenEntry>,
}

impl NativeTokenLedger {
    /// Apply `delta` to the chain's balance of `id`, loading the existing
    /// internal output on first touch.
    ///
    /// Going from zero to non-zero charges the output's deposit, going back to
    /// zero releases it.
    pub(crate) fn apply_delta(
        &mut self,
        id: &NativeTokenId,
        delta: AmountDelta,
        accounts: &dyn AccountsView,
        assumed_deposit: u64,
    ) -> Result<DepositChange, Inconsistency> {
        if delta.is_zero() {
            return Ok(DepositChange::None);
        }
        let entry = match self.entries.entry(*id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let entry = match accounts.native_token_output(id) {
                    Some((output, output_id)) => NativeTokenEntry::loaded(*id, output, output_id)?,
                    None => NativeTokenEntry::fresh(*id),
                };
                v.insert(entry)
            }
        };

        let new = delta.apply(entry.current).ok_or(match delta {
            AmountDelta::Increase(_) => Inconsistency::NativeTokenOverflow(*id),
            AmountDelta::Decrease(_) => Inconsistency::NegativeNativeTokenBalance {
                id: *id,
                current: entry.current,
                delta,
            },
        })?;
        entry.current = new;

        let deposit = entry.deposit(assumed_deposit);
        Ok(match (entry.deposit_charged, !new.is_zero()) {
            (false, true) => {
                entry.deposit_charged = true;
                DepositChange::Charge(deposit)
            }
            (true, false) => {
                entry.deposit_charged = false;
                DepositChange::Release(deposit)
            }
            _ => DepositChange::None,
        })
    }

    pub(crate) fn get(&self, id: &NativeTokenId) -> Option<&NativeTokenEntry> {
        self.entries.get(id)
    }

    /// Ids whose internal output is consumed or produced by the transaction.
    pub(crate) fn active_ids(&self) -> impl Iterator<Item = NativeTokenId> + '_ {
        self.entries
            .values()
            .filter(|e| e.requires_input() || e.produces_output())
            .map(|e| e.id)
    }

    /// Entries in ascending id order. The only way to enumerate the ledger.
    pub(crate) fn sorted(&self) -> Vec<&NativeTokenEntry> {
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

    /// Ids whose internal output is rewritten, and ids whose output disappears.
    pub(crate) fn to_be_updated(&self) -> (Vec<NativeTokenId>, Vec<NativeTokenId>) {
        let mut updated = Vec::new();
        let mut removed = Vec::new();
        for entry in self.sorted() {
            if entry.produces_output() {
                updated.push(entry.id);
            } else if entry.requires_input() {
                removed.push(entry.id);
            }
        }
        (updated, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_nullables::NullAccounts;

    const ASSUMED: u64 = 30;

    fn token(b: u8) -> NativeTokenId {
        NativeTokenId::new([b; 38])
    }

    fn units(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_first_credit_charges_and_drain_releases() {
        let accounts = NullAccounts::new();
        let mut ledger = NativeTokenLedger::default();

        let change = ledger
            .apply_delta(&token(1), AmountDelta::Increase(units(10)), &accounts, ASSUMED)
            .unwrap();
        assert_eq!(change, DepositChange::Charge(ASSUMED));

        let change = ledger
            .apply_delta(&token(1), AmountDelta::Increase(units(5)), &accounts, ASSUMED)
            .unwrap();
        assert_eq!(change, DepositChange::None);

        let change = ledger
            .apply_delta(&token(1), AmountDelta::Decrease(units(15)), &accounts, ASSUMED)
            .unwrap();
        assert_eq!(change, DepositChange::Release(ASSUMED));

        let entry = ledger.get(&token(1)).unwrap();
        assert!(!entry.requires_input());
        assert!(!entry.produces_output());
    }

    #[test]
    fn test_debit_below_zero_is_fatal() {
        let accounts = NullAccounts::new();
        let mut ledger = NativeTokenLedger::default();
        ledger
            .apply_delta(&token(1), AmountDelta::Increase(units(3)), &accounts, ASSUMED)
            .unwrap();
        let err = ledger
            .apply_delta(&token(1), AmountDelta::Decrease(units(4)), &accounts, ASSUMED)
            .unwrap_err();
        assert!(matches!(err, Inconsistency::NegativeNativeTokenBalance { .. }));
    }

    #[test]
    fn test_existing_output_is_loaded_once() {
        let chain = Address::Account(AccountId::new([5; 32]));
        let existing = BasicOutput::new(77, chain).with_native_tokens(
            NativeTokens::single(token(2), units(100)).unwrap(),
        );
        let accounts = NullAccounts::new().with_native_token_output(existing, OutputId::new([9; 32], 0));
        let mut ledger = NativeTokenLedger::default();

        let change = ledger
            .apply_delta(&token(2), AmountDelta::Decrease(units(40)), &accounts, ASSUMED)
            .unwrap();
        assert_eq!(change, DepositChange::None);
        let change = ledger
            .apply_delta(&token(2), AmountDelta::Decrease(units(60)), &accounts, ASSUMED)
            .unwrap();
        // the existing output's own deposit comes back, not the assumption
        assert_eq!(change, DepositChange::Release(77));
        assert_eq!(accounts.load_count(), 1);

        let entry = ledger.get(&token(2)).unwrap();
        assert!(entry.requires_input());
        assert!(!entry.produces_output());
        assert_eq!(ledger.to_be_updated(), (vec![], vec![token(2)]));
    }

    #[test]
    fn test_unchanged_existing_balance_needs_no_transaction_slot() {
        let chain = Address::Account(AccountId::new([5; 32]));
        let existing = BasicOutput::new(77, chain)
            .with_native_tokens(NativeTokens::single(token(2), units(100)).unwrap());
        let accounts = NullAccounts::new().with_native_token_output(existing, OutputId::new([9; 32], 0));
        let mut ledger = NativeTokenLedger::default();
        ledger
            .apply_delta(&token(2), AmountDelta::Increase(units(1)), &accounts, ASSUMED)
            .unwrap();
        ledger
            .apply_delta(&token(2), AmountDelta::Decrease(units(1)), &accounts, ASSUMED)
            .unwrap();
        assert_eq!(ledger.num_inputs(), 0);
        assert_eq!(ledger.num_outputs(), 0);
    }

    #[test]
    fn test_enumeration_is_sorted_regardless_of_insertion() {
        let accounts = NullAccounts::new();
        let mut ledger = NativeTokenLedger::default();
        for b in [9u8, 1, 5, 3] {
            ledger
                .apply_delta(&token(b), AmountDelta::Increase(units(1)), &accounts, ASSUMED)
                .unwrap();
        }
        let ids: Vec<_> = ledger.sorted().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![token(1), token(3), token(5), token(9)]);
        assert_eq!(ledger.to_be_updated().0, ids);
    }

    #[test]
    fn test_new_internal_output_is_owned_by_chain() {
        let accounts = NullAccounts::new();
        let mut ledger = NativeTokenLedger::default();
        ledger
            .apply_delta(&token(4), AmountDelta::Increase(units(8)), &accounts, ASSUMED)
            .unwrap();
        let chain = AccountId::new([3; 32]);
        let output = ledger.get(&token(4)).unwrap().output(chain, ASSUMED).unwrap();
        assert_eq!(output.amount, ASSUMED);
        assert_eq!(output.address, Address::Account(chain));
        assert_eq!(output.sender, Some(Address::Account(chain)));
        assert_eq!(output.native_tokens.get(&token(4)), Some(units(8)));
    }

    #[test]
    fn test_malformed_internal_output_is_fatal() {
        let chain = Address::Account(AccountId::new([5; 32]));
        let wrong = BasicOutput::new(77, chain)
            .with_native_tokens(NativeTokens::single(token(3), units(1)).unwrap());
        let accounts = NullAccounts::new().with_native_token_output_for(token(2), wrong, OutputId::new([9; 32], 0));
        let mut ledger = NativeTokenLedger::default();
        let err = ledger
            .apply_delta(&token(2), AmountDelta::Increase(units(1)), &accounts, ASSUMED)
            .unwrap_err();
        assert!(matches!(err, Inconsistency::InvalidInternalOutput(_)));
    }
}
