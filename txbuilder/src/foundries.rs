//! Foundries controlled by the chain: created, resupplied or destroyed in a block.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anchor_types::{
    AccountId, AccountsView, AmountDelta, FoundryOutput, NativeTokenId, OutputId,
    SimpleTokenScheme, U256,
};

use crate::error::Inconsistency;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FoundryEntry {
    pub(crate) serial_number: u32,
    /// `None` for a foundry created in this block.
    pub(crate) input: Option<(FoundryOutput, OutputId)>,
    /// `None` once destroyed.
    pub(crate) output: Option<FoundryOutput>,
}

impl FoundryEntry {
    pub(crate) fn requires_input(&self) -> bool {
        match &self.input {
            Some((input, _)) => self.output.as_ref() != Some(input),
            None => false,
        }
    }

    pub(crate) fn produces_output(&self) -> bool {
        match (&self.input, &self.output) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some((input, _)), Some(output)) => input != output,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FoundryLedger {
    entries: HashMap<u32, FoundryEntry>,
}

impl FoundryLedger {
    /// Foundries created in this block, i.e. with no prior output.
    pub(crate) fn created_count(&self) -> u32 {
        self.entries.values().filter(|e| e.input.is_none()).count() as u32
    }

    pub(crate) fn create(&mut self, output: FoundryOutput) {
        self.entries.insert(
            output.serial_number,
            FoundryEntry {
                serial_number: output.serial_number,
                input: None,
                output: Some(output),
            },
        );
    }

    fn ensure(
        &mut self,
        serial_number: u32,
        chain: AccountId,
        accounts: &dyn AccountsView,
    ) -> Result<&mut FoundryEntry, Inconsistency> {
        match self.entries.entry(serial_number) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => {
                let (output, output_id) = load(serial_number, chain, accounts)?;
                Ok(v.insert(FoundryEntry {
                    serial_number,
                    input: Some((output.clone(), output_id)),
                    output: Some(output),
                }))
            }
        }
    }

    /// Check that `token_id` is minted by a live foundry of the chain, without
    /// recording the foundry in the ledger.
    pub(crate) fn check_token(
        &self,
        token_id: &NativeTokenId,
        chain: AccountId,
        accounts: &dyn AccountsView,
    ) -> Result<(), Inconsistency> {
        let serial_number = token_id.foundry_serial_number();
        let foundry_token = match self.entries.get(&serial_number) {
            Some(entry) => entry
                .output
                .as_ref()
                .map(FoundryOutput::token_id)
                .ok_or(Inconsistency::FoundryAlreadyDestroyed(serial_number))?,
            None => load(serial_number, chain, accounts)?.0.token_id(),
        };
        if foundry_token != *token_id {
            return Err(Inconsistency::FoundryTokenIdMismatch {
                token_id: *token_id,
                serial_number,
            });
        }
        Ok(())
    }

    /// Mint (increase) or melt (decrease) tokens of the foundry owning `token_id`.
    ///
    /// Counters are left untouched when the result would leave
    /// `0 <= minted - melted <= maximum_supply`.
    pub(crate) fn modify_supply(
        &mut self,
        token_id: &NativeTokenId,
        delta: AmountDelta,
        chain: AccountId,
        accounts: &dyn AccountsView,
    ) -> Result<(), Inconsistency> {
        let serial_number = token_id.foundry_serial_number();
        let entry = self.ensure(serial_number, chain, accounts)?;
        let output = entry
            .output
            .as_mut()
            .ok_or(Inconsistency::FoundryAlreadyDestroyed(serial_number))?;
        if output.token_id() != *token_id {
            return Err(Inconsistency::FoundryTokenIdMismatch {
                token_id: *token_id,
                serial_number,
            });
        }

        let current = output.token_scheme;
        let updated = match delta {
            AmountDelta::Increase(v) => current
                .minted
                .checked_add(v)
                .map(|minted| SimpleTokenScheme { minted, ..current }),
            AmountDelta::Decrease(v) => current
                .melted
                .checked_add(v)
                .map(|melted| SimpleTokenScheme { melted, ..current }),
        };
        let scheme = match updated {
            Some(scheme) if scheme.is_within_bounds() => scheme,
            _ => {
                return Err(Inconsistency::SupplyOutOfBounds {
                    serial_number,
                    delta,
                    minted: output.token_scheme.minted,
                    melted: output.token_scheme.melted,
                    maximum_supply: output.token_scheme.maximum_supply,
                })
            }
        };
        output.token_scheme = scheme;
        Ok(())
    }

    /// Destroy a pre-existing foundry with nothing in circulation; returns its deposit.
    pub(crate) fn destroy(
        &mut self,
        serial_number: u32,
        chain: AccountId,
        accounts: &dyn AccountsView,
    ) -> Result<u64, Inconsistency> {
        let entry = self.ensure(serial_number, chain, accounts)?;
        let deposit = match &entry.input {
            Some((input, _)) => input.amount,
            None => return Err(Inconsistency::DestroyNewFoundry(serial_number)),
        };
        let output = entry
            .output
            .as_ref()
            .ok_or(Inconsistency::FoundryAlreadyDestroyed(serial_number))?;
        let supply = output
            .token_scheme
            .circulating_supply()
            .ok_or_else(|| {
                Inconsistency::InvalidTokenScheme(format!(
                    "foundry #{serial_number} melted more than minted"
                ))
            })?;
        if supply != U256::ZERO {
            return Err(Inconsistency::FoundryHasCirculatingSupply {
                serial_number,
                supply,
            });
        }
        entry.output = None;
        Ok(deposit)
    }

    pub(crate) fn sorted(&self) -> Vec<&FoundryEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.serial_number);
        entries
    }

    pub(crate) fn num_inputs(&self) -> usize {
        self.entries.values().filter(|e| e.requires_input()).count()
    }

    pub(crate) fn num_outputs(&self) -> usize {
        self.entries.values().filter(|e| e.produces_output()).count()
    }

    pub(crate) fn to_be_updated(&self) -> (Vec<u32>, Vec<u32>) {
        let mut updated = Vec::new();
        let mut removed = Vec::new();
        for entry in self.sorted() {
            if entry.produces_output() {
                updated.push(entry.serial_number);
            } else if entry.requires_input() {
                removed.push(entry.serial_number);
            }
        }
        (updated, removed)
    }
}

/// Fetch foundry `serial_number` from the chain's internal outputs.
fn load(
    serial_number: u32,
    chain: AccountId,
    accounts: &dyn AccountsView,
) -> Result<(FoundryOutput, OutputId), Inconsistency> {
    let (output, output_id) = accounts
        .foundry_output(serial_number)
        .ok_or(Inconsistency::FoundryNotFound(serial_number))?;
    if output.serial_number != serial_number || output.account != chain {
        return Err(Inconsistency::InvalidInternalOutput(format!(
            "foundry output {output_id} is not foundry #{serial_number} of the chain"
        )));
    }
    if !output.native_tokens.is_empty() {
        return Err(Inconsistency::InvalidInternalOutput(format!(
            "foundry output {output_id} holds native tokens"
        )));
    }
    Ok((output, output_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_nullables::NullAccounts;
    use anchor_types::NativeTokens;

    fn chain() -> AccountId {
        AccountId::new([4; 32])
    }

    fn foundry(serial_number: u32, minted: u64, melted: u64, max: u64) -> FoundryOutput {
        FoundryOutput {
            amount: 500,
            native_tokens: NativeTokens::default(),
            serial_number,
            token_scheme: SimpleTokenScheme {
                minted: U256::from(minted),
                melted: U256::from(melted),
                maximum_supply: U256::from(max),
            },
            account: chain(),
            metadata: None,
        }
    }

    fn existing(serial_number: u32, minted: u64, melted: u64, max: u64) -> NullAccounts {
        NullAccounts::new().with_foundry_output(
            foundry(serial_number, minted, melted, max),
            OutputId::new([serial_number as u8; 32], 0),
        )
    }

    #[test]
    fn test_mint_within_bounds() {
        let accounts = existing(1, 10, 0, 100);
        let mut ledger = FoundryLedger::default();
        let token_id = NativeTokenId::from_foundry(&chain(), 1);
        ledger
            .modify_supply(&token_id, AmountDelta::Increase(U256::from(90u64)), chain(), &accounts)
            .unwrap();
        let entry = ledger.sorted()[0];
        assert_eq!(
            entry.output.as_ref().unwrap().token_scheme.minted,
            U256::from(100u64)
        );
        assert!(entry.requires_input());
        assert!(entry.produces_output());
        assert_eq!(ledger.to_be_updated(), (vec![1], vec![]));
    }

    #[test]
    fn test_supply_bounds_leave_counters_unchanged() {
        let accounts = existing(1, 10, 0, 100);
        let mut ledger = FoundryLedger::default();
        let token_id = NativeTokenId::from_foundry(&chain(), 1);

        let over = ledger.modify_supply(&token_id, AmountDelta::Increase(U256::from(91u64)), chain(), &accounts);
        assert!(matches!(over, Err(Inconsistency::SupplyOutOfBounds { .. })));
        let under = ledger.modify_supply(&token_id, AmountDelta::Decrease(U256::from(11u64)), chain(), &accounts);
        assert!(matches!(under, Err(Inconsistency::SupplyOutOfBounds { .. })));

        let scheme = ledger.sorted()[0].output.as_ref().unwrap().token_scheme;
        assert_eq!(scheme.minted, U256::from(10u64));
        assert_eq!(scheme.melted, U256::ZERO);
        assert!(!ledger.sorted()[0].requires_input());
    }

    #[test]
    fn test_token_id_of_other_chain_is_rejected() {
        let accounts = existing(1, 0, 0, 100);
        let mut ledger = FoundryLedger::default();
        let foreign = NativeTokenId::from_foundry(&AccountId::new([8; 32]), 1);
        let err = ledger
            .modify_supply(&foreign, AmountDelta::Increase(U256::from(1u64)), chain(), &accounts)
            .unwrap_err();
        assert!(matches!(err, Inconsistency::FoundryTokenIdMismatch { serial_number: 1, .. }));
    }

    #[test]
    fn test_check_token_records_nothing() {
        let accounts = existing(1, 0, 0, 100);
        let ledger = FoundryLedger::default();
        let token_id = NativeTokenId::from_foundry(&chain(), 1);
        assert_eq!(ledger.check_token(&token_id, chain(), &accounts), Ok(()));
        assert!(ledger.sorted().is_empty());

        let foreign = NativeTokenId::from_foundry(&AccountId::new([8; 32]), 1);
        assert!(matches!(
            ledger.check_token(&foreign, chain(), &accounts),
            Err(Inconsistency::FoundryTokenIdMismatch { serial_number: 1, .. })
        ));
        let missing = NativeTokenId::from_foundry(&chain(), 3);
        assert_eq!(
            ledger.check_token(&missing, chain(), &accounts),
            Err(Inconsistency::FoundryNotFound(3))
        );
    }

    #[test]
    fn test_check_token_of_destroyed_foundry() {
        let accounts = existing(1, 5, 5, 10);
        let mut ledger = FoundryLedger::default();
        ledger.destroy(1, chain(), &accounts).unwrap();
        let token_id = NativeTokenId::from_foundry(&chain(), 1);
        assert_eq!(
            ledger.check_token(&token_id, chain(), &accounts),
            Err(Inconsistency::FoundryAlreadyDestroyed(1))
        );
    }

    #[test]
    fn test_unknown_foundry() {
        let accounts = NullAccounts::new();
        let mut ledger = FoundryLedger::default();
        let err = ledger.destroy(7, chain(), &accounts).unwrap_err();
        assert_eq!(err, Inconsistency::FoundryNotFound(7));
    }

    #[test]
    fn test_destroy_rules() {
        let mut ledger = FoundryLedger::default();
        ledger.create(foundry(2, 0, 0, 10));
        assert_eq!(ledger.created_count(), 1);
        let accounts = existing(1, 5, 5, 10);
        assert_eq!(
            ledger.destroy(2, chain(), &accounts),
            Err(Inconsistency::DestroyNewFoundry(2))
        );

        assert_eq!(ledger.destroy(1, chain(), &accounts), Ok(500));
        assert_eq!(
            ledger.destroy(1, chain(), &accounts),
            Err(Inconsistency::FoundryAlreadyDestroyed(1))
        );
        assert_eq!(ledger.to_be_updated(), (vec![2], vec![1]));
        assert_eq!(ledger.num_inputs(), 1);
        assert_eq!(ledger.num_outputs(), 1);
    }

    #[test]
    fn test_destroy_with_supply_in_circulation() {
        let accounts = existing(3, 5, 1, 10);
        let mut ledger = FoundryLedger::default();
        let err = ledger.destroy(3, chain(), &accounts).unwrap_err();
        assert!(matches!(err, Inconsistency::FoundryHasCirculatingSupply { serial_number: 3, .. }));
    }
}
