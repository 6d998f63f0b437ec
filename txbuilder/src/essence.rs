//! Deterministic assembly of the anchor transaction.
//!
//! Inputs: the anchor, requests in consumption order, then consumed internal
//! outputs (native tokens by id, foundries by serial number, NFTs by id).
//! Outputs: the new anchor, internal outputs in the same order, then posted
//! outputs in posting order. Ledger iteration order never reaches the result.

use anchor_types::{
    inputs_commitment, AnchorOutput, Metadata, Output, OutputId, TransactionEssence,
};

use crate::builder::AnchorTransactionBuilder;
use crate::error::{Inconsistency, TxBuilderError};

impl AnchorTransactionBuilder {
    /// Close the block: emit the essence with `state_metadata` as the new
    /// state commitment. Fails fatally if the transaction does not balance.
    pub fn build_transaction_essence(
        &self,
        state_metadata: Vec<u8>,
    ) -> Result<TransactionEssence, TxBuilderError> {
        self.assemble(state_metadata).inspect_err(|err| {
            tracing::error!(anchor = %self.anchor_output_id, error = %err, "cannot build anchor transaction");
        })
    }

    fn assemble(&self, state_metadata: Vec<u8>) -> Result<TransactionEssence, TxBuilderError> {
        let state_metadata = Metadata::new(state_metadata)
            .map_err(|e| Inconsistency::InvalidStateMetadata(e.to_string()))?;
        self.check_balanced()?;

        let inputs = self.sorted_inputs();
        let outputs = self.sorted_outputs(state_metadata)?;
        if inputs.len() > self.params.max_inputs || outputs.len() > self.params.max_outputs {
            return Err(Inconsistency::Internal(format!(
                "transaction shape {}/{} exceeds {}/{}",
                inputs.len(),
                outputs.len(),
                self.params.max_inputs,
                self.params.max_outputs
            ))
            .into());
        }
        self.check_storage_deposit_assumption(&outputs)?;

        let essence = TransactionEssence {
            network_id: self.params.network_id,
            inputs_commitment: inputs_commitment(inputs.iter().map(|(_, output)| output)),
            inputs: inputs.into_iter().map(|(id, _)| id).collect(),
            outputs,
        };
        tracing::info!(
            anchor = %self.anchor_output_id,
            inputs = essence.inputs.len(),
            outputs = essence.outputs.len(),
            hash = %hex::encode(&essence.hash()[..8]),
            "anchor transaction essence built"
        );
        Ok(essence)
    }

    /// Input ids with the outputs they consume, in transaction order.
    pub(crate) fn sorted_inputs(&self) -> Vec<(OutputId, Output)> {
        let mut inputs = Vec::with_capacity(self.num_inputs());
        inputs.push((
            self.anchor_output_id,
            Output::Anchor(self.anchor_output.clone()),
        ));
        for request in &self.consumed {
            inputs.push((*request.id(), request.output().clone()));
        }
        for entry in self.native_tokens.sorted() {
            if let (true, Some((input, id))) = (entry.requires_input(), &entry.input) {
                inputs.push((*id, Output::Basic(input.clone())));
            }
        }
        for entry in self.foundries.sorted() {
            if let (true, Some((input, id))) = (entry.requires_input(), &entry.input) {
                inputs.push((*id, Output::Foundry(input.clone())));
            }
        }
        for entry in self.nfts.sorted() {
            if let (true, Some((input, id))) = (entry.requires_input(), &entry.input) {
                inputs.push((*id, Output::Nft(input.clone())));
            }
        }
        inputs
    }

    pub(crate) fn sorted_outputs(&self, state_metadata: Metadata) -> Result<Vec<Output>, Inconsistency> {
        let mut outputs = Vec::with_capacity(self.num_outputs());
        outputs.push(Output::Anchor(self.next_anchor_output(state_metadata)?));

        let chain = self.chain_account();
        for entry in self.native_tokens.sorted() {
            if entry.produces_output() {
                let output = entry.output(chain, self.assumption.native_token_output)?;
                outputs.push(Output::Basic(output));
            }
        }
        for entry in self.foundries.sorted() {
            if let (true, Some(output)) = (entry.produces_output(), &entry.output) {
                outputs.push(Output::Foundry(output.clone()));
            }
        }
        for entry in self.nfts.sorted() {
            if let Some(output) = &entry.output {
                outputs.push(Output::Nft(output.clone()));
            }
        }
        outputs.extend(self.posted_outputs.iter().cloned());
        Ok(outputs)
    }

    fn next_anchor_output(&self, state_metadata: Metadata) -> Result<AnchorOutput, Inconsistency> {
        let previous = &self.anchor_output;
        Ok(AnchorOutput {
            amount: self
                .total_base_tokens_in_l2_accounts
                .checked_add(self.assumption.anchor_output)
                .ok_or(Inconsistency::BaseTokenOverflow)?,
            account_id: self.chain_account(),
            state_index: previous
                .state_index
                .checked_add(1)
                .ok_or(Inconsistency::StateIndexOverflow)?,
            state_metadata,
            foundry_counter: previous
                .foundry_counter
                .checked_add(self.foundries.created_count())
                .ok_or(Inconsistency::FoundryCounterOverflow)?,
            state_controller: previous.state_controller,
            governor: previous.governor,
            metadata: previous.metadata.clone(),
        })
    }

    /// The cached deposits must cover what the rent function really asks for
    /// the new anchor and every new internal token output.
    fn check_storage_deposit_assumption(&self, outputs: &[Output]) -> Result<(), Inconsistency> {
        if let Some(anchor) = outputs.first() {
            let required = self.rent.min_deposit(anchor);
            if required > self.assumption.anchor_output {
                return Err(Inconsistency::StorageDepositAssumptionViolated {
                    what: "anchor output",
                    assumed: self.assumption.anchor_output,
                    required,
                });
            }
        }
        let chain = self.chain_account();
        for entry in self.native_tokens.sorted() {
            if entry.input.is_some() || !entry.produces_output() {
                continue;
            }
            let output = Output::Basic(entry.output(chain, self.assumption.native_token_output)?);
            let required = self.rent.min_deposit(&output);
            if required > self.assumption.native_token_output {
                return Err(Inconsistency::StorageDepositAssumptionViolated {
                    what: "native token output",
                    assumed: self.assumption.native_token_output,
                    required,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::deposit::StorageDepositAssumption;
    use anchor_nullables::{FixedDeposit, NullAccounts, NullIds};
    use anchor_types::{
        AccountId, Address, AmountDelta, BasicOutput, FoundryOutput, L1Params, NativeTokenId,
        NativeTokens, NftId, NftOutput, OnLedgerRequest, SimpleTokenScheme, U256,
    };

    fn chain() -> AccountId {
        AccountId::new([1; 32])
    }

    fn anchor() -> AnchorOutput {
        AnchorOutput {
            amount: 10_000,
            account_id: chain(),
            state_index: 0,
            state_metadata: Metadata::default(),
            foundry_counter: 0,
            state_controller: Address::Ed25519([2; 32]),
            governor: Address::Ed25519([3; 32]),
            metadata: None,
        }
    }

    fn internal_token_output(b: u8, amount: u64) -> BasicOutput {
        BasicOutput::new(30, Address::Account(chain())).with_native_tokens(
            NativeTokens::single(NativeTokenId::new([b; 38]), U256::from(amount)).unwrap(),
        )
    }

    fn foundry(serial_number: u32) -> FoundryOutput {
        FoundryOutput {
            amount: 50,
            native_tokens: NativeTokens::default(),
            serial_number,
            token_scheme: SimpleTokenScheme::new(U256::from(1_000u64)),
            account: chain(),
            metadata: None,
        }
    }

    /// Pre-existing internal outputs for tokens 5, 2, 9, foundries 3, 1 and NFTs 8, 4.
    fn accounts() -> NullAccounts {
        let mut accounts = NullAccounts::new();
        for (i, b) in [5u8, 2, 9].into_iter().enumerate() {
            accounts = accounts.with_native_token_output(
                internal_token_output(b, 100),
                OutputId::new([0x10; 32], i as u16),
            );
        }
        for sn in [3u32, 1] {
            accounts =
                accounts.with_foundry_output(foundry(sn), OutputId::new([0x20; 32], sn as u16));
        }
        for b in [8u8, 4] {
            accounts = accounts.with_nft_output(
                NftOutput::new(20, NftId::new([b; 32]), Address::Account(chain())),
                OutputId::new([0x30; 32], b as u16),
            );
        }
        accounts
    }

    fn builder() -> AnchorTransactionBuilder {
        AnchorTransactionBuilder::new(
            anchor(),
            OutputId::new([0xAA; 32], 0),
            StorageDepositAssumption {
                anchor_output: 100,
                native_token_output: 30,
            },
            L1Params::default(),
            Arc::new(accounts()),
            Arc::new(FixedDeposit {
                basic: 10,
                nft: 20,
                foundry: 50,
                anchor: 100,
            }),
        )
        .unwrap()
    }

    fn user() -> Address {
        Address::Ed25519([0xEE; 32])
    }

    /// Touch everything in a scrambled order.
    fn scrambled(txb: &mut AnchorTransactionBuilder, ids: &NullIds) {
        let req =
            OnLedgerRequest::new(ids.next_output_id(), BasicOutput::new(500, user()).into())
                .unwrap();
        txb.consume(req).unwrap();
        for b in [9u8, 2, 5] {
            let out = BasicOutput::new(10, user()).with_native_tokens(
                NativeTokens::single(NativeTokenId::new([b; 38]), U256::from(1u64)).unwrap(),
            );
            txb.add_output(out).unwrap();
        }
        let token_3 = NativeTokenId::from_foundry(&chain(), 3);
        let token_1 = NativeTokenId::from_foundry(&chain(), 1);
        txb.modify_native_token_supply(&token_3, AmountDelta::Increase(U256::from(7u64)))
            .unwrap();
        txb.modify_native_token_supply(&token_1, AmountDelta::Increase(U256::from(7u64)))
            .unwrap();
        for b in [8u8, 4] {
            txb.add_output(NftOutput::new(20, NftId::new([b; 32]), user()))
                .unwrap();
        }
    }

    #[test]
    fn test_inputs_follow_fixed_order() {
        let ids = NullIds::new(1);
        let mut txb = builder();
        scrambled(&mut txb, &ids);
        let essence = txb.build_transaction_essence(vec![0xCD; 32]).unwrap();

        let mut expected = vec![OutputId::new([0xAA; 32], 0), *txb.consumed[0].id()];
        // tokens 2, 5, 9 were loaded at indices 1, 0, 2
        expected.push(OutputId::new([0x10; 32], 1));
        expected.push(OutputId::new([0x10; 32], 0));
        expected.push(OutputId::new([0x10; 32], 2));
        expected.push(OutputId::new([0x20; 32], 1));
        expected.push(OutputId::new([0x20; 32], 3));
        expected.push(OutputId::new([0x30; 32], 4));
        expected.push(OutputId::new([0x30; 32], 8));
        assert_eq!(essence.inputs, expected);
    }

    #[test]
    fn test_outputs_follow_fixed_order() {
        let ids = NullIds::new(1);
        let mut txb = builder();
        scrambled(&mut txb, &ids);
        let essence = txb.build_transaction_essence(vec![0xCD; 32]).unwrap();

        let kinds: Vec<_> = essence.outputs.iter().map(|o| o.kind_name()).collect();
        assert_eq!(
            kinds,
            vec![
                "anchor", "basic", "basic", "basic", "basic", "basic", "foundry", "foundry",
                "basic", "basic", "basic", "nft", "nft"
            ]
        );

        // internal token outputs of the three loaded and two minted tokens, by id
        let internal: Vec<NativeTokenId> = essence.outputs[1..6]
            .iter()
            .map(|o| o.native_tokens().iter().next().unwrap().id)
            .collect();
        let mut sorted = internal.clone();
        sorted.sort();
        assert_eq!(internal, sorted);

        let serials: Vec<u32> = essence.outputs[6..8]
            .iter()
            .map(|o| match o {
                Output::Foundry(f) => f.serial_number,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(serials, vec![1, 3]);

        // posted outputs keep posting order: tokens 9, 2, 5 then NFTs 8, 4
        let posted_tokens: Vec<u8> = essence.outputs[8..11]
            .iter()
            .map(|o| o.native_tokens().iter().next().unwrap().id.as_bytes()[0])
            .collect();
        assert_eq!(posted_tokens, vec![9, 2, 5]);
        let posted_nfts: Vec<u8> = essence.outputs[11..]
            .iter()
            .map(|o| o.nft_id().unwrap().as_bytes()[0])
            .collect();
        assert_eq!(posted_nfts, vec![8, 4]);
    }

    #[test]
    fn test_new_anchor_output() {
        let mut txb = builder();
        txb.create_new_foundry(SimpleTokenScheme::new(U256::from(5u64)), None)
            .unwrap();
        let essence = txb.build_transaction_essence(vec![0xCD; 32]).unwrap();
        match &essence.outputs[0] {
            Output::Anchor(next) => {
                assert_eq!(next.amount, 10_000 - 50);
                assert_eq!(next.state_index, 1);
                assert_eq!(next.foundry_counter, 1);
                assert_eq!(next.state_metadata.as_bytes(), &[0xCD; 32]);
                assert_eq!(next.account_id, chain());
            }
            other => panic!("unexpected first output {other:?}"),
        }
    }

    #[test]
    fn test_inputs_commitment_covers_consumed_outputs() {
        let ids = NullIds::new(1);
        let mut txb = builder();
        scrambled(&mut txb, &ids);
        let essence = txb.build_transaction_essence(vec![]).unwrap();
        let consumed: Vec<Output> = txb.sorted_inputs().into_iter().map(|(_, o)| o).collect();
        assert_eq!(essence.inputs_commitment, inputs_commitment(consumed.iter()));
        assert_eq!(essence.network_id, 0);
    }

    #[test]
    fn test_same_calls_give_same_bytes() {
        let mut a = builder();
        let mut b = builder();
        scrambled(&mut a, &NullIds::new(1));
        scrambled(&mut b, &NullIds::new(1));
        let ea = a.build_transaction_essence(vec![1, 2, 3]).unwrap();
        let eb = b.build_transaction_essence(vec![1, 2, 3]).unwrap();
        assert_eq!(ea.to_bytes(), eb.to_bytes());
        assert_eq!(ea.hash(), eb.hash());
    }

    #[test]
    fn test_underestimated_anchor_deposit_is_fatal() {
        let txb = AnchorTransactionBuilder::new(
            anchor(),
            OutputId::new([0xAA; 32], 0),
            StorageDepositAssumption {
                anchor_output: 99,
                native_token_output: 30,
            },
            L1Params::default(),
            Arc::new(NullAccounts::new()),
            Arc::new(FixedDeposit::uniform(100)),
        )
        .unwrap();
        let err = txb.build_transaction_essence(vec![]).unwrap_err();
        assert_eq!(
            err,
            Inconsistency::StorageDepositAssumptionViolated {
                what: "anchor output",
                assumed: 99,
                required: 100,
            }
            .into()
        );
    }

    #[test]
    fn test_oversized_state_metadata_is_fatal() {
        let txb = builder();
        let err = txb
            .build_transaction_essence(vec![0; anchor_types::MAX_METADATA_LENGTH + 1])
            .unwrap_err();
        assert!(matches!(err, TxBuilderError::Fatal(Inconsistency::InvalidStateMetadata(_))));
    }
}
