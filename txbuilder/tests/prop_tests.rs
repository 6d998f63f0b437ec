use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use anchor_nullables::{FixedDeposit, NullAccounts, NullIds};
use anchor_txbuilder::{AnchorTransactionBuilder, StorageDepositAssumption};
use anchor_types::{
    AccountId, Address, AmountDelta, AnchorOutput, BasicOutput, L1Params, Metadata, NativeToken,
    NativeTokenId, NativeTokens, NftId, NftOutput, OnLedgerRequest, OutputId, SimpleTokenScheme,
    U256,
};

#[derive(Clone, Debug)]
enum Op {
    Consume { amount: u64, tokens: Vec<(u8, u64)> },
    ConsumeNft { amount: u64 },
    Post { amount: u64, tokens: Vec<(u8, u64)> },
    SendHeldNft,
    Unprocessable { amount: u64, tokens: Vec<(u8, u64)> },
    CreateFoundry { max_supply: u64 },
    Mint { amount: u64 },
    Melt { amount: u64 },
}

fn token_list() -> impl Strategy<Value = Vec<(u8, u64)>> {
    prop::collection::btree_map(0u8..5, 1u64..50, 0..3).prop_map(|m| m.into_iter().collect())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..200, token_list()).prop_map(|(amount, tokens)| Op::Consume { amount, tokens }),
        1 => (20u64..100).prop_map(|amount| Op::ConsumeNft { amount }),
        4 => (10u64..150, token_list()).prop_map(|(amount, tokens)| Op::Post { amount, tokens }),
        1 => Just(Op::SendHeldNft),
        1 => (10u64..100, token_list()).prop_map(|(amount, tokens)| Op::Unprocessable { amount, tokens }),
        1 => (1u64..500).prop_map(|max_supply| Op::CreateFoundry { max_supply }),
        2 => (1u64..100).prop_map(|amount| Op::Mint { amount }),
        1 => (1u64..100).prop_map(|amount| Op::Melt { amount }),
    ]
}

fn chain() -> AccountId {
    AccountId::new([0x11; 32])
}

fn token(b: u8) -> NativeTokenId {
    NativeTokenId::new([b + 1; 38])
}

fn native_tokens(list: &[(u8, u64)]) -> NativeTokens {
    NativeTokens::new(
        list.iter()
            .map(|(b, amount)| NativeToken::new(token(*b), U256::from(*amount)))
            .collect(),
    )
    .unwrap()
}

fn builder() -> AnchorTransactionBuilder {
    let anchor = AnchorOutput {
        amount: 5_000,
        account_id: chain(),
        state_index: 0,
        state_metadata: Metadata::default(),
        foundry_counter: 0,
        state_controller: Address::Ed25519([1; 32]),
        governor: Address::Ed25519([2; 32]),
        metadata: None,
    };
    let held_nft = NftOutput::new(25, NftId::new([0x99; 32]), Address::Account(chain()));
    AnchorTransactionBuilder::new(
        anchor,
        OutputId::new([0xA0; 32], 0),
        StorageDepositAssumption {
            anchor_output: 100,
            native_token_output: 30,
        },
        L1Params {
            max_inputs: 16,
            max_outputs: 16,
            max_native_tokens_per_transaction: 4,
            ..L1Params::default()
        },
        Arc::new(NullAccounts::new().with_nft_output(held_nft, OutputId::new([0xB0; 32], 0))),
        Arc::new(FixedDeposit {
            basic: 10,
            nft: 20,
            foundry: 50,
            anchor: 100,
        }),
    )
    .unwrap()
}

/// Apply one operation; errors are part of the game and must leave no trace.
fn apply(txb: &mut AnchorTransactionBuilder, ids: &NullIds, foundries: &mut Vec<u32>, op: &Op) -> bool {
    let user = Address::Ed25519([0xEE; 32]);
    let result = match op {
        Op::Consume { amount, tokens } => {
            let output = BasicOutput::new(*amount, Address::Account(chain()))
                .with_native_tokens(native_tokens(tokens));
            let req = OnLedgerRequest::new(ids.next_output_id(), output.into()).unwrap();
            txb.consume(req).map(|_| ())
        }
        Op::ConsumeNft { amount } => {
            let output = NftOutput::new(*amount, NftId::NULL, Address::Account(chain()));
            let req = OnLedgerRequest::new(ids.next_output_id(), output.into()).unwrap();
            txb.consume(req).map(|_| ())
        }
        Op::Post { amount, tokens } => {
            let output = BasicOutput::new(*amount, user).with_native_tokens(native_tokens(tokens));
            txb.add_output(output).map(|_| ())
        }
        Op::SendHeldNft => txb
            .add_output(NftOutput::new(25, NftId::new([0x99; 32]), user))
            .map(|_| ()),
        Op::Unprocessable { amount, tokens } => {
            let output = BasicOutput::new(*amount, Address::Account(chain()))
                .with_native_tokens(native_tokens(tokens));
            let req = OnLedgerRequest::new(ids.next_output_id(), output.into()).unwrap();
            txb.consume_unprocessable(req).map(|_| ())
        }
        Op::CreateFoundry { max_supply } => txb
            .create_new_foundry(SimpleTokenScheme::new(U256::from(*max_supply)), None)
            .map(|(sn, _)| foundries.push(sn)),
        Op::Mint { amount } | Op::Melt { amount } => match foundries.last() {
            Some(sn) => {
                let id = NativeTokenId::from_foundry(&chain(), *sn);
                let delta = match op {
                    Op::Mint { .. } => AmountDelta::Increase(U256::from(*amount)),
                    _ => AmountDelta::Decrease(U256::from(*amount)),
                };
                txb.modify_native_token_supply(&id, delta).map(|_| ())
            }
            None => Ok(()),
        },
    };
    result.is_ok()
}

proptest! {
    /// Every accepted call keeps the transaction balanced, and every rejected
    /// call leaves the builder exactly as it was.
    #[test]
    fn conservation_holds_after_every_call(ops in prop::collection::vec(op(), 1..40)) {
        let ids = NullIds::new(1);
        let mut foundries = Vec::new();
        let mut txb = builder();
        for op in &ops {
            let before = (txb.to_string(), txb.total_base_tokens_in_l2_accounts());
            if !apply(&mut txb, &ids, &mut foundries, op) {
                prop_assert_eq!((txb.to_string(), txb.total_base_tokens_in_l2_accounts()), before);
            }
            prop_assert!(txb.is_balanced(), "unbalanced after {:?}:\n{}", op, txb);
            prop_assert!(txb.num_inputs() <= 16);
            prop_assert!(txb.num_outputs() <= 16);
        }
        let essence = txb.build_transaction_essence(vec![7; 32]);
        prop_assert!(essence.is_ok());
        let distinct: BTreeSet<NativeTokenId> = essence
            .unwrap()
            .outputs
            .iter()
            .flat_map(|output| output.native_tokens().iter().map(|t| t.id))
            .collect();
        prop_assert!(distinct.len() <= 4, "{} distinct native tokens", distinct.len());
    }

    /// Identical call sequences produce byte-identical essences.
    #[test]
    fn essence_is_deterministic(ops in prop::collection::vec(op(), 1..30)) {
        let mut essences = Vec::new();
        for _ in 0..2 {
            let ids = NullIds::new(2);
            let mut foundries = Vec::new();
            let mut txb = builder();
            for op in &ops {
                apply(&mut txb, &ids, &mut foundries, op);
            }
            essences.push(txb.build_transaction_essence(vec![3; 32]).unwrap().to_bytes());
        }
        prop_assert_eq!(&essences[0], &essences[1]);
    }

    /// Crediting and fully debiting a fresh token nets out to the posted amount.
    #[test]
    fn dust_deposit_nets_to_zero(amount in 1u64..1_000, b in 0u8..5) {
        let ids = NullIds::new(3);
        let mut txb = builder();
        let before = txb.total_base_tokens_in_l2_accounts();
        let req = OnLedgerRequest::new(
            ids.next_output_id(),
            BasicOutput::new(0, Address::Account(chain()))
                .with_native_tokens(native_tokens(&[(b, amount)]))
                .into(),
        )
        .unwrap();
        let charged = txb.consume(req).unwrap();
        let released = txb
            .add_output(
                BasicOutput::new(10, Address::Ed25519([5; 32]))
                    .with_native_tokens(native_tokens(&[(b, amount)])),
            )
            .unwrap();
        prop_assert_eq!(charged + released, 0);
        prop_assert_eq!(txb.total_base_tokens_in_l2_accounts(), before - 10);
    }
}
