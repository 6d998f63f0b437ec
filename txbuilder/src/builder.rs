//! The anchor transaction builder.
//!
//! One builder lives for one block. The VM feeds it every consumed request and
//! every output smart contracts post; the builder keeps the L1 view (anchor,
//! internal outputs, requests) and the L2 view (`total_base_tokens_in_l2_accounts`)
//! in lock-step so that the transaction it finally emits balances.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use anchor_types::{
    AccountId, AccountsView, Address, AmountDelta, AnchorOutput, BasicOutput, FoundryOutput,
    L1Params, Metadata, NativeTokenId, NativeTokens, NftId, NftOutput, OnLedgerRequest, Output,
    OutputId, SimpleTokenScheme, StorageDeposit, U256,
};

use crate::deposit::StorageDepositAssumption;
use crate::error::{Inconsistency, LimitExceeded, TxBuilderError};
use crate::foundries::FoundryLedger;
use crate::native_tokens::{DepositChange, NativeTokenLedger};
use crate::nfts::NftLedger;

/// Accumulates the anchor transaction of one block.
///
/// Cloning is the snapshot facility: a clone shares the read-only collaborators
/// and deep-copies everything the builder mutates.
#[derive(Clone)]
pub struct AnchorTransactionBuilder {
    pub(crate) anchor_output: AnchorOutput,
    pub(crate) anchor_output_id: OutputId,
    pub(crate) assumption: StorageDepositAssumption,
    pub(crate) params: L1Params,
    accounts: Arc<dyn AccountsView>,
    pub(crate) rent: Arc<dyn StorageDeposit>,
    /// Requests in the order they were consumed.
    pub(crate) consumed: Vec<OnLedgerRequest>,
    pub(crate) native_tokens: NativeTokenLedger,
    pub(crate) foundries: FoundryLedger,
    pub(crate) nfts: NftLedger,
    /// Outputs in the order they were posted.
    pub(crate) posted_outputs: Vec<Output>,
    pub(crate) total_base_tokens_in_l2_accounts: u64,
}

/// Everything a single call may change. The request and output lists are
/// append-only, so their lengths are enough to roll them back.
struct Checkpoint {
    consumed_len: usize,
    posted_len: usize,
    native_tokens: NativeTokenLedger,
    foundries: FoundryLedger,
    nfts: NftLedger,
    total_base_tokens_in_l2_accounts: u64,
}

impl AnchorTransactionBuilder {
    pub fn new(
        anchor_output: AnchorOutput,
        anchor_output_id: OutputId,
        assumption: StorageDepositAssumption,
        params: L1Params,
        accounts: Arc<dyn AccountsView>,
        rent: Arc<dyn StorageDeposit>,
    ) -> Result<Self, TxBuilderError> {
        params.validate().map_err(|err| {
            let err = Inconsistency::InvalidL1Params(err.to_string());
            tracing::error!(anchor = %anchor_output_id, error = %err, "cannot start block");
            err
        })?;
        let total = anchor_output
            .amount
            .checked_sub(assumption.anchor_output)
            .ok_or_else(|| {
                let err = Inconsistency::AnchorBelowStorageDeposit {
                    amount: anchor_output.amount,
                    deposit: assumption.anchor_output,
                };
                tracing::error!(anchor = %anchor_output_id, error = %err, "cannot start block");
                err
            })?;
        tracing::debug!(
            anchor = %anchor_output_id,
            state_index = anchor_output.state_index,
            l2_total = total,
            "anchor transaction builder created"
        );
        Ok(Self {
            anchor_output,
            anchor_output_id,
            assumption,
            params,
            accounts,
            rent,
            consumed: Vec::new(),
            native_tokens: NativeTokenLedger::default(),
            foundries: FoundryLedger::default(),
            nfts: NftLedger::default(),
            posted_outputs: Vec::new(),
            total_base_tokens_in_l2_accounts: total,
        })
    }

    /// The chain's account id; derived from the anchor's own output id before
    /// the first state transition.
    pub fn chain_account(&self) -> AccountId {
        if self.anchor_output.account_id.is_null() {
            AccountId::from_output_id(&self.anchor_output_id)
        } else {
            self.anchor_output.account_id
        }
    }

    pub fn total_base_tokens_in_l2_accounts(&self) -> u64 {
        self.total_base_tokens_in_l2_accounts
    }

    /// The deposit kept aside in the anchor output itself.
    pub fn anchor_output_storage_deposit(&self) -> u64 {
        self.assumption.anchor_output
    }

    pub fn storage_deposit_assumption(&self) -> StorageDepositAssumption {
        self.assumption
    }

    /// The chain's balance of one native token as tracked in this block;
    /// `None` if the token was not touched yet.
    pub fn native_token_balance(&self, id: &NativeTokenId) -> Option<U256> {
        self.native_tokens.get(id).map(|entry| entry.current)
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Consume an on-ledger request: its base tokens are credited to L2
    /// accounts, its native tokens and NFT move into internal outputs.
    ///
    /// Returns the base-token adjustment caused by storage deposits of new
    /// internal outputs (negative when deposits were reserved).
    pub fn consume(&mut self, request: OnLedgerRequest) -> Result<i64, TxBuilderError> {
        self.atomically("consume", |txb| {
            txb.ensure_new_request(&request)?;
            if txb.inputs_are_full() {
                return Err(LimitExceeded::Inputs {
                    max: txb.params.max_inputs,
                }
                .into());
            }

            txb.credit_l2(request.base_tokens())?;
            let mut adjustment = 0i128;
            for token in request.native_tokens().iter() {
                adjustment += txb.add_native_token_delta(&token.id, AmountDelta::Increase(token.amount))?;
            }
            if let Some(nft_id) = request.nft() {
                adjustment += txb.receive_nft(&request, nft_id)?;
            }

            let id = *request.id();
            let base_tokens = request.base_tokens();
            txb.consumed.push(request);
            txb.check_limits()?;
            let adjustment = to_adjustment(adjustment)?;
            tracing::debug!(
                request = %id,
                base_tokens,
                adjustment,
                l2_total = txb.total_base_tokens_in_l2_accounts,
                "request consumed"
            );
            Ok(adjustment)
        })
    }

    /// Consume a request that cannot be executed and send all of its assets
    /// back to the chain in a fresh output, to be picked up again later.
    ///
    /// Nothing reaches L2 accounts. Returns the position of the retry output
    /// among the posted outputs.
    pub fn consume_unprocessable(&mut self, request: OnLedgerRequest) -> Result<usize, TxBuilderError> {
        self.atomically("consume_unprocessable", |txb| {
            txb.ensure_new_request(&request)?;
            if txb.inputs_are_full() {
                return Err(LimitExceeded::Inputs {
                    max: txb.params.max_inputs,
                }
                .into());
            }
            if txb.outputs_are_full() {
                return Err(LimitExceeded::Outputs {
                    max: txb.params.max_outputs,
                }
                .into());
            }

            let retry = txb.retry_output(&request)?;
            let required = txb.rent.min_deposit(&retry);
            if retry.amount() < required {
                return Err(LimitExceeded::InsufficientStorageDeposit {
                    required,
                    available: retry.amount(),
                }
                .into());
            }

            let id = *request.id();
            txb.consumed.push(request);
            txb.posted_outputs.push(retry);
            txb.check_limits()?;
            let index = txb.posted_outputs.len() - 1;
            tracing::debug!(request = %id, index, "unprocessable request sent back to the chain");
            Ok(index)
        })
    }

    /// Post an output leaving the chain. Its base tokens and native tokens are
    /// debited from L2; an NFT it carries must be held by the chain, unless the
    /// NFT id is null (minted by this transaction).
    pub fn add_output(&mut self, output: impl Into<Output>) -> Result<i64, TxBuilderError> {
        let output = output.into();
        self.atomically("add_output", |txb| {
            if matches!(output, Output::Anchor(_) | Output::Foundry(_)) {
                return Err(Inconsistency::InvalidPostedOutput(output.kind_name()).into());
            }
            let required = txb.rent.min_deposit(&output);
            if output.amount() < required {
                return Err(LimitExceeded::InsufficientStorageDeposit {
                    required,
                    available: output.amount(),
                }
                .into());
            }
            if txb.outputs_are_full() {
                return Err(LimitExceeded::Outputs {
                    max: txb.params.max_outputs,
                }
                .into());
            }

            let mut adjustment = 0i128;
            for token in output.native_tokens().iter() {
                adjustment += txb.add_native_token_delta(&token.id, AmountDelta::Decrease(token.amount))?;
            }
            if let Some(nft_id) = output.nft_id().filter(|id| !id.is_null()) {
                let accounts = Arc::clone(&txb.accounts);
                let released = txb.nfts.send_out(&nft_id, accounts.as_ref())?;
                adjustment += txb.apply_deposit_change(DepositChange::Release(released))?;
            }
            txb.debit_l2(output.amount())?;
            let adjustment = to_adjustment(adjustment)?;

            tracing::debug!(
                kind = output.kind_name(),
                base_tokens = output.amount(),
                adjustment,
                l2_total = txb.total_base_tokens_in_l2_accounts,
                "output posted"
            );
            txb.posted_outputs.push(output);
            txb.check_limits()?;
            Ok(adjustment)
        })
    }

    /// Create a foundry controlled by the chain. Returns its serial number and
    /// the storage deposit reserved for it out of L2 accounts.
    pub fn create_new_foundry(
        &mut self,
        token_scheme: SimpleTokenScheme,
        metadata: Option<Metadata>,
    ) -> Result<(u32, u64), TxBuilderError> {
        self.atomically("create_new_foundry", |txb| {
            if token_scheme.maximum_supply.is_zero() {
                return Err(Inconsistency::InvalidTokenScheme("maximum supply is zero".into()).into());
            }
            if !token_scheme.minted.is_zero() || !token_scheme.melted.is_zero() {
                return Err(Inconsistency::InvalidTokenScheme(
                    "a new foundry starts with nothing minted or melted".into(),
                )
                .into());
            }
            let serial_number = txb
                .anchor_output
                .foundry_counter
                .checked_add(txb.foundries.created_count())
                .and_then(|n| n.checked_add(1))
                .ok_or(Inconsistency::FoundryCounterOverflow)?;

            let mut output = FoundryOutput {
                amount: 0,
                native_tokens: NativeTokens::default(),
                serial_number,
                token_scheme,
                account: txb.chain_account(),
                metadata,
            };
            let deposit = txb.rent.min_deposit(&Output::Foundry(output.clone()));
            output.amount = deposit;
            txb.apply_deposit_change(DepositChange::Charge(deposit))?;
            txb.foundries.create(output);
            txb.check_limits()?;
            tracing::debug!(serial_number, deposit, "foundry created");
            Ok((serial_number, deposit))
        })
    }

    /// Mint (`Increase`) or melt (`Decrease`) native tokens through their
    /// foundry. Minted tokens land in the chain's internal balance, melted
    /// ones are taken from it.
    pub fn modify_native_token_supply(
        &mut self,
        token_id: &NativeTokenId,
        delta: AmountDelta,
    ) -> Result<i64, TxBuilderError> {
        self.atomically("modify_native_token_supply", |txb| {
            let chain = txb.chain_account();
            let accounts = Arc::clone(&txb.accounts);
            if delta.is_zero() {
                txb.foundries.check_token(token_id, chain, accounts.as_ref())?;
                return Ok(0);
            }
            txb.foundries
                .modify_supply(token_id, delta, chain, accounts.as_ref())?;
            let adjustment = to_adjustment(txb.add_native_token_delta(token_id, delta)?)?;
            txb.check_limits()?;
            tracing::debug!(token = %token_id, %delta, adjustment, "native token supply modified");
            Ok(adjustment)
        })
    }

    /// Destroy a foundry that existed before this block; its deposit returns
    /// to L2 accounts and is returned.
    pub fn destroy_foundry(&mut self, serial_number: u32) -> Result<u64, TxBuilderError> {
        self.atomically("destroy_foundry", |txb| {
            let chain = txb.chain_account();
            let accounts = Arc::clone(&txb.accounts);
            let deposit = txb
                .foundries
                .destroy(serial_number, chain, accounts.as_ref())?;
            txb.apply_deposit_change(DepositChange::Release(deposit))?;
            txb.check_limits()?;
            tracing::debug!(serial_number, deposit, "foundry destroyed");
            Ok(deposit)
        })
    }

    // ── Capacity ───────────────────────────────────────────────────────

    /// Inputs of the transaction: the anchor, requests and consumed internal outputs.
    pub fn num_inputs(&self) -> usize {
        1 + self.consumed.len()
            + self.native_tokens.num_inputs()
            + self.foundries.num_inputs()
            + self.nfts.num_inputs()
    }

    /// Outputs of the transaction: the new anchor, internal and posted outputs.
    pub fn num_outputs(&self) -> usize {
        1 + self.native_tokens.num_outputs()
            + self.foundries.num_outputs()
            + self.nfts.num_outputs()
            + self.posted_outputs.len()
    }

    pub fn inputs_are_full(&self) -> bool {
        self.num_inputs() >= self.params.max_inputs
    }

    pub fn outputs_are_full(&self) -> bool {
        self.num_outputs() >= self.params.max_outputs
    }

    fn check_limits(&self) -> Result<(), LimitExceeded> {
        if self.num_inputs() > self.params.max_inputs {
            return Err(LimitExceeded::Inputs {
                max: self.params.max_inputs,
            });
        }
        if self.num_outputs() > self.params.max_outputs {
            return Err(LimitExceeded::Outputs {
                max: self.params.max_outputs,
            });
        }
        let count = self.distinct_native_tokens();
        if count > self.params.max_native_tokens_per_transaction {
            return Err(LimitExceeded::NativeTokens {
                count,
                max: self.params.max_native_tokens_per_transaction,
            });
        }
        Ok(())
    }

    /// Distinct token ids carried by any input or output of the transaction:
    /// internal token outputs, consumed requests and posted outputs.
    fn distinct_native_tokens(&self) -> usize {
        let mut ids: BTreeSet<NativeTokenId> = self.native_tokens.active_ids().collect();
        ids.extend(
            self.consumed
                .iter()
                .flat_map(|request| request.native_tokens().iter().map(|t| t.id)),
        );
        ids.extend(
            self.posted_outputs
                .iter()
                .flat_map(|output| output.native_tokens().iter().map(|t| t.id)),
        );
        ids.len()
    }

    // ── Internal UTXO records ──────────────────────────────────────────

    /// Native tokens whose internal output is rewritten, and those whose
    /// internal output is consumed without replacement. Both sorted by id.
    pub fn native_token_records_to_be_updated(&self) -> (Vec<NativeTokenId>, Vec<NativeTokenId>) {
        self.native_tokens.to_be_updated()
    }

    pub fn foundries_to_be_updated(&self) -> (Vec<u32>, Vec<u32>) {
        self.foundries.to_be_updated()
    }

    pub fn nft_records_to_be_updated(&self) -> (Vec<NftId>, Vec<NftId>) {
        self.nfts.to_be_updated()
    }

    // ── Helpers ────────────────────────────────────────────────────────

    /// Run `f`; on any error put the builder back exactly as it was.
    fn atomically<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, TxBuilderError>,
    ) -> Result<T, TxBuilderError> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if let Err(err) = &result {
            self.restore(checkpoint);
            match err {
                TxBuilderError::Limit(limit) => {
                    tracing::warn!(op, reason = %limit, "rejected by protocol limit, builder unchanged")
                }
                TxBuilderError::Fatal(inconsistency) => {
                    tracing::error!(op, error = %inconsistency, "fatal inconsistency, block must be abandoned")
                }
            }
        }
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            consumed_len: self.consumed.len(),
            posted_len: self.posted_outputs.len(),
            native_tokens: self.native_tokens.clone(),
            foundries: self.foundries.clone(),
            nfts: self.nfts.clone(),
            total_base_tokens_in_l2_accounts: self.total_base_tokens_in_l2_accounts,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.consumed.truncate(checkpoint.consumed_len);
        self.posted_outputs.truncate(checkpoint.posted_len);
        self.native_tokens = checkpoint.native_tokens;
        self.foundries = checkpoint.foundries;
        self.nfts = checkpoint.nfts;
        self.total_base_tokens_in_l2_accounts = checkpoint.total_base_tokens_in_l2_accounts;
    }

    fn ensure_new_request(&self, request: &OnLedgerRequest) -> Result<(), Inconsistency> {
        let id = request.id();
        if *id == self.anchor_output_id || self.consumed.iter().any(|r| r.id() == id) {
            return Err(Inconsistency::DuplicateRequest(*id));
        }
        Ok(())
    }

    fn credit_l2(&mut self, amount: u64) -> Result<(), Inconsistency> {
        self.total_base_tokens_in_l2_accounts = self
            .total_base_tokens_in_l2_accounts
            .checked_add(amount)
            .ok_or(Inconsistency::BaseTokenOverflow)?;
        Ok(())
    }

    fn debit_l2(&mut self, amount: u64) -> Result<(), Inconsistency> {
        self.total_base_tokens_in_l2_accounts = self
            .total_base_tokens_in_l2_accounts
            .checked_sub(amount)
            .ok_or(Inconsistency::NotEnoughBaseTokens {
                needed: amount,
                available: self.total_base_tokens_in_l2_accounts,
            })?;
        Ok(())
    }

    /// Move a storage deposit between L2 accounts and an internal output.
    /// Returns the signed change seen by L2 accounts.
    fn apply_deposit_change(&mut self, change: DepositChange) -> Result<i128, TxBuilderError> {
        match change {
            DepositChange::None => Ok(0),
            DepositChange::Charge(deposit) => {
                let available = self.total_base_tokens_in_l2_accounts;
                self.total_base_tokens_in_l2_accounts = available.checked_sub(deposit).ok_or(
                    LimitExceeded::InsufficientStorageDeposit {
                        required: deposit,
                        available,
                    },
                )?;
                Ok(-i128::from(deposit))
            }
            DepositChange::Release(deposit) => {
                self.credit_l2(deposit)?;
                Ok(i128::from(deposit))
            }
        }
    }

    fn add_native_token_delta(
        &mut self,
        id: &NativeTokenId,
        delta: AmountDelta,
    ) -> Result<i128, TxBuilderError> {
        let accounts = Arc::clone(&self.accounts);
        let change = self.native_tokens.apply_delta(
            id,
            delta,
            accounts.as_ref(),
            self.assumption.native_token_output,
        )?;
        self.apply_deposit_change(change)
    }

    /// Keep an incoming NFT in a new internal output owned by the chain.
    fn receive_nft(&mut self, request: &OnLedgerRequest, nft_id: NftId) -> Result<i128, TxBuilderError> {
        let immutable_metadata = match request.output() {
            Output::Nft(nft) => nft.immutable_metadata.clone(),
            _ => None,
        };
        let mut output = NftOutput::new(0, nft_id, Address::Account(self.chain_account()));
        output.immutable_metadata = immutable_metadata;
        let deposit = self.rent.min_deposit(&Output::Nft(output.clone()));
        output.amount = deposit;
        let adjustment = self.apply_deposit_change(DepositChange::Charge(deposit))?;
        let accounts = Arc::clone(&self.accounts);
        self.nfts.receive(output, accounts.as_ref())?;
        Ok(adjustment)
    }

    /// The request's output with its assets intact, addressed to and sent by the chain.
    fn retry_output(&self, request: &OnLedgerRequest) -> Result<Output, Inconsistency> {
        let chain = Address::Account(self.chain_account());
        match request.output() {
            Output::Basic(basic) => Ok(BasicOutput::new(basic.amount, chain)
                .with_native_tokens(basic.native_tokens.clone())
                .with_sender(chain)
                .into()),
            Output::Nft(nft) => {
                let mut retry = NftOutput::new(nft.amount, nft.nft_id.or_from_output_id(request.id()), chain)
                    .with_native_tokens(nft.native_tokens.clone());
                retry.sender = Some(chain);
                retry.immutable_metadata = nft.immutable_metadata.clone();
                Ok(retry.into())
            }
            other => Err(Inconsistency::InvalidRequest {
                id: *request.id(),
                reason: format!("{} output cannot be a request", other.kind_name()),
            }),
        }
    }
}

fn to_adjustment(adjustment: i128) -> Result<i64, TxBuilderError> {
    i64::try_from(adjustment)
        .map_err(|_| Inconsistency::Internal(format!("adjustment {adjustment} out of range")).into())
}

impl fmt::Display for AnchorTransactionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "anchor transaction builder")?;
        writeln!(
            f,
            "  anchor: {} (state index {}, {} base tokens)",
            self.anchor_output_id, self.anchor_output.state_index, self.anchor_output.amount
        )?;
        writeln!(f, "  storage deposit assumption: {}", self.assumption)?;
        writeln!(f, "  L2 base tokens: {}", self.total_base_tokens_in_l2_accounts)?;
        writeln!(f, "  inputs: {}/{}", self.num_inputs(), self.params.max_inputs)?;
        writeln!(f, "  outputs: {}/{}", self.num_outputs(), self.params.max_outputs)?;
        writeln!(f, "  consumed requests: {}", self.consumed.len())?;
        for request in &self.consumed {
            writeln!(f, "    {} ({} base tokens)", request.id(), request.base_tokens())?;
        }
        writeln!(f, "  native tokens:")?;
        for entry in self.native_tokens.sorted() {
            writeln!(
                f,
                "    {}: {} -> {} (input: {}, output: {})",
                entry.id,
                entry.initial,
                entry.current,
                entry.requires_input(),
                entry.produces_output()
            )?;
        }
        writeln!(f, "  foundries:")?;
        for entry in self.foundries.sorted() {
            writeln!(
                f,
                "    #{} (input: {}, output: {})",
                entry.serial_number,
                entry.requires_input(),
                entry.produces_output()
            )?;
        }
        writeln!(f, "  NFTs:")?;
        for entry in self.nfts.sorted() {
            writeln!(
                f,
                "    {} (input: {}, output: {})",
                entry.id,
                entry.requires_input(),
                entry.produces_output()
            )?;
        }
        write!(f, "  posted outputs: {}", self.posted_outputs.len())
    }
}

impl fmt::Debug for AnchorTransactionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorTransactionBuilder")
            .field("anchor_output_id", &self.anchor_output_id)
            .field("consumed", &self.consumed.len())
            .field("posted_outputs", &self.posted_outputs.len())
            .field("total_base_tokens_in_l2_accounts", &self.total_base_tokens_in_l2_accounts)
            .finish_non_exhaustive()
    }
}
