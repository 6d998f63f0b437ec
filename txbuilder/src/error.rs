//! Builder errors, split into block-continuing limits and block-aborting inconsistencies.

use anchor_types::{AmountDelta, NativeTokenId, NftId, OutputId, U256};
use thiserror::Error;

/// The request or output cannot fit into this block's transaction.
///
/// The builder is left exactly as it was before the failing call; the caller
/// skips the request and carries on with the block.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LimitExceeded {
    #[error("exceeded maximum number of inputs in transaction ({max})")]
    Inputs { max: usize },

    #[error("exceeded maximum number of outputs in transaction ({max})")]
    Outputs { max: usize },

    #[error("exceeded maximum number of native tokens in transaction: {count} (max {max})")]
    NativeTokens { count: usize, max: usize },

    #[error("insufficient storage deposit: required {required}, available {available}")]
    InsufficientStorageDeposit { required: u64, available: u64 },
}

/// L1 and L2 accounting diverged, or a caller broke a precondition it was
/// supposed to check. The whole block must be abandoned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("invalid L1 parameters: {0}")]
    InvalidL1Params(String),

    #[error("anchor output holds {amount} base tokens, below the assumed storage deposit {deposit}")]
    AnchorBelowStorageDeposit { amount: u64, deposit: u64 },

    #[error("native token {id} balance {current} cannot absorb {delta}")]
    NegativeNativeTokenBalance {
        id: NativeTokenId,
        current: U256,
        delta: AmountDelta,
    },

    #[error("native token {0} balance overflow")]
    NativeTokenOverflow(NativeTokenId),

    #[error("not enough base tokens in L2 accounts: need {needed}, have {available}")]
    NotEnoughBaseTokens { needed: u64, available: u64 },

    #[error("base token overflow")]
    BaseTokenOverflow,

    #[error("transaction is not balanced: {0}")]
    NotBalanced(String),

    #[error("token id {token_id} does not belong to foundry #{serial_number}")]
    FoundryTokenIdMismatch {
        token_id: NativeTokenId,
        serial_number: u32,
    },

    #[error("foundry #{0} not found")]
    FoundryNotFound(u32),

    #[error("foundry #{0} was already destroyed in this block")]
    FoundryAlreadyDestroyed(u32),

    #[error("foundry #{0} was created in this block and cannot be destroyed")]
    DestroyNewFoundry(u32),

    #[error("foundry #{serial_number} still has {supply} tokens in circulation")]
    FoundryHasCirculatingSupply { serial_number: u32, supply: U256 },

    #[error("foundry #{serial_number}: supply change {delta} leaves bounds (minted {minted}, melted {melted}, max {maximum_supply})")]
    SupplyOutOfBounds {
        serial_number: u32,
        delta: AmountDelta,
        minted: U256,
        melted: U256,
        maximum_supply: U256,
    },

    #[error("invalid token scheme: {0}")]
    InvalidTokenScheme(String),

    #[error("foundry serial number counter overflow")]
    FoundryCounterOverflow,

    #[error("NFT {0} is not owned by the chain")]
    NftNotOwned(NftId),

    #[error("NFT {0} is already held by the chain")]
    NftAlreadyOwned(NftId),

    #[error("request {0} consumed twice")]
    DuplicateRequest(OutputId),

    #[error("invalid request {id}: {reason}")]
    InvalidRequest { id: OutputId, reason: String },

    #[error("output kind {0} cannot be posted")]
    InvalidPostedOutput(&'static str),

    #[error("invalid internal output: {0}")]
    InvalidInternalOutput(String),

    #[error("invalid state metadata: {0}")]
    InvalidStateMetadata(String),

    #[error("storage deposit assumption for {what} is {assumed}, but {required} is required")]
    StorageDepositAssumptionViolated {
        what: &'static str,
        assumed: u64,
        required: u64,
    },

    #[error("anchor state index overflow")]
    StateIndexOverflow,

    #[error("internal inconsistency: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TxBuilderError {
    #[error("protocol limit: {0}")]
    Limit(#[from] LimitExceeded),

    #[error("fatal: {0}")]
    Fatal(#[from] Inconsistency),
}

impl TxBuilderError {
    /// Fatal errors abort the whole block; limit errors only skip the request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
