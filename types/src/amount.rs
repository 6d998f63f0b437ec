//! Asset amounts: base tokens, native tokens and signed native-token deltas.
//!
//! Base tokens are plain `u64` raw units. Native token amounts are 256-bit
//! unsigned integers and every operation on them is checked.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::U256;

use crate::error::TypesError;
use crate::id::NativeTokenId;

/// Maximum number of distinct native tokens a single output may carry.
pub const MAX_NATIVE_TOKENS_PER_OUTPUT: usize = 64;

/// A signed change to a native token balance or supply.
///
/// The magnitude is unsigned so the whole `U256` range stays expressible in
/// both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AmountDelta {
    Increase(U256),
    Decrease(U256),
}

impl AmountDelta {
    pub fn magnitude(&self) -> U256 {
        match self {
            Self::Increase(v) | Self::Decrease(v) => *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude().is_zero()
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Increase(v) => Self::Decrease(v),
            Self::Decrease(v) => Self::Increase(v),
        }
    }

    /// Apply to `value`; `None` on overflow or when the result would be negative.
    pub fn apply(&self, value: U256) -> Option<U256> {
        match self {
            Self::Increase(v) => value.checked_add(*v),
            Self::Decrease(v) => value.checked_sub(*v),
        }
    }
}

impl fmt::Display for AmountDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase(v) => write!(f, "+{v}"),
            Self::Decrease(v) => write!(f, "-{v}"),
        }
    }
}

/// An amount of one native token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeToken {
    pub id: NativeTokenId,
    pub amount: U256,
}

impl NativeToken {
    pub fn new(id: NativeTokenId, amount: U256) -> Self {
        Self { id, amount }
    }
}

/// The native tokens carried by one output: sorted by id, no duplicates, no zero amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<NativeToken>", into = "Vec<NativeToken>")]
pub struct NativeTokens(Vec<NativeToken>);

impl NativeTokens {
    pub const EMPTY: Self = Self(Vec::new());

    pub fn new(mut tokens: Vec<NativeToken>) -> Result<Self, TypesError> {
        if tokens.len() > MAX_NATIVE_TOKENS_PER_OUTPUT {
            return Err(TypesError::TooManyNativeTokens {
                count: tokens.len(),
                max: MAX_NATIVE_TOKENS_PER_OUTPUT,
            });
        }
        tokens.sort_by(|a, b| a.id.cmp(&b.id));
        for pair in tokens.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(TypesError::DuplicateNativeToken(pair[0].id.to_string()));
            }
        }
        if let Some(zero) = tokens.iter().find(|t| t.amount.is_zero()) {
            return Err(TypesError::ZeroNativeTokenAmount(zero.id.to_string()));
        }
        Ok(Self(tokens))
    }

    /// A set holding exactly one token.
    pub fn single(id: NativeTokenId, amount: U256) -> Result<Self, TypesError> {
        Self::new(vec![NativeToken::new(id, amount)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeToken> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &NativeTokenId) -> Option<U256> {
        self.0
            .binary_search_by(|t| t.id.cmp(id))
            .ok()
            .map(|i| self.0[i].amount)
    }
}

impl TryFrom<Vec<NativeToken>> for NativeTokens {
    type Error = TypesError;

    fn try_from(tokens: Vec<NativeToken>) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl From<NativeTokens> for Vec<NativeToken> {
    fn from(tokens: NativeTokens) -> Self {
        tokens.0
    }
}
