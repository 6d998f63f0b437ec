//! Errors raised while constructing or validating ledger values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("too many native tokens in one output: {count} (max {max})")]
    TooManyNativeTokens { count: usize, max: usize },

    #[error("native token {0} has a zero amount")]
    ZeroNativeTokenAmount(String),

    #[error("native token {0} appears more than once")]
    DuplicateNativeToken(String),

    #[error("metadata too long: {len} bytes (max {max})")]
    MetadataTooLong { len: usize, max: usize },

    #[error("output kind {0} cannot be consumed as a request")]
    UnsupportedRequestOutput(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}
