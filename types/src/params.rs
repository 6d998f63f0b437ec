//! L1 protocol parameters that shape the anchor transaction.
//!
//! Loaded from TOML (every field has a default) or built in code for tests.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::rent::RentStructure;

/// Transaction shape limits and rent parameters of the host ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1Params {
    /// Network the essence is bound to.
    #[serde(default)]
    pub network_id: u64,

    /// Maximum inputs in one transaction, the anchor included.
    #[serde(default = "default_max_inputs")]
    pub max_inputs: usize,

    /// Maximum outputs in one transaction, the anchor included.
    #[serde(default = "default_max_outputs")]
    pub max_outputs: usize,

    /// Maximum distinct native tokens across one transaction.
    #[serde(default = "default_max_native_tokens")]
    pub max_native_tokens_per_transaction: usize,

    /// Rent (storage deposit) parameters.
    #[serde(default)]
    pub rent: RentStructure,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_max_inputs() -> usize {
    128
}

fn default_max_outputs() -> usize {
    128
}

fn default_max_native_tokens() -> usize {
    64
}

// ── Impl ───────────────────────────────────────────────────────────────

impl L1Params {
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, TypesError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TypesError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, TypesError> {
        let params: Self = toml::from_str(s).map_err(|e| TypesError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_toml_string(&self) -> Result<String, TypesError> {
        toml::to_string_pretty(self).map_err(|e| TypesError::Config(e.to_string()))
    }

    /// The anchor always occupies one input and one output; anything smaller
    /// cannot hold a transaction at all.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.max_inputs < 1 || self.max_inputs > u16::MAX as usize {
            return Err(TypesError::Config(format!(
                "max_inputs must be in 1..={}, got {}",
                u16::MAX,
                self.max_inputs
            )));
        }
        if self.max_outputs < 1 || self.max_outputs > u16::MAX as usize {
            return Err(TypesError::Config(format!(
                "max_outputs must be in 1..={}, got {}",
                u16::MAX,
                self.max_outputs
            )));
        }
        Ok(())
    }
}

impl Default for L1Params {
    fn default() -> Self {
        Self {
            network_id: 0,
            max_inputs: default_max_inputs(),
            max_outputs: default_max_outputs(),
            max_native_tokens_per_transaction: default_max_native_tokens(),
            rent: RentStructure::default(),
        }
    }
}
