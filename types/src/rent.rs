//! Storage deposit ("rent") computation.

use serde::{Deserialize, Serialize};

use crate::id::OUTPUT_ID_LENGTH;
use crate::output::Output;
use crate::packable::Packable;

/// Bytes of per-output bookkeeping counted as data: block id + milestone index + timestamp.
const OUTPUT_METADATA_DATA_LENGTH: u64 = 32 + 4 + 4;

/// The minimum base tokens an output shape must carry to be stored on L1.
pub trait StorageDeposit: Send + Sync {
    fn min_deposit(&self, output: &Output) -> u64;
}

/// The host ledger's virtual-byte rent parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentStructure {
    /// Base tokens charged per virtual byte.
    #[serde(default = "default_v_byte_cost")]
    pub v_byte_cost: u32,
    /// Weight of a data byte.
    #[serde(default = "default_v_byte_factor_data")]
    pub v_byte_factor_data: u8,
    /// Weight of a key (indexed) byte.
    #[serde(default = "default_v_byte_factor_key")]
    pub v_byte_factor_key: u8,
}

fn default_v_byte_cost() -> u32 {
    100
}

fn default_v_byte_factor_data() -> u8 {
    1
}

fn default_v_byte_factor_key() -> u8 {
    10
}

impl Default for RentStructure {
    fn default() -> Self {
        Self {
            v_byte_cost: default_v_byte_cost(),
            v_byte_factor_data: default_v_byte_factor_data(),
            v_byte_factor_key: default_v_byte_factor_key(),
        }
    }
}

impl RentStructure {
    /// Virtual bytes every output pays for regardless of its content.
    fn v_byte_offset(&self) -> u64 {
        self.v_byte_factor_key as u64 * OUTPUT_ID_LENGTH as u64
            + self.v_byte_factor_data as u64 * OUTPUT_METADATA_DATA_LENGTH
    }

    pub fn v_bytes(&self, output: &Output) -> u64 {
        self.v_byte_offset() + self.v_byte_factor_data as u64 * output.packed_len() as u64
    }
}

impl StorageDeposit for RentStructure {
    fn min_deposit(&self, output: &Output) -> u64 {
        (self.v_byte_cost as u64).saturating_mul(self.v_bytes(output))
    }
}
