//! Nullable id source producing deterministic, distinct identifiers.

use std::sync::Mutex;

use anchor_types::{NftId, OutputId};

/// Hands out ids derived from a seed and a counter.
///
/// Two sources with the same seed produce the same sequence.
pub struct NullIds {
    seed: u8,
    counter: Mutex<u32>,
}

impl NullIds {
    pub fn new(seed: u8) -> Self {
        Self {
            seed,
            counter: Mutex::new(0),
        }
    }

    fn next_bytes(&self) -> [u8; 32] {
        let mut counter = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        *counter += 1;
        let mut bytes = [self.seed; 32];
        bytes[..4].copy_from_slice(&counter.to_be_bytes());
        bytes
    }

    /// A fresh output id (output index 0 of a fresh transaction).
    pub fn next_output_id(&self) -> OutputId {
        OutputId::new(self.next_bytes(), 0)
    }

    pub fn next_nft_id(&self) -> NftId {
        NftId::new(self.next_bytes())
    }
}
