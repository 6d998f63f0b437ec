//! Nullable accounts view: in-memory internal outputs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anchor_types::{
    AccountsView, BasicOutput, FoundryOutput, NativeTokenId, NftId, NftOutput, OutputId,
};

/// The chain's internal outputs, pre-seeded by the test.
///
/// Counts every load so tests can assert each output is read at most once.
#[derive(Debug, Default)]
pub struct NullAccounts {
    native_tokens: HashMap<NativeTokenId, (BasicOutput, OutputId)>,
    foundries: HashMap<u32, (FoundryOutput, OutputId)>,
    nfts: HashMap<NftId, (NftOutput, OutputId)>,
    loads: AtomicUsize,
}

impl NullAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the internal output of the first native token `output` carries.
    pub fn with_native_token_output(self, output: BasicOutput, output_id: OutputId) -> Self {
        let first = output.native_tokens.iter().next().map(|t| t.id);
        match first {
            Some(id) => self.with_native_token_output_for(id, output, output_id),
            None => self,
        }
    }

    /// Seed `output` as the internal output of `id`, whatever it carries.
    pub fn with_native_token_output_for(
        mut self,
        id: NativeTokenId,
        output: BasicOutput,
        output_id: OutputId,
    ) -> Self {
        self.native_tokens.insert(id, (output, output_id));
        self
    }

    pub fn with_foundry_output(mut self, output: FoundryOutput, output_id: OutputId) -> Self {
        self.foundries
            .insert(output.serial_number, (output, output_id));
        self
    }

    pub fn with_nft_output(mut self, output: NftOutput, output_id: OutputId) -> Self {
        self.nfts.insert(output.nft_id, (output, output_id));
        self
    }

    /// Number of successful loads served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn served<T: Clone>(&self, found: Option<&T>) -> Option<T> {
        let found = found.cloned();
        if found.is_some() {
            self.loads.fetch_add(1, Ordering::Relaxed);
        }
        found
    }
}

impl AccountsView for NullAccounts {
    fn native_token_output(&self, id: &NativeTokenId) -> Option<(BasicOutput, OutputId)> {
        self.served(self.native_tokens.get(id))
    }

    fn foundry_output(&self, serial_number: u32) -> Option<(FoundryOutput, OutputId)> {
        self.served(self.foundries.get(&serial_number))
    }

    fn nft_output(&self, id: &NftId) -> Option<(NftOutput, OutputId)> {
        self.served(self.nfts.get(id))
    }
}
