//! Read access to the internal outputs the chain already holds on L1.

use crate::id::{NativeTokenId, NftId, OutputId};
use crate::output::{BasicOutput, FoundryOutput, NftOutput};

/// Loaders for pre-existing internal outputs, as recorded in the chain state.
///
/// Implementations must behave as pure functions of the identifier: the
/// builder may call them at any time, and several builders may share one view.
pub trait AccountsView: Send + Sync {
    /// The internal output holding the chain's balance of `id`, if any.
    fn native_token_output(&self, id: &NativeTokenId) -> Option<(BasicOutput, OutputId)>;

    /// The foundry with the given serial number, if the chain controls one.
    fn foundry_output(&self, serial_number: u32) -> Option<(FoundryOutput, OutputId)>;

    /// The internal output holding `id`, if the chain owns that NFT.
    fn nft_output(&self, id: &NftId) -> Option<(NftOutput, OutputId)>;
}
