//! On-ledger requests: L1 outputs sent to the chain and consumed as inputs.

use serde::{Deserialize, Serialize};

use crate::amount::NativeTokens;
use crate::error::TypesError;
use crate::id::{NftId, OutputId};
use crate::output::Output;

/// An incoming L1 output carrying assets (and possibly an NFT) to the chain.
///
/// Only basic and NFT outputs can be requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnLedgerRequest {
    id: OutputId,
    output: Output,
}

impl OnLedgerRequest {
    pub fn new(id: OutputId, output: Output) -> Result<Self, TypesError> {
        match output {
            Output::Basic(_) | Output::Nft(_) => Ok(Self { id, output }),
            other => Err(TypesError::UnsupportedRequestOutput(other.kind_name())),
        }
    }

    pub fn id(&self) -> &OutputId {
        &self.id
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn base_tokens(&self) -> u64 {
        self.output.amount()
    }

    pub fn native_tokens(&self) -> &NativeTokens {
        self.output.native_tokens()
    }

    /// The carried NFT; a null id in the output means it was minted by the
    /// transaction that created the request.
    pub fn nft(&self) -> Option<NftId> {
        self.output
            .nft_id()
            .map(|nft_id| nft_id.or_from_output_id(&self.id))
    }
}
