//! Transaction essence: the signed part of an L1 transaction.

use serde::{Deserialize, Serialize};

use crate::id::{blake2b_256, OutputId};
use crate::output::Output;
use crate::packable::{pack_u16, pack_u32, pack_u64, pack_u8, Packable};

const TRANSACTION_ESSENCE_KIND: u8 = 1;
const UTXO_INPUT_KIND: u8 = 0;

/// Commitment to the outputs being consumed, in input order.
///
/// Blake2b-256 over the concatenated Blake2b-256 hashes of each packed output.
pub fn inputs_commitment<'a>(inputs: impl IntoIterator<Item = &'a Output>) -> [u8; 32] {
    let mut hashes = Vec::new();
    for output in inputs {
        hashes.extend_from_slice(&blake2b_256(&output.to_packed_bytes()));
    }
    blake2b_256(&hashes)
}

/// An unsigned transaction: ordered inputs, their commitment and ordered outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEssence {
    pub network_id: u64,
    pub inputs: Vec<OutputId>,
    pub inputs_commitment: [u8; 32],
    pub outputs: Vec<Output>,
}

impl TransactionEssence {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_packed_bytes()
    }

    /// Blake2b-256 of the packed essence.
    pub fn hash(&self) -> [u8; 32] {
        blake2b_256(&self.to_bytes())
    }
}

impl Packable for TransactionEssence {
    fn pack(&self, buf: &mut Vec<u8>) {
        pack_u8(buf, TRANSACTION_ESSENCE_KIND);
        pack_u64(buf, self.network_id);
        // input and output counts are bounded by L1Params (max 128)
        pack_u16(buf, self.inputs.len() as u16);
        for input in &self.inputs {
            pack_u8(buf, UTXO_INPUT_KIND);
            input.pack(buf);
        }
        buf.extend_from_slice(&self.inputs_commitment);
        pack_u16(buf, self.outputs.len() as u16);
        for output in &self.outputs {
            output.pack(buf);
        }
        // no payload
        pack_u32(buf, 0);
    }
}
