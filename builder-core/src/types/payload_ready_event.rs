use crate::types::{BlobsBundle, ExecutionPayload};
use ethereum_consensus::primitives::{ExecutionAddress, Hash32, Root, Slot};

/// Produced once per successful `get_payload`; superseded when a newer event for the same
/// `(slot, parent_block_hash)` arrives, and dropped once the slot's reveal window passes.
#[derive(Debug, Clone)]
pub struct PayloadReadyEvent {
    pub slot: Slot,
    pub block_hash: Hash32,
    pub parent_block_hash: Hash32,
    pub parent_block_root: Root,
    pub prev_randao: Hash32,
    pub fee_recipient: ExecutionAddress,
    pub gas_limit: u64,
    pub payload: ExecutionPayload,
    pub blobs_bundle: BlobsBundle,
    pub execution_requests: Option<Vec<u8>>,
    /// value of the block in Gwei
    pub block_value: u64,
}

impl PayloadReadyEvent {
    pub fn cache_key(&self) -> (Slot, Hash32) {
        (self.slot, self.parent_block_hash.clone())
    }
}
