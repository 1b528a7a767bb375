use ethereum_consensus::primitives::{Hash32, Slot};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BidWonEntry {
    pub slot: Slot,
    pub block_hash: Hash32,
    pub num_transactions: usize,
    pub num_blobs: usize,
    pub value_eth: String,
    pub value_wei: u128,
    pub timestamp_ms: u64,
}
