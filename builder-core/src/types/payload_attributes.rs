use ethereum_consensus::{
    capella::Withdrawal,
    primitives::{ExecutionAddress, Hash32, Root, Slot, ValidatorIndex},
};

/// What the CL hands the builder on a `payload_attributes` event; the seed for one
/// fork-choice-update-with-attributes call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadAttributes {
    pub slot: Slot,
    pub parent_block_hash: Hash32,
    pub parent_block_root: Root,
    pub proposer_index: ValidatorIndex,
    pub fee_recipient: ExecutionAddress,
    pub prev_randao: Hash32,
    pub timestamp: u64,
    pub withdrawals: Vec<Withdrawal>,
    pub parent_beacon_block_root: Root,
}
