use ethereum_consensus::primitives::Slot;

#[derive(Debug, Clone)]
pub struct BidRecord {
    pub slot: Slot,
    pub value: u128,
    pub execution_payment: u128,
    pub submitted_at: std::time::SystemTime,
}
