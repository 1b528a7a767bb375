use ethereum_consensus::{primitives::Slot, Error as ConsensusError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no payload cached for slot {0}")]
    NoPayloadCached(Slot),
    #[error(
        "insufficient balance to reserve bid: {requested} requested, {available} available"
    )]
    InsufficientBalance { requested: u64, available: u64 },
    #[error("nonce desync: wallet expected {expected} but chain reports {observed}")]
    NonceDesync { expected: u64, observed: u64 },
    #[error("wallet chain-id changed mid-run: was {previous}, now {current}")]
    ChainIdChanged { previous: u64, current: u64 },
    #[error("{0}")]
    Consensus(#[from] ConsensusError),
}
