mod bid_record;
mod bid_won;
pub mod builder_bid;
mod builder_state;
pub mod execution_payload;
mod payload_attributes;
mod payload_ready_event;

pub use bid_record::BidRecord;
pub use bid_won::BidWonEntry;
pub use builder_bid::{BuilderBid, ExecutionPayloadBid, SignedBuilderBid, SignedExecutionPayloadBid};
pub use builder_state::BuilderState;
pub use execution_payload::{BlobsBundle, ExecutionPayload, ExecutionPayloadHeader, Transaction};
pub use payload_attributes::PayloadAttributes;
pub use payload_ready_event::PayloadReadyEvent;

pub use ethereum_consensus::builder::{SignedValidatorRegistration, ValidatorRegistration};
