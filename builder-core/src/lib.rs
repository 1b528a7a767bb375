pub mod bid_tracker;
pub mod bids_won_store;
pub mod chain_spec;
pub mod clock;
#[cfg(feature = "serde")]
pub mod config;
mod error;
#[cfg(feature = "serde")]
pub mod network;
pub mod payload_cache;
pub mod pubsub;
pub mod scheduler;
#[cfg(feature = "serde")]
pub mod serde;
pub mod signer;
pub mod signing;
pub mod types;
pub mod units;
pub mod wallet;

pub use bid_tracker::BidTracker;
pub use bids_won_store::BidsWonStore;
pub use chain_spec::ChainSpec;
pub use clock::Clock;
pub use error::Error;
#[cfg(feature = "serde")]
pub use network::Network;
pub use payload_cache::PayloadCache;
pub use scheduler::Scheduler;
pub use signer::Signer;
pub use wallet::Wallet;
