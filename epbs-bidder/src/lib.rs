mod bidder;
mod config;
mod error;
mod state;

pub use bidder::Bidder;
pub use config::Config;
pub use error::Error;
pub use state::BidderState;
