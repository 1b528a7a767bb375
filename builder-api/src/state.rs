use crate::validator_store::ValidatorStore;
use builder_core::{bids_won_store::BidsWonStore, payload_cache::PayloadCache, signer::Signer};
use ethereum_consensus::{
    primitives::{Root, Version},
    state_transition::Context,
};
use std::sync::Arc;

/// Operator-configured knobs for the relay-style surface; the wire format (routes, field
/// shapes) follows §4.4 exactly and isn't configurable.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub host: std::net::Ipv4Addr,
    pub port: u16,
    /// Wei amount added on top of `block_value` (Gwei, converted to wei) when assembling a
    /// `BuilderBid` for the classic header/blinded-blocks path.
    #[serde(default)]
    pub header_value_subsidy: u128,
    /// Header name carrying the opaque bearer token for write endpoints, when auth is enabled.
    #[serde(default = "default_auth_header")]
    pub api_token_header: String,
    /// When set, write endpoints reject any request whose `api_token_header` doesn't match.
    #[serde(default)]
    pub api_token_key: Option<String>,
}

fn default_auth_header() -> String {
    "X-Builder-Api-Token".to_string()
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub payload_cache: Arc<PayloadCache>,
    pub bids_won_store: Arc<BidsWonStore>,
    pub validator_store: Arc<ValidatorStore>,
    pub signer: Arc<Signer>,
    pub context: Arc<Context>,
    /// The chain's actual genesis fork data -- the second of the two registration verification
    /// modes §4.4 requires, alongside `compute_builder_domain`'s zero/zero convention.
    pub genesis_fork_version: Version,
    pub genesis_validators_root: Root,
}
