use builder_core::{chain_spec::ChainSpec, network::Network, scheduler};
use ethereum_consensus::primitives::ExecutionAddress;
use serde::Deserialize;
use std::{fmt, path::Path};

/// Top-level daemon configuration. Component sections reuse each component crate's own `Config`
/// type directly rather than re-declaring their fields, so a new knob on e.g. `builder_api::Config`
/// is picked up here for free.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: Network,

    /// 32-byte hex BLS secret this process signs builder bids and validator-facing messages with.
    pub builder_privkey: String,
    /// Beacon node base URL (SSE event streams, execution-payload-bid submission, builder
    /// registry lookups).
    pub cl_client: String,
    /// Execution client Engine API endpoint.
    pub el_engine_api: String,
    /// Path to the 32-byte hex JWT secret shared with the execution client.
    pub el_jwt_secret: String,
    /// Execution client JSON-RPC endpoint used for deposit/top-up transactions.
    pub el_rpc: String,
    /// 32-byte hex secp256k1 key funding deposits and topping up the builder's stake.
    pub wallet_privkey: String,

    pub fee_recipient: ExecutionAddress,
    #[serde(default = "default_build_deadline_ms")]
    pub build_deadline_ms: u64,
    #[serde(default = "default_payload_build_delay_ms")]
    pub payload_build_delay_ms: u64,
    #[serde(default)]
    pub bids_won_store_capacity: Option<usize>,

    /// Accepted but not enforced: no independent source of expected withdrawal credentials is
    /// available to this single-process builder without full beacon state access.
    #[serde(default)]
    pub validate_withdrawals: bool,

    pub chain_spec: ChainSpec,
    #[serde(default)]
    pub schedule: scheduler::Config,
    #[serde(default)]
    pub epbs: epbs_bidder::Config,
    pub builder_api: builder_api::Config,
    /// Present and `Some` enables the lifecycle manager (deposit, registration wait, balance
    /// top-up, voluntary exit); absent runs the builder against an already-registered builder
    /// account with no on-chain lifecycle management.
    #[serde(default)]
    pub lifecycle: Option<builder_lifecycle::Config>,
}

fn default_build_deadline_ms() -> u64 {
    4_000
}

fn default_payload_build_delay_ms() -> u64 {
    200
}

impl Config {
    pub fn from_toml_file<P: AsRef<Path> + fmt::Display>(path: P) -> eyre::Result<Self> {
        builder_core::config::from_toml_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_minimal_config() {
        let toml = r#"
            builder_privkey = "0x0101010101010101010101010101010101010101010101010101010101010101"
            cl_client = "http://localhost:5052/"
            el_engine_api = "http://localhost:8551/"
            el_jwt_secret = "/tmp/jwt.hex"
            el_rpc = "http://localhost:8545/"
            wallet_privkey = "0x0202020202020202020202020202020202020202020202020202020202020202"
            fee_recipient = "0x0000000000000000000000000000000000000000"

            [chain_spec]
            seconds_per_slot = 12
            slots_per_epoch = 32
            genesis_time = 1700000000
            genesis_validators_root = "0x0000000000000000000000000000000000000000000000000000000000000000"
            genesis_fork_version = "0x00000000"
            deposit_contract_address = "0x0000000000000000000000000000000000000000"

            [chain_spec.fork_schedule]
            gloas = 600000

            [builder_api]
            host = "127.0.0.1"
            port = 18551
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.build_deadline_ms, 4_000);
        assert!(config.lifecycle.is_none());
        assert!(config.chain_spec.is_gloas_at_epoch(config.chain_spec.gloas_activation_epoch().unwrap()));
    }
}
