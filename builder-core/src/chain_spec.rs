use ethereum_consensus::primitives::{ExecutionAddress, Root, Version};
use serde::Deserialize;
use std::collections::HashMap;

/// Immutable, load-once chain configuration. Carries the genesis data and fork schedule that
/// every other component reads from but nothing mutates after `ChainSpec::load` returns.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSpec {
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub genesis_time: u64,
    pub genesis_validators_root: Root,
    pub genesis_fork_version: Version,
    pub deposit_contract_address: ExecutionAddress,
    /// fork name -> activation epoch, e.g. `{"gloas": 600000}`
    pub fork_schedule: HashMap<String, u64>,
}

impl ChainSpec {
    pub fn fork_at_epoch(&self, epoch: u64) -> Option<&str> {
        self.fork_schedule
            .iter()
            .filter(|(_, activation)| **activation <= epoch)
            .max_by_key(|(_, activation)| **activation)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_gloas_at_epoch(&self, epoch: u64) -> bool {
        self.fork_at_epoch(epoch) == Some("gloas")
    }

    pub fn gloas_activation_epoch(&self) -> Option<u64> {
        self.fork_schedule.get("gloas").copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ChainSpec {
        let mut fork_schedule = HashMap::new();
        fork_schedule.insert("bellatrix".to_string(), 0);
        fork_schedule.insert("capella".to_string(), 100);
        fork_schedule.insert("deneb".to_string(), 200);
        fork_schedule.insert("gloas".to_string(), 300);
        ChainSpec {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            genesis_time: 0,
            genesis_validators_root: Default::default(),
            genesis_fork_version: Default::default(),
            deposit_contract_address: Default::default(),
            fork_schedule,
        }
    }

    #[test]
    fn test_fork_at_epoch_picks_latest_activated() {
        let spec = spec();
        assert_eq!(spec.fork_at_epoch(0), Some("bellatrix"));
        assert_eq!(spec.fork_at_epoch(150), Some("capella"));
        assert_eq!(spec.fork_at_epoch(300), Some("gloas"));
        assert_eq!(spec.fork_at_epoch(301), Some("gloas"));
    }

    #[test]
    fn test_is_gloas_at_epoch() {
        let spec = spec();
        assert!(!spec.is_gloas_at_epoch(299));
        assert!(spec.is_gloas_at_epoch(300));
    }
}
