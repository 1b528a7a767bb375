use builder_core::types::ValidatorRegistration;
use ethereum_consensus::primitives::BlsPublicKey;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Accepted validator registrations, keyed by pubkey. The latest accepted registration for a
/// given pubkey always replaces whatever was there, matching the registration TTL semantics
/// relays advertise (a later `timestamp` wins).
#[derive(Default)]
pub struct ValidatorStore {
    entries: RwLock<HashMap<BlsPublicKey, ValidatorRegistration>>,
}

impl ValidatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, registration: ValidatorRegistration) {
        let mut entries = self.entries.write();
        match entries.get(&registration.public_key) {
            Some(existing) if existing.timestamp >= registration.timestamp => {}
            _ => {
                entries.insert(registration.public_key.clone(), registration);
            }
        }
    }

    pub fn get(&self, public_key: &BlsPublicKey) -> Option<ValidatorRegistration> {
        self.entries.read().get(public_key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(public_key: BlsPublicKey, timestamp: u64) -> ValidatorRegistration {
        ValidatorRegistration {
            fee_recipient: Default::default(),
            gas_limit: 30_000_000,
            timestamp,
            public_key,
        }
    }

    #[test]
    fn test_later_timestamp_replaces_earlier() {
        let store = ValidatorStore::new();
        let key = BlsPublicKey::default();
        store.insert(registration(key.clone(), 100));
        store.insert(registration(key.clone(), 200));
        assert_eq!(store.get(&key).unwrap().timestamp, 200);
    }

    #[test]
    fn test_earlier_timestamp_does_not_replace_later() {
        let store = ValidatorStore::new();
        let key = BlsPublicKey::default();
        store.insert(registration(key.clone(), 200));
        store.insert(registration(key.clone(), 100));
        assert_eq!(store.get(&key).unwrap().timestamp, 200);
    }

    #[test]
    fn test_missing_pubkey_returns_none() {
        let store = ValidatorStore::new();
        assert!(store.get(&BlsPublicKey::default()).is_none());
    }
}
