use crate::types::PayloadReadyEvent;
use ethereum_consensus::primitives::{Hash32, Slot};
use parking_lot::RwLock;
use std::collections::HashMap;

type Key = (Slot, Hash32);

/// At most one current entry per `(slot, parent_block_hash)`; a newer `get_payload` within the
/// same slot replaces whatever was there. Reads and writes are linearisable per key under the
/// shared lock.
#[derive(Default)]
pub struct PayloadCache {
    entries: RwLock<HashMap<Key, PayloadReadyEvent>>,
}

impl PayloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or supersede the entry for this event's `(slot, parent_block_hash)`.
    pub fn insert(&self, event: PayloadReadyEvent) {
        let key = event.cache_key();
        self.entries.write().insert(key, event);
    }

    pub fn get(&self, slot: Slot, parent_block_hash: &Hash32) -> Option<PayloadReadyEvent> {
        self.entries.read().get(&(slot, parent_block_hash.clone())).cloned()
    }

    pub fn get_by_block_hash(&self, block_hash: &Hash32) -> Option<PayloadReadyEvent> {
        self.entries.read().values().find(|event| &event.block_hash == block_hash).cloned()
    }

    /// Drop every entry for a slot that has passed, bounding memory growth across the run.
    pub fn evict_through(&self, slot: Slot) {
        self.entries.write().retain(|(s, _), _| *s > slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlobsBundle, ExecutionPayload};

    fn event(slot: Slot, parent: Hash32, block_hash: Hash32, value: u64) -> PayloadReadyEvent {
        PayloadReadyEvent {
            slot,
            block_hash,
            parent_block_hash: parent,
            parent_block_root: Default::default(),
            prev_randao: Default::default(),
            fee_recipient: Default::default(),
            gas_limit: 30_000_000,
            payload: ExecutionPayload::default(),
            blobs_bundle: BlobsBundle::default(),
            execution_requests: None,
            block_value: value,
        }
    }

    #[test]
    fn test_newer_event_supersedes_same_key() {
        let cache = PayloadCache::new();
        let parent = Hash32::try_from([0xAAu8; 32].as_ref()).unwrap();
        cache.insert(event(100, parent.clone(), Hash32::try_from([1u8; 32].as_ref()).unwrap(), 10));
        cache.insert(event(100, parent.clone(), Hash32::try_from([2u8; 32].as_ref()).unwrap(), 20));

        let cached = cache.get(100, &parent).unwrap();
        assert_eq!(cached.block_value, 20);
        assert_eq!(cached.block_hash, Hash32::try_from([2u8; 32].as_ref()).unwrap());
    }

    #[test]
    fn test_missing_key_returns_none() {
        let cache = PayloadCache::new();
        let parent = Hash32::try_from([0xCCu8; 32].as_ref()).unwrap();
        assert!(cache.get(101, &parent).is_none());
    }

    #[test]
    fn test_evict_through_drops_past_slots() {
        let cache = PayloadCache::new();
        let parent = Hash32::try_from([0xAAu8; 32].as_ref()).unwrap();
        cache.insert(event(10, parent.clone(), Hash32::try_from([1u8; 32].as_ref()).unwrap(), 1));
        cache.insert(event(11, parent.clone(), Hash32::try_from([2u8; 32].as_ref()).unwrap(), 1));
        cache.evict_through(10);
        assert!(cache.get(10, &parent).is_none());
        assert!(cache.get(11, &parent).is_some());
    }
}
