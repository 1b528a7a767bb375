use crate::types::BidWonEntry;
use parking_lot::RwLock;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Reverse-chronological circular buffer of won bids. Reads copy out a page so a mutation to
/// the store can never be observed through a previously returned slice.
pub struct BidsWonStore {
    capacity: usize,
    entries: RwLock<VecDeque<BidWonEntry>>,
}

impl Default for BidsWonStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BidsWonStore {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: RwLock::new(VecDeque::with_capacity(capacity)) }
    }

    /// Insert a new entry at the front (most recent first), evicting the oldest if over
    /// capacity.
    pub fn insert(&self, entry: BidWonEntry) {
        let mut entries = self.entries.write();
        entries.push_front(entry);
        while entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `entries[offset..min(offset+limit, size)]` as an owned copy, plus the total
    /// size of the store.
    pub fn get_page(&self, offset: usize, limit: usize) -> (Vec<BidWonEntry>, usize) {
        let entries = self.entries.read();
        let total = entries.len();
        let page = entries.iter().skip(offset).take(limit).cloned().collect();
        (page, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_consensus::primitives::Hash32;

    fn entry(slot: u64) -> BidWonEntry {
        BidWonEntry {
            slot,
            block_hash: Hash32::default(),
            num_transactions: 0,
            num_blobs: 0,
            value_eth: "0".to_string(),
            value_wei: 0,
            timestamp_ms: slot,
        }
    }

    #[test]
    fn test_capacity_bounds_size() {
        let store = BidsWonStore::new(3);
        for i in 0..5 {
            store.insert(entry(i));
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_entries_are_reverse_chronological() {
        let store = BidsWonStore::new(10);
        for i in 0..3 {
            store.insert(entry(i));
        }
        let (page, total) = store.get_page(0, 10);
        assert_eq!(total, 3);
        assert_eq!(page[0].slot, 2);
        assert_eq!(page[2].slot, 0);
    }

    #[test]
    fn test_get_page_offset_and_limit() {
        let store = BidsWonStore::new(10);
        for i in 0..10 {
            store.insert(entry(i));
        }
        let (page, total) = store.get_page(2, 3);
        assert_eq!(total, 10);
        assert_eq!(page.len(), 3);
        // most recent is slot 9 at offset 0, so offset 2 starts at slot 7
        assert_eq!(page[0].slot, 7);
        assert_eq!(page[2].slot, 5);
    }

    #[test]
    fn test_get_page_is_a_copy() {
        let store = BidsWonStore::new(10);
        store.insert(entry(1));
        let (mut page, _) = store.get_page(0, 10);
        page[0].slot = 999;
        let (page_again, _) = store.get_page(0, 10);
        assert_eq!(page_again[0].slot, 1);
    }
}
