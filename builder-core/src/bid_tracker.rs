use crate::{error::Error, types::BidRecord};
use ethereum_consensus::primitives::Slot;
use parking_lot::Mutex;
use std::{collections::HashMap, time::SystemTime};

/// Tracks pending bid commitments so the lifecycle manager's balance monitor can reserve
/// balance against them: `sum(pending_payments[s]) <= builder_balance` must hold, and
/// `effective_balance = balance - pending`.
#[derive(Default)]
pub struct BidTracker {
    pending: Mutex<HashMap<Slot, BidRecord>>,
}

impl BidTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `value` against `slot`, failing if doing so would exceed `available_balance`.
    pub fn reserve(
        &self,
        slot: Slot,
        value: u128,
        execution_payment: u128,
        available_balance: u64,
    ) -> Result<(), Error> {
        let mut pending = self.pending.lock();
        let total_pending_excluding_slot: u128 =
            pending.iter().filter(|(s, _)| **s != slot).map(|(_, r)| r.value).sum();
        let requested = total_pending_excluding_slot + value;
        if requested > available_balance as u128 {
            return Err(Error::InsufficientBalance {
                requested: requested as u64,
                available: available_balance,
            })
        }
        pending.insert(
            slot,
            BidRecord { slot, value, execution_payment, submitted_at: SystemTime::now() },
        );
        Ok(())
    }

    /// Release the reservation for `slot` on any terminal bidder state (won, lost, failed).
    pub fn release(&self, slot: Slot) {
        self.pending.lock().remove(&slot);
    }

    pub fn pending_payments(&self) -> u128 {
        self.pending.lock().values().map(|r| r.value).sum()
    }

    pub fn get(&self, slot: Slot) -> Option<BidRecord> {
        self.pending.lock().get(&slot).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_release_frees_balance() {
        let tracker = BidTracker::new();
        tracker.reserve(10, 1_000, 1_000, 5_000).unwrap();
        assert_eq!(tracker.pending_payments(), 1_000);
        tracker.release(10);
        assert_eq!(tracker.pending_payments(), 0);
    }

    #[test]
    fn test_reserve_rejects_over_balance() {
        let tracker = BidTracker::new();
        tracker.reserve(10, 4_000, 4_000, 5_000).unwrap();
        let err = tracker.reserve(11, 2_000, 2_000, 5_000).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
    }

    #[test]
    fn test_reserve_same_slot_replaces_not_accumulates() {
        let tracker = BidTracker::new();
        tracker.reserve(10, 1_000, 1_000, 5_000).unwrap();
        tracker.reserve(10, 2_000, 2_000, 5_000).unwrap();
        assert_eq!(tracker.pending_payments(), 2_000);
    }
}
