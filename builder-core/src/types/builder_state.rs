use ethereum_consensus::primitives::{BlsPublicKey, Epoch};

/// Mutated only by the lifecycle manager under its single writer lock; every other component
/// only ever reads a snapshot of this. `index == 0` means "not yet registered on-chain" --
/// there is no validator index zero for a builder in this system.
#[derive(Debug, Clone)]
pub struct BuilderState {
    pub pubkey: BlsPublicKey,
    pub index: u64,
    pub is_registered: bool,
    pub balance: u64,
    pub deposit_epoch: Option<Epoch>,
    pub withdrawable_epoch: Option<Epoch>,
}

impl BuilderState {
    pub fn new(pubkey: BlsPublicKey) -> Self {
        Self {
            pubkey,
            index: 0,
            is_registered: false,
            balance: 0,
            deposit_epoch: None,
            withdrawable_epoch: None,
        }
    }

    /// Apply the monotonic `unregistered -> registered` transition. No-op if already registered
    /// (registration never reverts to unregistered).
    pub fn mark_registered(&mut self, index: u64, deposit_epoch: Epoch) {
        if !self.is_registered {
            self.index = index;
            self.is_registered = true;
            self.deposit_epoch = Some(deposit_epoch);
        }
    }

    pub fn mark_exited(&mut self, withdrawable_epoch: Epoch) {
        self.withdrawable_epoch = Some(withdrawable_epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_builder_has_zero_index() {
        let state = BuilderState::new(Default::default());
        assert_eq!(state.index, 0);
        assert!(!state.is_registered);
    }

    #[test]
    fn test_registration_is_monotonic() {
        let mut state = BuilderState::new(Default::default());
        state.mark_registered(42, 10);
        assert_eq!(state.index, 42);
        assert!(state.is_registered);

        // a second, different registration attempt must not revert the first
        state.mark_registered(99, 20);
        assert_eq!(state.index, 42);
        assert_eq!(state.deposit_epoch, Some(10));
    }
}
