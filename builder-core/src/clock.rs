use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Maps wall time to slot, epoch, and intra-slot offset for a fixed `genesis_time`.
///
/// Never derive intra-slot offsets from deltas between successive `now()` calls;
/// always recompute from `(now - genesis) mod seconds_per_slot` so a late-starting
/// process still converges to the correct phase within the slot.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    genesis_time: u64,
    seconds_per_slot: u64,
    slots_per_epoch: u64,
}

impl Clock {
    pub fn new(genesis_time: u64, seconds_per_slot: u64, slots_per_epoch: u64) -> Self {
        Self { genesis_time, seconds_per_slot, slots_per_epoch }
    }

    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    fn elapsed_since_genesis(&self, now: SystemTime) -> Duration {
        let now = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        Duration::from_secs(now.saturating_sub(self.genesis_time))
    }

    /// Slot containing wall-clock time `now`. Slots before genesis return `0`.
    pub fn slot_at(&self, now: SystemTime) -> u64 {
        self.elapsed_since_genesis(now).as_secs() / self.seconds_per_slot
    }

    pub fn epoch_at(&self, now: SystemTime) -> u64 {
        self.slot_at(now) / self.slots_per_epoch
    }

    /// Milliseconds elapsed since the start of the slot containing `now`.
    pub fn offset_in_slot_ms(&self, now: SystemTime) -> u64 {
        let elapsed = self.elapsed_since_genesis(now).as_secs();
        (elapsed % self.seconds_per_slot) * 1000
    }

    pub fn current_slot(&self) -> u64 {
        self.slot_at(SystemTime::now())
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch_at(SystemTime::now())
    }

    pub fn current_offset_in_slot_ms(&self) -> u64 {
        self.offset_in_slot_ms(SystemTime::now())
    }

    /// Wall-clock instant at which `slot` begins.
    pub fn start_of_slot(&self, slot: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.genesis_time + slot * self.seconds_per_slot)
    }

    /// `Duration` until the start of `slot`, or `Duration::ZERO` if it has already begun.
    pub fn duration_until_slot(&self, slot: u64) -> Duration {
        self.start_of_slot(slot).duration_since(SystemTime::now()).unwrap_or(Duration::ZERO)
    }

    /// Signed offset (in milliseconds) of `now` relative to the start of `slot`: negative
    /// before the slot starts, positive after. Used to evaluate bid-window offsets such as
    /// `-1000`..`+6000` against `now`.
    pub fn offset_from_slot_start_ms(&self, slot: u64, now: SystemTime) -> i64 {
        let slot_start_secs = self.genesis_time as i64 + (slot * self.seconds_per_slot) as i64;
        let now_secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64;
        now_secs - slot_start_secs * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> Clock {
        Clock::new(1_000_000, 12, 32)
    }

    #[test]
    fn test_slot_at_genesis() {
        let clock = clock();
        let now = UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(clock.slot_at(now), 0);
        assert_eq!(clock.offset_in_slot_ms(now), 0);
    }

    #[test]
    fn test_slot_and_epoch_arithmetic() {
        let clock = clock();
        let now = UNIX_EPOCH + Duration::from_secs(1_000_000 + 12 * 100 + 5);
        assert_eq!(clock.slot_at(now), 100);
        assert_eq!(clock.epoch_at(now), 100 / 32);
        assert_eq!(clock.offset_in_slot_ms(now), 5000);
    }

    #[test]
    fn test_offset_from_slot_start_is_signed() {
        let clock = clock();
        let slot_start = UNIX_EPOCH + Duration::from_secs(1_000_000 + 12 * 10);
        let before = slot_start - Duration::from_millis(1000);
        let after = slot_start + Duration::from_millis(500);
        assert_eq!(clock.offset_from_slot_start_ms(10, before), -1000);
        assert_eq!(clock.offset_from_slot_start_ms(10, after), 500);
    }
}
