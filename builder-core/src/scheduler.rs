use serde::Deserialize;

/// Pure eligibility policy: given the configured `mode` and the current slot, decide whether
/// this builder should attempt to bid. Ineligibility is silent -- callers simply skip bidding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    All,
    EveryNth,
    NextN,
}

impl Default for ScheduleMode {
    fn default() -> Self {
        Self::All
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: ScheduleMode,
    pub every_nth: Option<u64>,
    pub next_n: Option<u64>,
    pub start_slot: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    config: Config,
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Is this builder eligible to bid for `slot`?
    pub fn is_eligible(&self, slot: u64) -> bool {
        if let Some(start_slot) = self.config.start_slot {
            if slot < start_slot {
                return false
            }
        }

        match self.config.mode {
            ScheduleMode::All => true,
            ScheduleMode::EveryNth => {
                let n = self.config.every_nth.unwrap_or(1).max(1);
                let start = self.config.start_slot.unwrap_or(0);
                (slot - start) % n == 0
            }
            ScheduleMode::NextN => {
                let start = self.config.start_slot.unwrap_or(slot);
                let n = self.config.next_n.unwrap_or(0);
                slot >= start && slot < start + n
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_mode_is_always_eligible() {
        let scheduler = Scheduler::new(Config { mode: ScheduleMode::All, ..Default::default() });
        assert!(scheduler.is_eligible(0));
        assert!(scheduler.is_eligible(12345));
    }

    #[test]
    fn test_every_nth_with_start_slot() {
        let scheduler = Scheduler::new(Config {
            mode: ScheduleMode::EveryNth,
            every_nth: Some(3),
            start_slot: Some(10),
            ..Default::default()
        });
        assert!(!scheduler.is_eligible(9));
        assert!(scheduler.is_eligible(10));
        assert!(!scheduler.is_eligible(11));
        assert!(!scheduler.is_eligible(12));
        assert!(scheduler.is_eligible(13));
        assert!(scheduler.is_eligible(16));
    }

    #[test]
    fn test_next_n_disables_after_window() {
        let scheduler = Scheduler::new(Config {
            mode: ScheduleMode::NextN,
            next_n: Some(5),
            start_slot: Some(100),
            ..Default::default()
        });
        assert!(!scheduler.is_eligible(99));
        assert!(scheduler.is_eligible(100));
        assert!(scheduler.is_eligible(104));
        assert!(!scheduler.is_eligible(105));
    }
}
