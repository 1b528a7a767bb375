use serde::Deserialize;
use thiserror::Error;

/// All offsets are milliseconds relative to slot start; negative values land before the slot
/// begins. Validated once at startup so a misconfigured window surfaces immediately rather than
/// silently producing a bidder that never bids.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub build_start_time_ms: i64,
    pub bid_start_time_ms: i64,
    pub bid_end_time_ms: i64,
    pub reveal_time_ms: i64,
    pub bid_min_amount: u128,
    pub bid_increase: u128,
    pub bid_interval_ms: u64,
    pub payload_build_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_start_time_ms: -1000,
            bid_start_time_ms: 0,
            bid_end_time_ms: 6000,
            reveal_time_ms: 8000,
            bid_min_amount: 0,
            bid_increase: 1,
            bid_interval_ms: 500,
            payload_build_delay_ms: 200,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bid_start_time_ms ({bid_start}) must not be after bid_end_time_ms ({bid_end})")]
    BidWindowInverted { bid_start: i64, bid_end: i64 },
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bid_start_time_ms > self.bid_end_time_ms {
            return Err(ValidationError::BidWindowInverted {
                bid_start: self.bid_start_time_ms,
                bid_end: self.bid_end_time_ms,
            })
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_bid_window_rejected() {
        let config = Config { bid_start_time_ms: 100, bid_end_time_ms: 50, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
