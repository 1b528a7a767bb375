use serde::Deserialize;

/// Amounts are denominated in Gwei, matching deposit contract conventions and `BuilderState`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub deposit_amount_gwei: u64,
    pub topup_threshold_gwei: u64,
    pub topup_amount_gwei: u64,
    #[serde(default = "default_deposit_gas_limit")]
    pub deposit_gas_limit: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_registration_retry_secs")]
    pub registration_retry_secs: u64,
    #[serde(default = "default_balance_monitor_interval_secs")]
    pub balance_monitor_interval_secs: u64,
}

fn default_deposit_gas_limit() -> u64 {
    400_000
}

fn default_receipt_timeout_secs() -> u64 {
    300
}

fn default_registration_retry_secs() -> u64 {
    30
}

fn default_balance_monitor_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_with_defaults() {
        let toml = r#"
            deposit_amount_gwei = 32000000000
            topup_threshold_gwei = 1000000000
            topup_amount_gwei = 2000000000
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.deposit_gas_limit, 400_000);
        assert_eq!(config.balance_monitor_interval_secs, 60);
    }
}
