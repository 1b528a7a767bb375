//! Conversions between the value denominations this codebase moves between: Gwei (the
//! convention used internally and by the Beacon Builder API), wei (the Engine API and on-chain
//! convention), and a decimal ETH string for display.

const WEI_PER_GWEI: u128 = 1_000_000_000;
const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

pub fn gwei_to_wei(gwei: u128) -> u128 {
    gwei * WEI_PER_GWEI
}

/// Renders a wei amount as a decimal ETH string with exactly 18 fractional digits, e.g.
/// `wei_to_eth(1_500_000_000_000_000_000)` is `"1.500000000000000000"`. Uses integer
/// division/remainder rather than `f64` so large values don't lose precision.
pub fn wei_to_eth(wei: u128) -> String {
    let whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    format!("{whole}.{frac:018}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gwei_to_wei_scales_by_1e9() {
        assert_eq!(gwei_to_wei(1), WEI_PER_GWEI);
        assert_eq!(gwei_to_wei(1_000_000), 1_000_000_000_000_000);
    }

    #[test]
    fn test_wei_to_eth_has_exactly_18_fractional_digits() {
        let s = wei_to_eth(1_500_000_000_000_000_000);
        let (_, frac) = s.split_once('.').expect("has a decimal point");
        assert_eq!(frac.len(), 18);
        assert_eq!(s, "1.500000000000000000");
    }

    #[test]
    fn test_wei_to_eth_zero() {
        assert_eq!(wei_to_eth(0), "0.000000000000000000");
    }

    #[test]
    fn test_wei_to_eth_large_value_keeps_precision() {
        // not representable exactly as an f64 without rounding
        let wei = 123_456_789_012_345_678_901_234u128;
        let s = wei_to_eth(wei);
        assert_eq!(s, "123456.789012345678901234");
    }
}
