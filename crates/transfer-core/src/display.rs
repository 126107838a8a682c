//! Base-unit amounts rendered for people.
//!
//! Amounts stay in `U256` everywhere else; these helpers are the only place
//! they become decimals or floats.

use alloy_primitives::U256;

/// Render `amount` base units as a decimal string with trailing zeros
/// trimmed, e.g. `1500000` with 6 decimals is `"1.5"`.
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let digits = amount.to_string();
    let decimals = decimals as usize;

    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Approximate `amount` as a float in whole units. Precision loss is
/// acceptable here; never feed the result back into a transaction.
pub fn to_display_f64(amount: U256, decimals: u8) -> f64 {
    format_units(amount, decimals).parse().unwrap_or(f64::MAX)
}

/// `gas * price_per_gas` wei as a float in whole native units.
pub fn fee_to_display(gas: u64, price_per_gas: u128, decimals: u8) -> f64 {
    let fee = U256::from(gas).saturating_mul(U256::from(price_per_gas));
    to_display_f64(fee, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(format_units(one_eth, 18), "1");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u64), 9), "0.000000001");
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn display_float() {
        assert_eq!(to_display_f64(U256::from(2_500_000_000u64), 9), 2.5);
    }

    #[test]
    fn fee_display() {
        // 21000 gas at 1 gwei = 0.000021 ETH
        let fee = fee_to_display(21_000, 1_000_000_000, 18);
        assert!((fee - 0.000021).abs() < 1e-12);
    }

    #[test]
    fn huge_amounts_do_not_panic() {
        let text = format_units(U256::MAX, 18);
        assert!(text.contains('.'));
        assert!(to_display_f64(U256::MAX, 18) > 1e50);
    }
}
