//! Display formatting for balances, prices and percentages.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Converts an integer subunit amount into its decimal display value.
pub fn from_subunits(subunits: u64, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(subunits as i128, decimals)
}

/// Converts a decimal amount into integer subunits, truncating anything
/// below the smallest unit. Negative amounts map to zero; amounts that do
/// not fit in a `u64` once scaled give `None`.
pub fn to_subunits(amount: Decimal, decimals: u32) -> Option<u64> {
    if amount.is_sign_negative() {
        return Some(0);
    }
    let unit = Decimal::from(10u64.checked_pow(decimals)?);
    amount.checked_mul(unit)?.trunc().to_u64()
}

/// Rounds half away from zero and always prints `dp` fraction digits.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Balance of a coin with `decimals` places, shown with two fraction digits.
pub fn format_balance(subunits: u64, decimals: u32) -> String {
    fixed(from_subunits(subunits, decimals), 2)
}

/// Balance with four fraction digits, as on the account page.
pub fn format_balance_detail(subunits: u64, decimals: u32) -> String {
    fixed(from_subunits(subunits, decimals), 4)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// `1234.5` -> `1,234.50`
pub fn format_number(value: Decimal) -> String {
    let text = fixed(value.abs(), 2);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// `2145` -> `2,145`
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// `-1234.5` -> `-$1,234.50`
pub fn format_currency(value: Decimal) -> String {
    let body = format_number(value.abs());
    if value.is_sign_negative() && !value.is_zero() {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Positive values carry an explicit `+`.
pub fn format_percentage(value: Decimal) -> String {
    let sign = if value > Decimal::ZERO { "+" } else { "" };
    format!("{}{}%", sign, fixed(value, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn native_coin_balance_has_two_decimals() {
        assert_eq!(format_balance(123_456_789, 8), "1.23");
        assert_eq!(format_balance(0, 8), "0.00");
        assert_eq!(format_balance(100_000_000, 8), "1.00");
    }

    #[test]
    fn stablecoin_balance_uses_six_decimals() {
        assert_eq!(format_balance(10_000_000, 6), "10.00");
        assert_eq!(format_balance(4_995_000, 6), "5.00");
    }

    #[test]
    fn detail_balance_has_four_decimals() {
        assert_eq!(format_balance_detail(123_456_789, 8), "1.2346");
        assert_eq!(format_balance_detail(0, 8), "0.0000");
    }

    #[test]
    fn counts_are_grouped() {
        assert_eq!(format_count(856), "856");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn to_subunits_truncates() {
        assert_eq!(to_subunits(dec!(300.1234567), 6), Some(300_123_456));
        assert_eq!(to_subunits(dec!(5), 6), Some(5_000_000));
        assert_eq!(to_subunits(dec!(-1), 6), Some(0));
    }

    #[test]
    fn to_subunits_rejects_amounts_too_large_to_scale() {
        assert_eq!(to_subunits(dec!(100000000000000000000000), 6), None);
        assert_eq!(to_subunits(Decimal::MAX, 6), None);
        // Scales fine but does not fit a u64
        assert_eq!(to_subunits(dec!(100000000000000), 6), None);
    }

    #[test]
    fn numbers_are_grouped() {
        assert_eq!(format_number(dec!(1234.5)), "1,234.50");
        assert_eq!(format_number(dec!(999)), "999.00");
        assert_eq!(format_number(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_number(dec!(-1000)), "-1,000.00");
    }

    #[test]
    fn currency_and_percentage() {
        assert_eq!(format_currency(dec!(68251.23)), "$68,251.23");
        assert_eq!(format_currency(dec!(-23.14)), "-$23.14");
        assert_eq!(format_percentage(dec!(9.45)), "+9.45%");
        assert_eq!(format_percentage(dec!(-0.87)), "-0.87%");
        assert_eq!(format_percentage(Decimal::ZERO), "0.00%");
    }
}
