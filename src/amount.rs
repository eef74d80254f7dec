//! Human-readable amount scaling
//!
//! Conversions between UI amounts (`"12.5"` of a 6-decimal mint) and smallest
//! units (`12_500_000`). Decimal text is parsed exactly; floating-point input
//! is first rounded to the mint's decimals in text form so binary float
//! representation never leaks into the integer.

use crate::errors::{AmmError, AmmResult};
use crate::types::FEE_DENOMINATOR;

/// Largest decimal count a `u64` can scale by without immediate overflow
pub const MAX_DECIMALS: u8 = 19;

/// Parse a decimal string into smallest units
pub fn parse_ui_amount(text: &str, decimals: u8) -> AmmResult<u64> {
    if decimals > MAX_DECIMALS {
        return Err(AmmError::invalid_argument(format!(
            "mint decimals {decimals} exceed {MAX_DECIMALS}"
        )));
    }

    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmmError::invalid_argument(format!(
            "'{text}' is not a non-negative decimal amount"
        )));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(AmmError::invalid_argument(format!(
            "'{text}' has more than {decimals} fractional digits"
        )));
    }

    let scale = 10u128.pow(decimals as u32);
    let overflow = || AmmError::FieldOverflow {
        field: "amount",
        value: u128::MAX,
        max: u64::MAX as u128,
    };

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    let total = whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)?;

    u64::try_from(total).map_err(|_| AmmError::FieldOverflow {
        field: "amount",
        value: total,
        max: u64::MAX as u128,
    })
}

/// Scale a floating-point UI amount after rounding it to `decimals` places
pub fn scale_ui_amount(value: f64, decimals: u8) -> AmmResult<u64> {
    if !value.is_finite() || value < 0.0 {
        return Err(AmmError::invalid_argument(format!(
            "{value} is not a non-negative finite amount"
        )));
    }
    let text = format!("{value:.prec$}", prec = decimals as usize);
    parse_ui_amount(&text, decimals)
}

/// Render smallest units as a decimal string without trailing zeros
pub fn format_base_units(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let digits = format!("{amount:0>width$}", width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Parse a fee given as a decimal fraction (`"0.003"`) into parts per million
pub fn parse_fee_rate(text: &str) -> AmmResult<u64> {
    let ppm = parse_ui_amount(text, 6)?;
    if ppm > FEE_DENOMINATOR {
        return Err(AmmError::FieldOverflow {
            field: "fee",
            value: ppm as u128,
            max: FEE_DENOMINATOR as u128,
        });
    }
    Ok(ppm)
}
