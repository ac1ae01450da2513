//! Money Conversion Module
//!
//! Conversion between client-facing strings, the `Decimal` values stored in
//! PostgreSQL (`NUMERIC(15,0)`) and the integer amounts sent to the payment
//! gateway. All conversions at the API and gateway boundaries go through here.
//!
//! ## Currency
//! The shop runs in a single currency (Toman) with no minor unit. Amounts are
//! whole numbers; a fractional amount is a client error, never rounded.
//!
//! ## Usage
//! ```rust
//! use permia_core::money::{parse_amount, to_gateway_amount};
//!
//! let amount = parse_amount("80000").unwrap();
//! assert_eq!(to_gateway_amount(amount).unwrap(), 80_000);
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Largest amount the store column can hold (`NUMERIC(15,0)`).
const MAX_AMOUNT: i64 = 999_999_999_999_999;

// ============================================================================
// Error Types
// ============================================================================

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount must be a whole number, got {0}")]
    Fractional(String),

    #[error("Amount too large")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Parse: Client → Internal (String → Decimal)
// ============================================================================

/// Parse a client-provided amount string.
///
/// # Errors
/// * `InvalidFormat` - empty or non-numeric input
/// * `InvalidAmount` - zero or negative
/// * `Fractional` - amount has a non-zero fractional part
/// * `Overflow` - amount exceeds the storage column
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('+') {
        return Err(MoneyError::InvalidFormat(amount_str.to_string()));
    }

    let value = Decimal::from_str(amount_str)
        .map_err(|_| MoneyError::InvalidFormat(amount_str.to_string()))?;

    validate_amount(value)
}

/// Validate an already-parsed amount (e.g. a `Decimal` from JSON).
pub fn validate_amount(value: Decimal) -> Result<Decimal, MoneyError> {
    if value.is_sign_negative() || value.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    if !value.fract().is_zero() {
        return Err(MoneyError::Fractional(value.to_string()));
    }

    if value > Decimal::from(MAX_AMOUNT) {
        return Err(MoneyError::Overflow);
    }

    Ok(value.normalize())
}

// ============================================================================
// Gateway: Decimal → i64
// ============================================================================

/// Convert an amount to the integer unit the payment gateway expects.
///
/// The same conversion is used for request and verify, so an amount that
/// passes here round-trips exactly.
pub fn to_gateway_amount(value: Decimal) -> Result<i64, MoneyError> {
    let value = validate_amount(value)?;
    value.to_i64().ok_or(MoneyError::Overflow)
}

// ============================================================================
// Format: Internal → Client
// ============================================================================

/// Format an amount for display, with thousands separators (`80,000`).
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round();
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount_valid() {
        assert_eq!(parse_amount("80000").unwrap(), dec!(80000));
        assert_eq!(parse_amount(" 150 ").unwrap(), dec!(150));
        assert_eq!(parse_amount("100.000").unwrap(), dec!(100));
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount("0"), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("-5"), Err(MoneyError::InvalidAmount));
        assert!(matches!(parse_amount(""), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("+5"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("abc"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("10.5"), Err(MoneyError::Fractional(_))));
        assert_eq!(
            parse_amount("1000000000000000"),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_gateway_amount_round_trip() {
        let amount = dec!(125000);
        let units = to_gateway_amount(amount).unwrap();
        assert_eq!(units, 125_000);
        assert_eq!(Decimal::from(units), amount);
    }

    #[test]
    fn test_gateway_amount_rejects_fraction() {
        assert!(matches!(
            to_gateway_amount(dec!(1000.5)),
            Err(MoneyError::Fractional(_))
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(0)), "0");
        assert_eq!(format_amount(dec!(999)), "999");
        assert_eq!(format_amount(dec!(80000)), "80,000");
        assert_eq!(format_amount(dec!(1234567)), "1,234,567");
        assert_eq!(format_amount(dec!(-20000)), "-20,000");
    }
}
