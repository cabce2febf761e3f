//! Fixed-point amount conversion between human units and smallest units.

use crate::errors::EngineError;
use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::U256;

/// Convert a human-unit decimal string to a smallest-unit integer.
pub fn to_base_units(human: &str, decimals: u8) -> Result<U256, EngineError> {
    let parsed = parse_units(human.trim(), decimals)
        .map_err(|e| EngineError::Validation(format!("invalid amount {human:?}: {e}")))?;
    Ok(parsed.get_absolute())
}

/// Convert a floating-point human amount (random-mode draws) to smallest
/// units by rendering it at the token's full precision first.
pub fn f64_to_base_units(amount: f64, decimals: u8) -> Result<U256, EngineError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    let rendered = format!("{amount:.prec$}", prec = decimals as usize);
    to_base_units(&rendered, decimals)
}

/// Render a smallest-unit integer in human units.
///
/// Formatting policy: trailing zeros in the fractional part are trimmed, and
/// a bare trailing decimal point is dropped, so `1_500_000` at 6 decimals
/// renders as `"1.5"` and zero renders as `"0"`.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    let rendered = format_units(value, decimals).unwrap_or_else(|_| "0".to_string());
    trim_trailing_zeros(&rendered)
}

fn trim_trailing_zeros(rendered: &str) -> String {
    if !rendered.contains('.') {
        return rendered.to_string();
    }
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_at_six_decimals() {
        let base = to_base_units("1.5", 6).unwrap();
        assert_eq!(base, U256::from(1_500_000u64));
        assert_eq!(from_base_units(base, 6), "1.5");
    }

    #[test]
    fn test_whole_amounts_render_without_fraction() {
        let base = to_base_units("2", 6).unwrap();
        assert_eq!(base, U256::from(2_000_000u64));
        assert_eq!(from_base_units(base, 6), "2");
    }

    #[test]
    fn test_smallest_unit_precision() {
        let base = to_base_units("0.000001", 6).unwrap();
        assert_eq!(base, U256::from(1u64));
        assert_eq!(from_base_units(base, 6), "0.000001");
    }

    #[test]
    fn test_zero_renders_as_bare_zero() {
        assert_eq!(from_base_units(U256::ZERO, 6), "0");
        assert_eq!(from_base_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_invalid_amounts_are_rejected() {
        assert!(to_base_units("abc", 6).is_err());
        assert!(to_base_units("", 6).is_err());
        assert!(f64_to_base_units(f64::NAN, 6).is_err());
        assert!(f64_to_base_units(-1.0, 6).is_err());
        assert!(f64_to_base_units(0.0, 6).is_err());
    }

    #[test]
    fn test_f64_conversion_matches_string_path() {
        assert_eq!(
            f64_to_base_units(0.1, 6).unwrap(),
            to_base_units("0.1", 6).unwrap()
        );
        assert_eq!(f64_to_base_units(2.0, 6).unwrap(), U256::from(2_000_000u64));
    }

    #[test]
    fn test_eighteen_decimal_round_trip() {
        let base = to_base_units("0.25", 18).unwrap();
        assert_eq!(base, U256::from(250_000_000_000_000_000u128));
        assert_eq!(from_base_units(base, 18), "0.25");
    }
}
