//! Amount parsing and local pre-transaction validation.
//!
//! Financial operations validate here before any chain client is contacted:
//! an amount must be a positive decimal parseable into wei, and a withdraw
//! must not exceed the last-known balance snapshot.

use ethers::types::U256;
use ethers::utils::{format_units, parse_ether};

use crate::error::{Error, Result};

pub fn format_ether(wei: U256) -> String {
    format_units(wei, "ether").unwrap_or_else(|_| "0.0".to_string())
}

/// Parse a user-entered decimal ether amount into wei.
///
/// Rejects empty, non-numeric, negative, and zero input with `InvalidAmount`.
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got '{trimmed}'"
        )));
    }
    let wei = parse_ether(trimmed)
        .map_err(|e| Error::InvalidAmount(format!("'{trimmed}': {e}")))?;
    if wei.is_zero() {
        return Err(Error::InvalidAmount("amount must be positive".to_string()));
    }
    Ok(wei)
}

/// Validate a withdraw amount against the last-known balance snapshot.
pub fn validate_withdraw(input: &str, last_known: U256) -> Result<U256> {
    let wei = parse_amount(input)?;
    if wei > last_known {
        return Err(Error::InvalidAmount(format!(
            "cannot withdraw {} ETH, balance is {} ETH",
            format_ether(wei),
            format_ether(last_known)
        )));
    }
    Ok(wei)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64.pow(18))
    }

    // ==================== parse_amount tests ====================

    #[test]
    fn test_parse_amount_one_eth() {
        assert_eq!(parse_amount("1").unwrap(), eth(1));
    }

    #[test]
    fn test_parse_amount_fractional() {
        let result = parse_amount("0.5").unwrap();
        assert_eq!(result, U256::from(5u64) * U256::from(10u64.pow(17)));
    }

    #[test]
    fn test_parse_amount_with_whitespace() {
        let result = parse_amount("  1.5  ").unwrap();
        assert_eq!(result, U256::from(15u64) * U256::from(10u64.pow(17)));
    }

    #[test]
    fn test_parse_amount_high_precision() {
        // String parsing preserves the full 18 decimals.
        let result = parse_amount("0.123456789012345678").unwrap();
        assert_eq!(result, U256::from(123456789012345678u64));
    }

    #[test]
    fn test_parse_amount_empty_fails() {
        assert!(matches!(parse_amount(""), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("   "), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_amount_zero_fails() {
        assert!(matches!(parse_amount("0"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("0.0"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_amount_negative_fails() {
        assert!(matches!(parse_amount("-1"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_amount_non_numeric_fails() {
        assert!(matches!(parse_amount("abc"), Err(Error::InvalidAmount(_))));
    }

    // ==================== validate_withdraw tests ====================

    #[test]
    fn test_validate_withdraw_within_balance() {
        assert_eq!(validate_withdraw("1", eth(2)).unwrap(), eth(1));
    }

    #[test]
    fn test_validate_withdraw_exact_balance_succeeds() {
        assert_eq!(validate_withdraw("2", eth(2)).unwrap(), eth(2));
    }

    #[test]
    fn test_validate_withdraw_over_balance_fails() {
        let err = validate_withdraw("3", eth(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_validate_withdraw_against_zero_snapshot_fails() {
        let err = validate_withdraw("0.001", U256::zero()).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    // ==================== format_ether tests ====================

    #[test]
    fn test_format_ether_one_eth() {
        assert_eq!(format_ether(eth(1)), "1.000000000000000000");
    }

    #[test]
    fn test_format_ether_zero() {
        assert_eq!(format_ether(U256::zero()), "0.000000000000000000");
    }
}
