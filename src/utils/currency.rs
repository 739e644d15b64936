/// Currency utility functions for handling Naira conversions
///
/// All monetary values in the database are stored in kobo (1 Naira = 100 kobo)
/// to avoid floating-point precision issues.
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;

use crate::error::{ErrorMessage, HttpError};

/// Convert kobo to Naira (divide by 100)
pub fn kobo_to_naira(kobo: i64) -> f64 {
    kobo as f64 / 100.0
}

/// Format kobo as Naira string with 2 decimal places
pub fn format_kobo_as_naira(kobo: i64) -> String {
    format!("₦{:.2}", kobo_to_naira(kobo))
}

/// Parse a user-supplied amount string into kobo.
///
/// Thousands separators are stripped before parsing, so "10,000.00" and
/// "10000" both resolve to 1_000_000 kobo. Rejects non-numeric input and
/// non-positive amounts before any payment row is created.
pub fn parse_amount_to_kobo(amount_str: &str) -> Result<i64, HttpError> {
    let cleaned = amount_str.trim().replace(',', "");

    let amount = BigDecimal::from_str(&cleaned)
        .map_err(|_| HttpError::bad_request(ErrorMessage::InvalidAmount.to_string()))?;

    let kobo = (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::InvalidAmount.to_string()))?;

    if kobo <= 0 {
        return Err(HttpError::bad_request("Amount must be greater than zero"));
    }

    Ok(kobo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kobo_to_naira() {
        assert_eq!(kobo_to_naira(10000), 100.0);
        assert_eq!(kobo_to_naira(50), 0.50);
        assert_eq!(kobo_to_naira(12345), 123.45);
    }

    #[test]
    fn test_format_kobo_as_naira() {
        assert_eq!(format_kobo_as_naira(10000), "₦100.00");
        assert_eq!(format_kobo_as_naira(50), "₦0.50");
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_amount_to_kobo("10,000.00").unwrap(), 1_000_000);
        assert_eq!(parse_amount_to_kobo("1,234,567.89").unwrap(), 123_456_789);
    }

    #[test]
    fn parses_plain_amounts() {
        assert_eq!(parse_amount_to_kobo("100.00").unwrap(), 10000);
        assert_eq!(parse_amount_to_kobo("0.50").unwrap(), 50);
        assert_eq!(parse_amount_to_kobo(" 250 ").unwrap(), 25000);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_amount_to_kobo("abc").is_err());
        assert!(parse_amount_to_kobo("").is_err());
        assert!(parse_amount_to_kobo("-100").is_err());
        assert!(parse_amount_to_kobo("0").is_err());
    }
}
