//! Currency types and monetary rounding rules.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency code such as `ORO` or `TIB`.
///
/// Codes are normalized to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the code format: 2 to 10 alphabetic characters.
    pub fn is_valid(&self) -> bool {
        (2..=10).contains(&self.0.len()) && self.0.chars().all(|c| c.is_ascii_alphabetic())
    }

    /// Ouro Real, the gold-backed reference currency.
    pub fn oro() -> Self {
        Self::new("ORO")
    }

    /// Tibar, the common trade currency.
    pub fn tib() -> Self {
        Self::new("TIB")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An ordered currency pair for rate lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// Round a monetary amount to 2 decimal places, half-up.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a rate variation to 4 decimal places, half-up.
pub fn round_variation(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_code_normalization() {
        assert_eq!(CurrencyCode::new(" oro ").as_str(), "ORO");
    }

    #[test]
    fn test_code_validation() {
        assert!(CurrencyCode::new("ORO").is_valid());
        assert!(CurrencyCode::new("TIBARES").is_valid());
        assert!(!CurrencyCode::new("X").is_valid());
        assert!(!CurrencyCode::new("OR0").is_valid());
        assert!(!CurrencyCode::new("").is_valid());
    }

    #[test]
    fn test_pair_display_and_inverse() {
        let pair = CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib());
        assert_eq!(pair.to_string(), "ORO/TIB");
        assert_eq!(pair.inverse().to_string(), "TIB/ORO");
    }

    #[test]
    fn test_round_amount_half_up() {
        assert_eq!(round_amount(dec!(249.995)), dec!(250.00));
        assert_eq!(round_amount(dec!(249.994)), dec!(249.99));
    }

    #[test]
    fn test_round_variation() {
        assert_eq!(round_variation(dec!(-0.40004)), dec!(-0.4000));
        assert_eq!(round_variation(dec!(0.12345)), dec!(0.1235));
    }
}
