//! Simulation scenarios.

use rust_decimal::Decimal;

use crownfx_common::{ConversionRequest, ProductId, TransactionStatus};

/// A predefined conversion scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Plain currency conversion at the reference rate.
    Plain,
    /// Product conversion whose multiplier pushes the rate into the
    /// warning band.
    Product,
    /// Conversion against a rate far from the reference, rejected by the
    /// guard rail.
    Unfavorable,
    /// Conversion involving a currency the exchange does not know.
    UnknownCurrency,
}

impl Scenario {
    /// All scenarios, in run order.
    pub fn all() -> Vec<Scenario> {
        vec![
            Scenario::Plain,
            Scenario::Product,
            Scenario::Unfavorable,
            Scenario::UnknownCurrency,
        ]
    }

    /// Parse a scenario by name.
    pub fn from_name(name: &str) -> Option<Scenario> {
        match name {
            "plain" => Some(Scenario::Plain),
            "product" => Some(Scenario::Product),
            "unfavorable" => Some(Scenario::Unfavorable),
            "unknown-currency" => Some(Scenario::UnknownCurrency),
            _ => None,
        }
    }

    /// Scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Plain => "plain",
            Scenario::Product => "product",
            Scenario::Unfavorable => "unfavorable",
            Scenario::UnknownCurrency => "unknown-currency",
        }
    }

    /// The conversion request this scenario publishes.
    pub fn request(&self) -> ConversionRequest {
        match self {
            // 100 ORO at the 2.5 reference rate: REQUESTED.
            Scenario::Plain => {
                ConversionRequest::currency("ORO", "TIB", Decimal::new(10000, 2))
            }
            // 5 bows at an effective 3.6 rate vs the 2.5 reference: WARNING.
            Scenario::Product => ConversionRequest::product("ORO", "TIB", 5, ProductId::new(3)),
            // TIB→ORO at 1.2 vs the 0.4 reference: NOT_APPROVED.
            Scenario::Unfavorable => {
                ConversionRequest::currency("TIB", "ORO", Decimal::new(5000, 2))
            }
            // XYZ is not a registered currency: failure event.
            Scenario::UnknownCurrency => {
                ConversionRequest::currency("ORO", "XYZ", Decimal::new(1000, 2))
            }
        }
    }

    /// The status the answering event is expected to carry.
    pub fn expected_status(&self) -> TransactionStatus {
        match self {
            Scenario::Plain => TransactionStatus::Requested,
            Scenario::Product => TransactionStatus::Warning,
            Scenario::Unfavorable => TransactionStatus::NotApproved,
            Scenario::UnknownCurrency => TransactionStatus::NotApproved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names_round_trip() {
        for scenario in Scenario::all() {
            assert_eq!(Scenario::from_name(scenario.name()), Some(scenario));
        }
        assert!(Scenario::from_name("nope").is_none());
    }
}
