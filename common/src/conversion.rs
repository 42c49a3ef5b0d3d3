//! Conversion request and decision value types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, CurrencyPair, KingdomId, ProductId, TransactionId, TransactionStatus};

/// Immutable input for one conversion.
///
/// A request either carries a currency amount (`quantity_currency`) or a
/// product count (`quantity_product` plus `product_id`); the strategy set
/// dispatches on the presence of a positive product ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,
    /// Currency amount to convert (currency-only conversions).
    pub quantity_currency: Option<Decimal>,
    /// Product count to convert (product conversions).
    pub quantity_product: Option<u32>,
    /// Product whose specific rate and multipliers apply.
    pub product_id: Option<ProductId>,
    /// Kingdom whose quality rate and owner bonus apply.
    pub kingdom_id: Option<KingdomId>,
    /// Date the conversion should be valued at.
    pub conversion_date: Option<NaiveDate>,
    /// Transaction this request belongs to, when initiated from a
    /// pre-existing transaction record.
    pub transaction_id: Option<TransactionId>,
}

impl ConversionRequest {
    /// Create a currency-only conversion request.
    pub fn currency(
        from: impl Into<CurrencyCode>,
        to: impl Into<CurrencyCode>,
        amount: Decimal,
    ) -> Self {
        Self {
            from_currency_code: from.into(),
            to_currency_code: to.into(),
            quantity_currency: Some(amount),
            quantity_product: None,
            product_id: None,
            kingdom_id: None,
            conversion_date: None,
            transaction_id: None,
        }
    }

    /// Create a product conversion request.
    pub fn product(
        from: impl Into<CurrencyCode>,
        to: impl Into<CurrencyCode>,
        quantity: u32,
        product_id: ProductId,
    ) -> Self {
        Self {
            from_currency_code: from.into(),
            to_currency_code: to.into(),
            quantity_currency: None,
            quantity_product: Some(quantity),
            product_id: Some(product_id),
            kingdom_id: None,
            conversion_date: None,
            transaction_id: None,
        }
    }

    /// Attach a kingdom context.
    pub fn with_kingdom(mut self, kingdom_id: KingdomId) -> Self {
        self.kingdom_id = Some(kingdom_id);
        self
    }

    /// Value the conversion at a specific date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.conversion_date = Some(date);
        self
    }

    /// Attach an originating transaction ID.
    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    /// The currency pair this request converts across.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(
            self.from_currency_code.clone(),
            self.to_currency_code.clone(),
        )
    }

    /// Check if the request targets the product conversion path.
    pub fn is_product_conversion(&self) -> bool {
        self.product_id.map(|p| p.is_present()).unwrap_or(false)
    }
}

/// The outcome of one conversion, produced exactly once per request and
/// immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionDecision {
    /// Converted amount, rounded to 2 decimal places.
    pub converted_amount: Decimal,
    /// The rate actually applied, after any product multiplier.
    pub applied_rate: Decimal,
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,

    /// Guard-rail classification.
    pub status: TransactionStatus,
    /// Human-readable reason for the classification.
    pub reason: String,
    /// Risk score in [0, 1].
    pub risk_score: Decimal,
    /// Warnings raised by the guard rail.
    pub warnings: Vec<String>,
    /// Recommended follow-up actions.
    pub recommendations: Vec<String>,
    /// Whether the conversion may be executed.
    pub can_proceed: bool,
    /// Whether an explicit approval step is still required.
    pub requires_approval: bool,

    /// Pending transaction created for `REQUESTED` decisions.
    pub transaction_id: Option<TransactionId>,
    /// Expiry of the pending transaction, when one was created.
    pub expires_at: Option<DateTime<Utc>>,
    /// Confirmation endpoint for the pending transaction.
    pub confirmation_url: Option<String>,
}

impl ConversionDecision {
    /// Build a terminal `NOT_APPROVED` decision carrying a reason.
    ///
    /// Used when no strategy claims a request; this is a reportable
    /// outcome, not a processing failure.
    pub fn not_approved(
        from: CurrencyCode,
        to: CurrencyCode,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            converted_amount: Decimal::ZERO,
            applied_rate: Decimal::ZERO,
            from_currency_code: from,
            to_currency_code: to,
            status: TransactionStatus::NotApproved,
            reason: reason.clone(),
            risk_score: Decimal::ZERO,
            warnings: vec![reason],
            recommendations: vec!["check the conversion parameters".to_string()],
            can_proceed: false,
            requires_approval: false,
            transaction_id: None,
            expires_at: None,
            confirmation_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_shapes() {
        let currency = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        assert!(!currency.is_product_conversion());
        assert_eq!(currency.pair().to_string(), "ORO/TIB");

        let product = ConversionRequest::product("ORO", "TIB", 5, ProductId::new(3));
        assert!(product.is_product_conversion());
    }

    #[test]
    fn test_zero_product_id_is_not_product_conversion() {
        let mut request = ConversionRequest::currency("ORO", "TIB", dec!(10));
        request.product_id = Some(ProductId::new(0));
        assert!(!request.is_product_conversion());
    }

    #[test]
    fn test_not_approved_decision() {
        let decision = ConversionDecision::not_approved(
            CurrencyCode::oro(),
            CurrencyCode::tib(),
            "no conversion strategy available for the given parameters",
        );
        assert_eq!(decision.status, TransactionStatus::NotApproved);
        assert!(!decision.can_proceed);
        assert!(decision.transaction_id.is_none());
    }
}
