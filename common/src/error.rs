//! Error taxonomy shared across the CrownFX services.

use crate::{CurrencyCode, CurrencyPair};
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for CrownFX operations.
///
/// Validation failures are rejected before any rate lookup runs. Not-found
/// errors surface as 404-equivalents on a synchronous path and are turned
/// into `NOT_APPROVED` events on the asynchronous path. A guard-rail
/// rejection is *not* an error: it is a normal terminal decision.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Invalid request content, rejected before any lookup.
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// No active currency registered under the given code.
    #[error("Active currency not found: {0}")]
    CurrencyNotFound(CurrencyCode),

    /// No active exchange rate for the currency pair.
    #[error("Exchange rate not found for {0}")]
    RateNotFound(CurrencyPair),

    /// An active rate already exists for the pair and effective date.
    #[error("Active exchange rate already exists for {pair} on {effective_date}")]
    RateAlreadyExists {
        pair: CurrencyPair,
        effective_date: NaiveDate,
    },

    /// No active product-specific rate for the product and pair.
    #[error("Product exchange rate not found: product {product_id}, {pair}")]
    ProductRateNotFound { product_id: i64, pair: CurrencyPair },

    /// Unknown product.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Unknown kingdom.
    #[error("Kingdom not found: {0}")]
    KingdomNotFound(i64),

    /// Pending transaction missing or expired.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Currency already registered.
    #[error("Currency already exists: {0}")]
    CurrencyAlreadyExists(CurrencyCode),

    /// Broker publish or consume failure.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Message could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    /// Check if this error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExchangeError::CurrencyNotFound(_)
                | ExchangeError::RateNotFound(_)
                | ExchangeError::ProductRateNotFound { .. }
                | ExchangeError::ProductNotFound(_)
                | ExchangeError::KingdomNotFound(_)
                | ExchangeError::TransactionNotFound(_)
        )
    }

    /// Get a stable error code for responses and events.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExchangeError::Validation { .. } => "VALIDATION_ERROR",
            ExchangeError::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            ExchangeError::RateNotFound(_) => "RATE_NOT_FOUND",
            ExchangeError::RateAlreadyExists { .. } => "RATE_ALREADY_EXISTS",
            ExchangeError::ProductRateNotFound { .. } => "PRODUCT_RATE_NOT_FOUND",
            ExchangeError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            ExchangeError::KingdomNotFound(_) => "KINGDOM_NOT_FOUND",
            ExchangeError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            ExchangeError::CurrencyAlreadyExists(_) => "CURRENCY_ALREADY_EXISTS",
            ExchangeError::Broker(_) => "BROKER_ERROR",
            ExchangeError::Serialization(_) => "SERIALIZATION_ERROR",
            ExchangeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shortcut for a validation error with a field hint.
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        ExchangeError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// Result type alias for CrownFX operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;
