//! Protocol message types.
//!
//! These types form the correlation envelope of the conversion saga:
//! the initiator publishes a `ConversionCommand` with fresh identifiers,
//! and the processor answers with a `ConversionEvent` that carries the
//! same `command_id`/`correlation_id` pair plus the full decision.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crownfx_common::{
    CommandId, ConversionDecision, ConversionRequest, CorrelationId, CurrencyCode, KingdomId,
    ProductId, TransactionId, TransactionStatus,
};

/// Topic carrying conversion commands from initiator to processor.
pub const CONVERSION_COMMAND_TOPIC: &str = "conversion-commands";

/// Topic carrying conversion result events from processor to initiator.
pub const CONVERSION_EVENT_TOPIC: &str = "conversion-events";

/// Command requesting a conversion from the processing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionCommand {
    /// Unique command ID, generated by the initiator.
    pub command_id: CommandId,
    /// Correlation token echoed on the resulting event.
    pub correlation_id: CorrelationId,
    /// When the command was built.
    pub timestamp: DateTime<Utc>,
    /// Originating transaction, if the initiator already holds one.
    pub transaction_id: Option<TransactionId>,
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,
    /// Product count (product conversions).
    pub quantity_product: Option<u32>,
    /// Currency amount (currency-only conversions).
    pub quantity_currency: Option<Decimal>,
    /// Product whose specific rate applies.
    pub product_id: Option<ProductId>,
    /// Kingdom context for quality and owner multipliers.
    pub kingdom_id: Option<KingdomId>,
    /// Date the conversion should be valued at.
    pub conversion_date: Option<NaiveDate>,
}

impl ConversionCommand {
    /// Build a command from a conversion request, with fresh identifiers.
    pub fn from_request(request: &ConversionRequest) -> Self {
        Self {
            command_id: CommandId::new(),
            correlation_id: CorrelationId::new(),
            timestamp: Utc::now(),
            transaction_id: request.transaction_id,
            from_currency_code: request.from_currency_code.clone(),
            to_currency_code: request.to_currency_code.clone(),
            quantity_product: request.quantity_product,
            quantity_currency: request.quantity_currency,
            product_id: request.product_id,
            kingdom_id: request.kingdom_id,
            conversion_date: request.conversion_date,
        }
    }

    /// Convert back into the engine-facing request shape.
    ///
    /// Validation is deferred to the conversion pipeline.
    pub fn to_request(&self) -> ConversionRequest {
        ConversionRequest {
            from_currency_code: self.from_currency_code.clone(),
            to_currency_code: self.to_currency_code.clone(),
            quantity_currency: self.quantity_currency,
            quantity_product: self.quantity_product,
            product_id: self.product_id,
            kingdom_id: self.kingdom_id,
            conversion_date: self.conversion_date,
            transaction_id: self.transaction_id,
        }
    }

    /// Partitioning key: commands sharing a correlation ID stay ordered.
    pub fn partition_key(&self) -> String {
        self.correlation_id.to_string()
    }
}

/// Event carrying the result of a processed conversion command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionEvent {
    /// Unique event ID.
    pub event_id: Uuid,
    /// The command this event answers.
    pub command_id: CommandId,
    /// Correlation token copied unchanged from the command.
    pub correlation_id: CorrelationId,
    /// Pending transaction created by the processor, if any.
    pub transaction_id: Option<TransactionId>,

    /// Converted amount (absent on failure events).
    pub converted_amount: Option<Decimal>,
    /// Rate applied to the conversion.
    pub rate: Option<Decimal>,
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,

    /// Guard-rail classification.
    pub status: TransactionStatus,
    /// Reason for the classification or the failure message.
    pub reason: String,
    /// Risk score in [0, 1] (absent on failure events).
    pub risk_score: Option<Decimal>,
    /// Warnings raised by the guard rail.
    pub warnings: Vec<String>,
    /// Recommended follow-up actions.
    pub recommendations: Vec<String>,
    /// Whether the conversion may be executed.
    pub can_proceed: bool,
    /// Whether an explicit approval step is still required.
    pub requires_approval: bool,

    /// When the processor finished the decision.
    pub processed_at: DateTime<Utc>,
    /// Expiry of the pending transaction, when one was created.
    pub expires_at: Option<DateTime<Utc>>,
    /// Confirmation endpoint for the pending transaction.
    pub confirmation_url: Option<String>,
}

impl ConversionEvent {
    /// Build a success event from a computed decision.
    pub fn from_decision(command: &ConversionCommand, decision: &ConversionDecision) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            command_id: command.command_id,
            correlation_id: command.correlation_id,
            transaction_id: decision.transaction_id.or(command.transaction_id),
            converted_amount: Some(decision.converted_amount),
            rate: Some(decision.applied_rate),
            from_currency_code: decision.from_currency_code.clone(),
            to_currency_code: decision.to_currency_code.clone(),
            status: decision.status,
            reason: decision.reason.clone(),
            risk_score: Some(decision.risk_score),
            warnings: decision.warnings.clone(),
            recommendations: decision.recommendations.clone(),
            can_proceed: decision.can_proceed,
            requires_approval: decision.requires_approval,
            processed_at: Utc::now(),
            expires_at: decision.expires_at,
            confirmation_url: decision.confirmation_url.clone(),
        }
    }

    /// Build a failure event from an error message.
    ///
    /// Processing failures never surface as transport errors; they are
    /// reported back as `NOT_APPROVED` events.
    pub fn failure(command: &ConversionCommand, reason: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            command_id: command.command_id,
            correlation_id: command.correlation_id,
            transaction_id: command.transaction_id,
            converted_amount: None,
            rate: None,
            from_currency_code: command.from_currency_code.clone(),
            to_currency_code: command.to_currency_code.clone(),
            status: TransactionStatus::NotApproved,
            reason: reason.into(),
            risk_score: None,
            warnings: Vec::new(),
            recommendations: Vec::new(),
            can_proceed: false,
            requires_approval: false,
            processed_at: Utc::now(),
            expires_at: None,
            confirmation_url: None,
        }
    }

    /// Partitioning key, matching the command's.
    pub fn partition_key(&self) -> String {
        self.correlation_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_command() -> ConversionCommand {
        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        ConversionCommand::from_request(&request)
    }

    #[test]
    fn test_command_round_trip_via_request() {
        let command = sample_command();
        let request = command.to_request();
        assert_eq!(request.from_currency_code, CurrencyCode::oro());
        assert_eq!(request.quantity_currency, Some(dec!(100.00)));
        assert!(request.product_id.is_none());
    }

    #[test]
    fn test_failure_event_echoes_identifiers() {
        let command = sample_command();
        let event = ConversionEvent::failure(&command, "exchange rate not found for ORO/TIB");

        assert_eq!(event.command_id, command.command_id);
        assert_eq!(event.correlation_id, command.correlation_id);
        assert_eq!(event.status, TransactionStatus::NotApproved);
        assert!(!event.can_proceed);
        assert!(event.converted_amount.is_none());
    }

    #[test]
    fn test_wire_format_uses_screaming_snake_case_status() {
        let command = sample_command();
        let event = ConversionEvent::failure(&command, "boom");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"status\":\"NOT_APPROVED\""));
    }

    #[test]
    fn test_commands_get_fresh_identifiers() {
        let a = sample_command();
        let b = sample_command();
        assert_ne!(a.command_id, b.command_id);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
