//! Initiator-side transaction records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crownfx_common::{
    CommandId, CorrelationId, CurrencyCode, ProductId, TransactionId, TransactionStatus,
};
use crownfx_protocol::{ConversionCommand, ConversionEvent};

/// A conversion tracked by the initiating service.
///
/// Created when the command is published and updated when the answering
/// event arrives. The record is owned by this side only; the processing
/// service keeps its own pending-transaction store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Correlation token the answering event must carry.
    pub correlation_id: CorrelationId,
    /// Command this record was created for.
    pub command_id: CommandId,
    /// Transaction ID assigned by the processing side, once known.
    pub transaction_id: Option<TransactionId>,
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,
    /// Quantity from the original request.
    pub original_quantity: Decimal,
    /// Product involved, if any.
    pub product_id: Option<ProductId>,

    /// Current status.
    pub status: TransactionStatus,
    /// Reason reported by the processing side.
    pub reason: Option<String>,
    /// Converted amount from the decision.
    pub converted_amount: Option<Decimal>,
    /// Rate applied to the conversion.
    pub rate: Option<Decimal>,
    /// Risk score from the decision.
    pub risk_score: Option<Decimal>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the record reached a final status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Create a record for a freshly built command.
    pub fn for_command(command: &ConversionCommand) -> Self {
        let now = Utc::now();
        let original_quantity = command
            .quantity_currency
            .or_else(|| command.quantity_product.map(Decimal::from))
            .unwrap_or(Decimal::ZERO);

        Self {
            correlation_id: command.correlation_id,
            command_id: command.command_id,
            transaction_id: command.transaction_id,
            from_currency_code: command.from_currency_code.clone(),
            to_currency_code: command.to_currency_code.clone(),
            original_quantity,
            product_id: command.product_id,
            status: TransactionStatus::Requested,
            reason: None,
            converted_amount: None,
            rate: None,
            risk_score: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Apply the answering event to this record.
    pub fn apply_event(&mut self, event: &ConversionEvent) {
        self.status = event.status;
        self.reason = Some(event.reason.clone());
        self.converted_amount = event.converted_amount;
        self.rate = event.rate;
        self.risk_score = event.risk_score;
        if event.transaction_id.is_some() {
            self.transaction_id = event.transaction_id;
        }
        self.updated_at = Utc::now();
        if self.status.is_final() {
            self.completed_at = Some(self.updated_at);
        }
    }

    /// Mark the record approved (confirmation completed).
    pub fn approve(&mut self) {
        self.status = TransactionStatus::Approved;
        self.updated_at = Utc::now();
        self.completed_at = Some(self.updated_at);
    }

    /// Mark the record rejected.
    pub fn reject(&mut self) {
        self.status = TransactionStatus::NotApproved;
        self.updated_at = Utc::now();
        self.completed_at = Some(self.updated_at);
    }

    /// Check if the record still awaits its answering event or a
    /// confirmation.
    pub fn is_pending(&self) -> bool {
        !self.status.is_final()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crownfx_common::ConversionRequest;
    use rust_decimal_macros::dec;

    fn command() -> ConversionCommand {
        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        ConversionCommand::from_request(&request)
    }

    #[test]
    fn test_record_starts_requested() {
        let record = TransactionRecord::for_command(&command());
        assert_eq!(record.status, TransactionStatus::Requested);
        assert!(record.is_pending());
        assert_eq!(record.original_quantity, dec!(100.00));
        assert!(record.converted_amount.is_none());
    }

    #[test]
    fn test_apply_failure_event_completes_record() {
        let command = command();
        let mut record = TransactionRecord::for_command(&command);

        let event = ConversionEvent::failure(&command, "exchange rate not found for ORO/TIB");
        record.apply_event(&event);

        assert_eq!(record.status, TransactionStatus::NotApproved);
        assert!(!record.is_pending());
        assert!(record.completed_at.is_some());
        assert_eq!(
            record.reason.as_deref(),
            Some("exchange rate not found for ORO/TIB")
        );
    }

    #[test]
    fn test_approve_after_confirmation() {
        let mut record = TransactionRecord::for_command(&command());
        record.approve();
        assert_eq!(record.status, TransactionStatus::Approved);
        assert!(record.completed_at.is_some());
    }
}
