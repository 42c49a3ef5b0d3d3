//! Initiator-side transaction ledger.

use dashmap::DashMap;
use tracing::debug;

use crownfx_common::{CorrelationId, TransactionId};
use crownfx_protocol::ConversionEvent;

use crate::record::TransactionRecord;

/// Lookup table of transaction records, keyed by correlation ID with a
/// secondary index by transaction ID.
pub struct TransactionLedger {
    records: DashMap<CorrelationId, TransactionRecord>,
    by_transaction: DashMap<TransactionId, CorrelationId>,
}

impl TransactionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_transaction: DashMap::new(),
        }
    }

    /// Insert a new record.
    pub fn insert(&self, record: TransactionRecord) {
        if let Some(transaction_id) = record.transaction_id {
            self.by_transaction
                .insert(transaction_id, record.correlation_id);
        }
        self.records.insert(record.correlation_id, record);
    }

    /// Fetch a record by correlation ID.
    pub fn by_correlation(&self, correlation_id: &CorrelationId) -> Option<TransactionRecord> {
        self.records.get(correlation_id).map(|r| r.clone())
    }

    /// Fetch a record by the transaction ID assigned by the processor.
    pub fn by_transaction(&self, transaction_id: &TransactionId) -> Option<TransactionRecord> {
        self.by_transaction
            .get(transaction_id)
            .and_then(|correlation_id| self.by_correlation(&correlation_id))
    }

    /// Apply an event to its matching record.
    ///
    /// Returns the updated record, or `None` when no record matches the
    /// event's correlation ID.
    pub fn update_from_event(&self, event: &ConversionEvent) -> Option<TransactionRecord> {
        let mut record = self.records.get_mut(&event.correlation_id)?;
        record.apply_event(event);

        if let Some(transaction_id) = record.transaction_id {
            self.by_transaction
                .insert(transaction_id, record.correlation_id);
        }

        debug!(
            correlation_id = %event.correlation_id,
            status = %record.status,
            "Transaction record updated from event"
        );
        Some(record.clone())
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records still awaiting their answering event or a confirmation.
    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.records
            .iter()
            .filter(|r| r.is_pending())
            .map(|r| r.clone())
            .collect()
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}
