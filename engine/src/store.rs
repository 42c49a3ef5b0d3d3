//! Time-bound store for conversions awaiting confirmation.
//!
//! Every entry is written with a fixed TTL (30 minutes in production).
//! Expiry is enforced on read: an expired entry behaves exactly like a
//! key that never existed.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crownfx_common::{
    constants, is_expired, ConversionDecision, ConversionRequest, CurrencyCode,
    ProductId, TransactionId, TransactionStatus,
};

/// Snapshot of a conversion decision held until it is confirmed or
/// expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Generated transaction ID.
    pub transaction_id: TransactionId,
    /// Quantity from the original request (currency amount or product
    /// count).
    pub original_quantity: Decimal,
    /// Converted amount from the decision.
    pub converted_amount: Decimal,
    /// Rate applied to the conversion.
    pub rate: Decimal,
    /// Source currency code.
    pub from_currency_code: CurrencyCode,
    /// Target currency code.
    pub to_currency_code: CurrencyCode,
    /// Product involved, if any.
    pub product_id: Option<ProductId>,
    /// Decision status at creation time.
    pub status: TransactionStatus,
    /// Decision reason.
    pub reason: String,
    /// Decision risk score.
    pub risk_score: Decimal,
    /// Decision warnings.
    pub warnings: Vec<String>,
    /// Decision recommendations.
    pub recommendations: Vec<String>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry expires.
    pub expires_at: DateTime<Utc>,
}

impl PendingTransaction {
    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires_at)
    }
}

/// Storage contract for pending transactions.
pub trait TransactionStore: Send + Sync {
    /// Create an entry from a decision and its originating request,
    /// returning the stored snapshot.
    fn create(
        &self,
        decision: &ConversionDecision,
        request: &ConversionRequest,
    ) -> PendingTransaction;

    /// Fetch an entry. Expired entries read as absent.
    fn get(&self, transaction_id: &TransactionId) -> Option<PendingTransaction>;

    /// Remove an entry. Returns whether a live entry was removed.
    fn delete(&self, transaction_id: &TransactionId) -> bool;

    /// Check whether a live entry exists.
    fn exists(&self, transaction_id: &TransactionId) -> bool;
}

/// In-memory pending-transaction store with per-entry TTL.
pub struct MemoryTransactionStore {
    entries: DashMap<String, PendingTransaction>,
    ttl: Duration,
}

impl MemoryTransactionStore {
    /// Create a store with the production TTL of 30 minutes.
    pub fn new() -> Self {
        Self::with_ttl(constants::pending_transaction_ttl())
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of entries currently held, including not-yet-evicted
    /// expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all expired entries.
    pub fn evict_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    fn key(transaction_id: &TransactionId) -> String {
        format!("transaction:{}", transaction_id)
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn create(
        &self,
        decision: &ConversionDecision,
        request: &ConversionRequest,
    ) -> PendingTransaction {
        let transaction_id = TransactionId::new();
        let created_at = Utc::now();
        let original_quantity = request
            .quantity_currency
            .or_else(|| request.quantity_product.map(Decimal::from))
            .unwrap_or(Decimal::ZERO);

        let entry = PendingTransaction {
            transaction_id,
            original_quantity,
            converted_amount: decision.converted_amount,
            rate: decision.applied_rate,
            from_currency_code: decision.from_currency_code.clone(),
            to_currency_code: decision.to_currency_code.clone(),
            product_id: request.product_id,
            status: decision.status,
            reason: decision.reason.clone(),
            risk_score: decision.risk_score,
            warnings: decision.warnings.clone(),
            recommendations: decision.recommendations.clone(),
            created_at,
            expires_at: created_at + self.ttl,
        };

        self.entries.insert(Self::key(&transaction_id), entry.clone());
        debug!(
            transaction_id = %transaction_id,
            expires_at = %entry.expires_at,
            "Pending transaction created"
        );
        entry
    }

    fn get(&self, transaction_id: &TransactionId) -> Option<PendingTransaction> {
        let key = Self::key(transaction_id);

        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired() {
                return Some(entry.clone());
            }
            drop(entry);
            self.entries.remove(&key);
            debug!(transaction_id = %transaction_id, "Expired pending transaction evicted");
        }
        None
    }

    fn delete(&self, transaction_id: &TransactionId) -> bool {
        match self.entries.remove(&Self::key(transaction_id)) {
            Some((_, entry)) => !entry.is_expired(),
            None => false,
        }
    }

    fn exists(&self, transaction_id: &TransactionId) -> bool {
        self.get(transaction_id).is_some()
    }
}
