//! Transaction status definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome status of a conversion decision.
///
/// The guard rail classifies every conversion into `Requested`, `Warning`
/// or `NotApproved`. `Approved` is only reached when a pending transaction
/// is explicitly confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Conversion accepted, awaiting explicit confirmation.
    Requested,
    /// Conversion confirmed and final.
    Approved,
    /// Conversion rejected by the guard rail or by a processing failure.
    NotApproved,
    /// Conversion allowed but flagged for manual approval.
    Warning,
}

impl TransactionStatus {
    /// Check if this status is final (no further action expected).
    pub fn is_final(&self) -> bool {
        matches!(self, TransactionStatus::Approved | TransactionStatus::NotApproved)
    }

    /// Check if this status still requires a confirmation step.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, TransactionStatus::Requested | TransactionStatus::Warning)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Requested => "REQUESTED",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::NotApproved => "NOT_APPROVED",
            TransactionStatus::Warning => "WARNING",
        };
        write!(f, "{}", s)
    }
}
