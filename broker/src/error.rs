//! Broker error types.

use thiserror::Error;

/// Errors that can occur in the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Payload could not be serialized or deserialized.
    #[error("Payload serialization failed: {0}")]
    Serialization(String),

    /// Acknowledgment for a delivery that is no longer at the head of its
    /// partition (already acked, or superseded by a redelivery race).
    #[error("Stale delivery: message {seq} is not in flight on partition {partition}")]
    StaleDelivery { partition: usize, seq: u64 },
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
