//! CrownFX Broker
//!
//! In-process message broker with the delivery semantics the conversion
//! saga depends on:
//!
//! - partitioned topics with FIFO order per partition
//! - consumer groups, each receiving every message published after it
//!   subscribed
//! - manual acknowledgment: a delivery is redelivered until it is acked,
//!   and at most one message per partition is in flight per group
//!
//! Delivery is at-least-once. A consumer that dies between processing and
//! acknowledgment sees the same message again on its next poll.
//!
//! # Example
//!
//! ```rust,ignore
//! use crownfx_broker::Broker;
//!
//! let broker = Broker::new();
//! let topic = broker.topic("conversion-commands");
//! let subscription = topic.subscribe("exchange-api-group");
//!
//! topic.publish("key", &payload)?;
//! if let Some(delivery) = subscription.poll() {
//!     let command: ConversionCommand = delivery.decode()?;
//!     // ... process ...
//!     delivery.ack()?;
//! }
//! ```

pub mod error;
pub mod subscription;
pub mod topic;

pub use error::BrokerError;
pub use subscription::{Delivery, Subscription};
pub use topic::{Topic, TopicStats};

use std::sync::Arc;

use dashmap::DashMap;

/// Registry of topics shared by every service in the process.
pub struct Broker {
    topics: DashMap<String, Arc<Topic>>,
    default_partitions: usize,
}

impl Broker {
    /// Create a broker whose topics have a single partition.
    pub fn new() -> Self {
        Self::with_partitions(1)
    }

    /// Create a broker whose topics have the given partition count.
    pub fn with_partitions(partitions: usize) -> Self {
        Self {
            topics: DashMap::new(),
            default_partitions: partitions.max(1),
        }
    }

    /// Get or create a topic by name.
    pub fn topic(&self, name: &str) -> Arc<Topic> {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Topic::new(name, self.default_partitions)))
            .clone()
    }

    /// Number of registered topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
