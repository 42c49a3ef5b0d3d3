//! Transaction service configuration.

use std::time::Duration;

use crownfx_protocol::{CONVERSION_COMMAND_TOPIC, CONVERSION_EVENT_TOPIC};

/// Configuration for the transaction service.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// Topic to publish conversion commands to.
    pub command_topic: String,
    /// Topic to consume conversion events from.
    pub event_topic: String,
    /// Consumer group name for the event worker.
    pub consumer_group: String,
    /// Idle delay between polls when the event topic is empty.
    pub poll_interval: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            command_topic: CONVERSION_COMMAND_TOPIC.to_string(),
            event_topic: CONVERSION_EVENT_TOPIC.to_string(),
            consumer_group: "transaction-api-group".to_string(),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl TransactionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(topic) = std::env::var("TRANSACTION_COMMAND_TOPIC") {
            config.command_topic = topic;
        }

        if let Ok(topic) = std::env::var("TRANSACTION_EVENT_TOPIC") {
            config.event_topic = topic;
        }

        if let Ok(group) = std::env::var("TRANSACTION_CONSUMER_GROUP") {
            config.consumer_group = group;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.command_topic.is_empty() {
            return Err("Command topic cannot be empty".to_string());
        }

        if self.event_topic.is_empty() {
            return Err("Event topic cannot be empty".to_string());
        }

        if self.consumer_group.is_empty() {
            return Err("Consumer group cannot be empty".to_string());
        }

        Ok(())
    }
}
