//! Exchange service configuration.

use std::time::Duration;

use crownfx_protocol::{CONVERSION_COMMAND_TOPIC, CONVERSION_EVENT_TOPIC};

/// Main exchange service configuration.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Topic to consume conversion commands from.
    pub command_topic: String,
    /// Topic to publish conversion events to.
    pub event_topic: String,
    /// Consumer group name.
    pub consumer_group: String,
    /// Partitions per topic.
    pub partitions: usize,
    /// Idle delay between polls when the command topic is empty.
    pub poll_interval: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            command_topic: CONVERSION_COMMAND_TOPIC.to_string(),
            event_topic: CONVERSION_EVENT_TOPIC.to_string(),
            consumer_group: "exchange-api-group".to_string(),
            partitions: 1,
            poll_interval: Duration::from_millis(10),
            log_level: "info".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(topic) = std::env::var("EXCHANGE_COMMAND_TOPIC") {
            config.command_topic = topic;
        }

        if let Ok(topic) = std::env::var("EXCHANGE_EVENT_TOPIC") {
            config.event_topic = topic;
        }

        if let Ok(group) = std::env::var("EXCHANGE_CONSUMER_GROUP") {
            config.consumer_group = group;
        }

        if let Ok(partitions) = std::env::var("EXCHANGE_PARTITIONS") {
            if let Ok(partitions) = partitions.parse() {
                config.partitions = partitions;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
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

        if self.command_topic == self.event_topic {
            return Err("Command and event topics must differ".to_string());
        }

        if self.consumer_group.is_empty() {
            return Err("Consumer group cannot be empty".to_string());
        }

        if self.partitions == 0 {
            return Err("Partition count cannot be 0".to_string());
        }

        Ok(())
    }
}
