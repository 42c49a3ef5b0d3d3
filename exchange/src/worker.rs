//! Command consumption and event publishing.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crownfx_broker::{Broker, Delivery, Subscription, Topic};
use crownfx_engine::ConversionPipeline;
use crownfx_protocol::{ConversionCommand, ConversionEvent};

use crate::config::ExchangeConfig;

/// Consumes conversion commands and publishes decision events.
///
/// One worker holds one subscription, and the broker delivers at most one
/// in-flight command per partition, so commands sharing a partition are
/// processed in arrival order without overlap.
pub struct CommandWorker {
    pipeline: Arc<ConversionPipeline>,
    commands: Subscription,
    events: Arc<Topic>,
    poll_interval: std::time::Duration,
}

impl CommandWorker {
    /// Wire a worker against a broker.
    pub fn new(config: &ExchangeConfig, broker: &Broker, pipeline: Arc<ConversionPipeline>) -> Self {
        let commands = broker
            .topic(&config.command_topic)
            .subscribe(&config.consumer_group);
        let events = broker.topic(&config.event_topic);

        Self {
            pipeline,
            commands,
            events,
            poll_interval: config.poll_interval,
        }
    }

    /// Drive the consume loop until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = self.commands.topic(),
            group = self.commands.group(),
            "Command worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.commands.poll() {
                Some(delivery) => self.handle(delivery).await,
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("Command worker stopped");
    }

    /// Handle one delivery: decide, publish, then acknowledge.
    async fn handle(&self, delivery: Delivery) {
        let command: ConversionCommand = match delivery.decode() {
            Ok(command) => command,
            Err(e) => {
                // A payload that cannot be decoded would redeliver
                // forever; drop it.
                error!(error = %e, "Discarding undecodable command");
                let _ = delivery.ack();
                return;
            }
        };

        if delivery.attempt > 1 {
            warn!(
                command_id = %command.command_id,
                attempt = delivery.attempt,
                "Command redelivered"
            );
        }

        let event = self.process(&command).await;

        match self.events.publish(&event.partition_key(), &event) {
            Ok(()) => {
                if let Err(e) = delivery.ack() {
                    warn!(command_id = %command.command_id, error = %e, "Acknowledgment failed");
                }
            }
            Err(e) => {
                // Leave the command unacknowledged; redelivery is the
                // recovery mechanism.
                error!(
                    command_id = %command.command_id,
                    error = %e,
                    "Event publish failed, command left for redelivery"
                );
            }
        }
    }

    /// Run the decision engine for one command and build the answering
    /// event.
    ///
    /// Engine failures (including not-found conditions) become
    /// `NOT_APPROVED` events; they are answers, not transport errors.
    #[instrument(skip(self, command), fields(command_id = %command.command_id))]
    pub async fn process(&self, command: &ConversionCommand) -> ConversionEvent {
        let request = command.to_request();

        match self.pipeline.convert(&request).await {
            Ok(decision) => {
                info!(
                    correlation_id = %command.correlation_id,
                    status = %decision.status,
                    "Conversion command processed"
                );
                ConversionEvent::from_decision(command, &decision)
            }
            Err(e) => {
                warn!(
                    correlation_id = %command.correlation_id,
                    error = %e,
                    "Conversion command failed"
                );
                ConversionEvent::failure(command, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crownfx_common::{ConversionRequest, CurrencyCode, CurrencyPair, TransactionStatus};
    use crownfx_engine::{
        CurrencyRegistry, MemoryRateRepository, MemoryTransactionStore, PipelineBuilder,
        RateRepository,
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        worker: CommandWorker,
        broker: Broker,
        store: Arc<MemoryTransactionStore>,
        config: ExchangeConfig,
    }

    async fn fixture() -> Fixture {
        let currencies = Arc::new(CurrencyRegistry::new());
        currencies.register(CurrencyCode::oro(), "Ouro Real").unwrap();
        currencies.register(CurrencyCode::tib(), "Tibar").unwrap();

        let rates = Arc::new(MemoryRateRepository::new());
        rates
            .save(
                CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib()),
                dec!(2.5),
                "2024-01-01".parse().unwrap(),
            )
            .await
            .unwrap();

        let store = Arc::new(MemoryTransactionStore::with_ttl(Duration::minutes(30)));
        let pipeline = Arc::new(
            PipelineBuilder::new()
                .currencies(currencies)
                .rates(rates)
                .store(store.clone())
                .build(),
        );

        let config = ExchangeConfig::default();
        let broker = Broker::new();
        let worker = CommandWorker::new(&config, &broker, pipeline);

        Fixture {
            worker,
            broker,
            store,
            config,
        }
    }

    fn command() -> ConversionCommand {
        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        ConversionCommand::from_request(&request)
    }

    #[tokio::test]
    async fn test_process_echoes_correlation_identifiers() {
        let f = fixture().await;
        let command = command();

        let event = f.worker.process(&command).await;

        assert_eq!(event.command_id, command.command_id);
        assert_eq!(event.correlation_id, command.correlation_id);
        assert_eq!(event.status, TransactionStatus::Requested);
        assert_eq!(event.converted_amount, Some(dec!(250.00)));
    }

    #[tokio::test]
    async fn test_engine_failure_becomes_not_approved_event() {
        let f = fixture().await;
        let request = ConversionRequest::currency("ORO", "XYZ", dec!(100.00));
        let command = ConversionCommand::from_request(&request);

        let event = f.worker.process(&command).await;

        assert_eq!(event.status, TransactionStatus::NotApproved);
        assert!(!event.can_proceed);
        assert!(event.reason.contains("XYZ"));
        assert_eq!(event.command_id, command.command_id);
    }

    #[tokio::test]
    async fn test_redelivered_command_creates_second_pending_entry() {
        let f = fixture().await;
        let command = command();

        // At-least-once delivery: the same command processed twice
        // yields structurally identical decisions but two pending
        // entries, since no idempotency key deduplicates redeliveries.
        let first = f.worker.process(&command).await;
        let second = f.worker.process(&command).await;

        assert_eq!(first.status, second.status);
        assert_eq!(first.converted_amount, second.converted_amount);
        assert_ne!(first.transaction_id, second.transaction_id);
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn test_handle_acks_after_publishing_event() {
        let f = fixture().await;
        let command_topic = f.broker.topic(&f.config.command_topic);
        let event_topic = f.broker.topic(&f.config.event_topic);
        let event_sub = event_topic.subscribe("test-listener");

        let command = command();
        command_topic
            .publish(&command.partition_key(), &command)
            .unwrap();

        let delivery = f.worker.commands.poll().unwrap();
        f.worker.handle(delivery).await;

        // The command queue drained and the event is available.
        assert!(f.worker.commands.poll().is_none());
        let event: ConversionEvent = event_sub.poll().unwrap().decode().unwrap();
        assert_eq!(event.command_id, command.command_id);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dropped() {
        let f = fixture().await;
        let command_topic = f.broker.topic(&f.config.command_topic);
        command_topic.publish("key", &"not a command").unwrap();

        let delivery = f.worker.commands.poll().unwrap();
        f.worker.handle(delivery).await;

        assert!(f.worker.commands.poll().is_none());
    }
}
