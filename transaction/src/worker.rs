//! Event consumption on the initiating side.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crownfx_broker::{Broker, Delivery, Subscription};
use crownfx_protocol::ConversionEvent;

use crate::config::TransactionConfig;
use crate::ledger::TransactionLedger;

/// Consumes conversion events and updates the local ledger.
///
/// Events are matched to records by correlation ID. An event with no
/// matching record is logged and dropped; it is acknowledged anyway so it
/// is never retried.
pub struct EventWorker {
    events: Subscription,
    ledger: Arc<TransactionLedger>,
    poll_interval: std::time::Duration,
}

impl EventWorker {
    /// Wire a worker against a broker.
    pub fn new(config: &TransactionConfig, broker: &Broker, ledger: Arc<TransactionLedger>) -> Self {
        Self {
            events: broker
                .topic(&config.event_topic)
                .subscribe(&config.consumer_group),
            ledger,
            poll_interval: config.poll_interval,
        }
    }

    /// Drive the consume loop until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = self.events.topic(),
            group = self.events.group(),
            "Event worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.events.poll() {
                Some(delivery) => self.handle(delivery),
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("Event worker stopped");
    }

    fn handle(&self, delivery: Delivery) {
        let event: ConversionEvent = match delivery.decode() {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Discarding undecodable event");
                let _ = delivery.ack();
                return;
            }
        };

        match self.ledger.update_from_event(&event) {
            Some(record) => {
                info!(
                    event_id = %event.event_id,
                    correlation_id = %event.correlation_id,
                    status = %record.status,
                    "Conversion event applied"
                );
            }
            None => {
                warn!(
                    event_id = %event.event_id,
                    correlation_id = %event.correlation_id,
                    "Unmatched conversion event dropped"
                );
            }
        }

        if let Err(e) = delivery.ack() {
            warn!(event_id = %event.event_id, error = %e, "Acknowledgment failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crownfx_common::{ConversionRequest, TransactionStatus};
    use crownfx_protocol::{ConversionCommand, CONVERSION_EVENT_TOPIC};
    use crate::record::TransactionRecord;
    use rust_decimal_macros::dec;

    fn setup() -> (Broker, Arc<TransactionLedger>, EventWorker) {
        let config = TransactionConfig::default();
        let broker = Broker::new();
        let ledger = Arc::new(TransactionLedger::new());
        let worker = EventWorker::new(&config, &broker, ledger.clone());
        (broker, ledger, worker)
    }

    fn command() -> ConversionCommand {
        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        ConversionCommand::from_request(&request)
    }

    #[test]
    fn test_matched_event_updates_record() {
        let (broker, ledger, worker) = setup();
        let command = command();
        ledger.insert(TransactionRecord::for_command(&command));

        let event = ConversionEvent::failure(&command, "rate not found");
        let topic = broker.topic(CONVERSION_EVENT_TOPIC);
        topic.publish(&event.partition_key(), &event).unwrap();

        worker.handle(worker.events.poll().unwrap());

        let record = ledger.by_correlation(&command.correlation_id).unwrap();
        assert_eq!(record.status, TransactionStatus::NotApproved);
        // The event was acknowledged.
        assert!(worker.events.poll().is_none());
    }

    #[test]
    fn test_unmatched_event_is_dropped_not_retried() {
        let (broker, ledger, worker) = setup();

        let event = ConversionEvent::failure(&command(), "whatever");
        let topic = broker.topic(CONVERSION_EVENT_TOPIC);
        topic.publish(&event.partition_key(), &event).unwrap();

        worker.handle(worker.events.poll().unwrap());

        assert!(ledger.is_empty());
        // Dropped means acked: nothing left to poll.
        assert!(worker.events.poll().is_none());
    }
}
