//! Consumer subscriptions and deliveries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{BrokerError, BrokerResult};
use crate::topic::GroupState;

/// A consumer handle over one group's queues.
pub struct Subscription {
    topic: String,
    group: String,
    state: Arc<GroupState>,
    next_partition: AtomicUsize,
}

impl Subscription {
    pub(crate) fn new(topic: String, group: String, state: Arc<GroupState>) -> Self {
        Self {
            topic,
            group,
            state,
            next_partition: AtomicUsize::new(0),
        }
    }

    /// Topic this subscription consumes.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consumer group name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Take the next available delivery, if any.
    ///
    /// Partitions are scanned round-robin. The head of a partition is
    /// returned again on every poll until it is acknowledged, so an
    /// unacked (or nacked-by-crash) message is redelivered and no later
    /// message from that partition overtakes it.
    pub fn poll(&self) -> Option<Delivery> {
        let partitions = self.state.queues.len();
        let start = self.next_partition.fetch_add(1, Ordering::Relaxed) % partitions;

        for offset in 0..partitions {
            let partition = (start + offset) % partitions;
            let mut queue = self.state.queues[partition].lock();
            if let Some(head) = queue.front_mut() {
                head.attempts += 1;
                trace!(
                    topic = %self.topic,
                    group = %self.group,
                    partition,
                    seq = head.seq,
                    attempt = head.attempts,
                    "Delivery taken"
                );
                return Some(Delivery {
                    topic: self.topic.clone(),
                    partition,
                    seq: head.seq,
                    attempt: head.attempts,
                    payload: head.payload.clone(),
                    state: self.state.clone(),
                });
            }
        }
        None
    }

    /// Messages still queued for this group.
    pub fn depth(&self) -> usize {
        self.state.queues.iter().map(|q| q.lock().len()).sum()
    }
}

/// One in-flight message handed to a consumer.
///
/// The message stays at the head of its partition until [`Delivery::ack`]
/// is called; dropping a delivery without acking leaves it queued for
/// redelivery.
pub struct Delivery {
    /// Topic the message came from.
    pub topic: String,
    /// Partition the message was consumed from.
    pub partition: usize,
    /// Delivery attempt number (1 on first delivery).
    pub attempt: u32,
    /// Serialized payload.
    pub payload: String,
    seq: u64,
    state: Arc<GroupState>,
}

impl Delivery {
    /// Deserialize the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> BrokerResult<T> {
        serde_json::from_str(&self.payload).map_err(|e| BrokerError::Serialization(e.to_string()))
    }

    /// Acknowledge the message, removing it from the partition.
    ///
    /// Only the current head can be acked; a stale acknowledgment (for a
    /// message another consumer already removed) fails.
    pub fn ack(self) -> BrokerResult<()> {
        let mut queue = self.state.queues[self.partition].lock();
        match queue.front() {
            Some(head) if head.seq == self.seq => {
                queue.pop_front();
                self.state
                    .acked
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Ok(())
            }
            _ => Err(BrokerError::StaleDelivery {
                partition: self.partition,
                seq: self.seq,
            }),
        }
    }
}
