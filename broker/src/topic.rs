//! Partitioned topics.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::{BrokerError, BrokerResult};
use crate::subscription::Subscription;

/// A message queued on one partition of one consumer group.
#[derive(Debug, Clone)]
pub(crate) struct QueuedMessage {
    /// Topic-wide sequence number, used to match acknowledgments.
    pub seq: u64,
    /// Serialized payload.
    pub payload: String,
    /// Delivery attempts so far.
    pub attempts: u32,
}

/// Per-group, per-partition FIFO queue.
pub(crate) type PartitionQueue = Mutex<VecDeque<QueuedMessage>>;

/// Queues for one consumer group across all partitions.
pub(crate) struct GroupState {
    pub queues: Vec<PartitionQueue>,
    pub acked: AtomicU64,
}

impl GroupState {
    fn new(partitions: usize) -> Self {
        Self {
            queues: (0..partitions).map(|_| Mutex::new(VecDeque::new())).collect(),
            acked: AtomicU64::new(0),
        }
    }
}

/// A named, partitioned topic.
///
/// Each consumer group owns independent queues: a message published to the
/// topic is enqueued for every group registered at publish time. Within a
/// partition, order is FIFO and at most one message is in flight per group.
pub struct Topic {
    name: String,
    partitions: usize,
    groups: DashMap<String, Arc<GroupState>>,
    sequence: AtomicU64,
    published: AtomicU64,
}

impl Topic {
    /// Create a new topic with the given partition count.
    pub fn new(name: impl Into<String>, partitions: usize) -> Self {
        Self {
            name: name.into(),
            partitions: partitions.max(1),
            groups: DashMap::new(),
            sequence: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions
    }

    /// Publish a payload, partitioned by key.
    ///
    /// Messages with the same key always land on the same partition, so
    /// they are consumed in publish order.
    pub fn publish<T: Serialize>(&self, key: &str, value: &T) -> BrokerResult<()> {
        let payload =
            serde_json::to_string(value).map_err(|e| BrokerError::Serialization(e.to_string()))?;
        let partition = self.partition_for(key);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);

        for group in self.groups.iter() {
            group.value().queues[partition].lock().push_back(QueuedMessage {
                seq,
                payload: payload.clone(),
                attempts: 0,
            });
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        debug!(
            topic = %self.name,
            partition,
            seq,
            groups = self.groups.len(),
            "Message published"
        );
        Ok(())
    }

    /// Subscribe a consumer group to this topic.
    ///
    /// The group only sees messages published after its first subscription.
    /// Subscribing the same group again returns a competing consumer over
    /// the same queues.
    pub fn subscribe(self: &Arc<Self>, group: &str) -> Subscription {
        let state = self
            .groups
            .entry(group.to_string())
            .or_insert_with(|| Arc::new(GroupState::new(self.partitions)))
            .clone();

        debug!(topic = %self.name, group, "Consumer group subscribed");
        Subscription::new(self.name.clone(), group.to_string(), state)
    }

    /// Get topic statistics.
    pub fn stats(&self) -> TopicStats {
        let depth = self
            .groups
            .iter()
            .map(|g| g.queues.iter().map(|q| q.lock().len()).sum::<usize>())
            .sum();
        let acked = self
            .groups
            .iter()
            .map(|g| g.acked.load(Ordering::Relaxed))
            .sum();

        TopicStats {
            published: self.published.load(Ordering::Relaxed),
            acked,
            depth,
        }
    }

    fn partition_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as usize
    }
}

/// Topic statistics.
#[derive(Debug, Clone)]
pub struct TopicStats {
    /// Messages published to the topic.
    pub published: u64,
    /// Acknowledgments across all groups.
    pub acked: u64,
    /// Messages still queued across all groups.
    pub depth: usize,
}
