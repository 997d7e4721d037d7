//! Partition sources
//!
//! A [`PartitionSource`] turns a consumer group subscription into a stream of
//! partition assignments, each carrying its own message channel. The runner
//! only ever sees assignments and an [`OffsetCommitter`]; it never touches the
//! consumer handle itself.

use async_trait::async_trait;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::ClientContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{KafkaIntegrationError, RawMessage};
use crate::error::Result;

/// Messages of one assigned partition, in offset order
#[derive(Debug)]
pub struct PartitionAssignment {
    pub topic: String,
    pub partition: i32,
    pub messages: mpsc::Receiver<RawMessage>,
}

/// Marks a message as processed so the group resumes after it.
pub trait OffsetCommitter: Send + Sync {
    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<()>;
}

#[async_trait]
pub trait PartitionSource: Send {
    /// Next newly assigned partition; `None` once the source is exhausted.
    async fn next_assignment(&mut self) -> Option<PartitionAssignment>;

    /// Commit capability handed to every partition task
    fn committer(&self) -> Arc<dyn OffsetCommitter>;
}

type PartitionKey = (String, i32);

/// Fans one consumer's messages out to per-partition channels.
///
/// The first message seen for a partition opens its channel and yields the
/// assignment to hand to the runner. Later messages for that partition reuse
/// the channel, so each partition sees its messages in arrival order.
#[derive(Debug)]
pub struct PartitionDemux {
    senders: HashMap<PartitionKey, mpsc::Sender<RawMessage>>,
    buffer: usize,
}

impl PartitionDemux {
    pub fn new(buffer: usize) -> Self {
        Self {
            senders: HashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Channel for `(topic, partition)`, plus a new assignment when the
    /// partition has no open channel yet.
    pub fn route(
        &mut self,
        topic: &str,
        partition: i32,
    ) -> (mpsc::Sender<RawMessage>, Option<PartitionAssignment>) {
        let key = (topic.to_string(), partition);
        if let Some(sender) = self.senders.get(&key) {
            if !sender.is_closed() {
                return (sender.clone(), None);
            }
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        self.senders.insert(key, tx.clone());
        let assignment = PartitionAssignment {
            topic: topic.to_string(),
            partition,
            messages: rx,
        };
        (tx, Some(assignment))
    }

    /// Close a partition's channel. Its task drains what was already sent.
    pub fn revoke(&mut self, topic: &str, partition: i32) -> bool {
        self.senders.remove(&(topic.to_string(), partition)).is_some()
    }

    pub fn open_partitions(&self) -> usize {
        self.senders.len()
    }
}

type SharedDemux = Arc<Mutex<PartitionDemux>>;

fn lock_demux(demux: &Mutex<PartitionDemux>) -> MutexGuard<'_, PartitionDemux> {
    demux.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Consumer context that closes partition channels on revocation
pub struct RebalanceContext {
    name: String,
    demux: SharedDemux,
}

impl ClientContext for RebalanceContext {}

impl ConsumerContext for RebalanceContext {
    fn post_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        match rebalance {
            Rebalance::Assign(partitions) => {
                info!(pipeline = %self.name, count = partitions.count(), "Partitions assigned");
            },
            Rebalance::Revoke(partitions) => {
                let mut demux = lock_demux(&self.demux);
                let closed = partitions
                    .elements()
                    .iter()
                    .filter(|e| demux.revoke(e.topic(), e.partition()))
                    .count();
                info!(pipeline = %self.name, count = partitions.count(), closed, "Partitions revoked");
            },
            Rebalance::Error(e) => {
                error!(pipeline = %self.name, error = %e, "Rebalance error");
            },
        }
    }
}

type RebalanceConsumer = StreamConsumer<RebalanceContext>;

/// Offset store backed by the consumer; librdkafka commits stored offsets on
/// its auto-commit interval.
pub struct KafkaOffsetCommitter {
    consumer: Arc<RebalanceConsumer>,
}

impl OffsetCommitter for KafkaOffsetCommitter {
    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<()> {
        self.consumer
            .store_offset(topic, partition, offset + 1)
            .map_err(|e| KafkaIntegrationError::OffsetCommitError(e.to_string()).into())
    }
}

/// rdkafka-backed partition source.
///
/// A single driver task is the only reader of the consumer. It routes every
/// message through a [`PartitionDemux`] and hands newly seen partitions to
/// [`next_assignment`](PartitionSource::next_assignment). A full partition
/// channel holds the driver back, which bounds how far partitions drift
/// apart.
pub struct KafkaPartitionSource {
    name: String,
    consumer: Arc<RebalanceConsumer>,
    assignments: mpsc::UnboundedReceiver<PartitionAssignment>,
    driver: JoinHandle<()>,
}

impl KafkaPartitionSource {
    /// Create the consumer and subscribe. Failure here is fatal for the
    /// pipeline.
    pub fn new(
        name: &str,
        config: rdkafka::ClientConfig,
        topics: &[String],
        buffer: usize,
    ) -> Result<Self> {
        let demux: SharedDemux = Arc::new(Mutex::new(PartitionDemux::new(buffer)));
        let context = RebalanceContext {
            name: name.to_string(),
            demux: Arc::clone(&demux),
        };

        let consumer: RebalanceConsumer = config
            .create_with_context(context)
            .map_err(KafkaIntegrationError::ConnectionError)?;

        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topic_refs)
            .map_err(KafkaIntegrationError::ConnectionError)?;

        let consumer = Arc::new(consumer);
        let (assigned_tx, assigned_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive_main_queue(
            name.to_string(),
            Arc::clone(&consumer),
            demux,
            assigned_tx,
        ));

        info!(pipeline = name, topics = ?topics, "Kafka consumer subscribed");

        Ok(Self {
            name: name.to_string(),
            consumer,
            assignments: assigned_rx,
            driver,
        })
    }
}

#[async_trait]
impl PartitionSource for KafkaPartitionSource {
    async fn next_assignment(&mut self) -> Option<PartitionAssignment> {
        let assignment = self.assignments.recv().await?;
        debug!(
            pipeline = %self.name,
            topic = %assignment.topic,
            partition = assignment.partition,
            "Partition opened"
        );
        Some(assignment)
    }

    fn committer(&self) -> Arc<dyn OffsetCommitter> {
        Arc::new(KafkaOffsetCommitter {
            consumer: Arc::clone(&self.consumer),
        })
    }
}

impl Drop for KafkaPartitionSource {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive_main_queue(
    name: String,
    consumer: Arc<RebalanceConsumer>,
    demux: SharedDemux,
    assignments: mpsc::UnboundedSender<PartitionAssignment>,
) {
    loop {
        let message = match consumer.recv().await {
            Ok(message) => RawMessage::from(&message),
            Err(e) => {
                error!(pipeline = %name, error = %e, "Kafka consumer error");
                continue;
            },
        };

        if !forward(&name, &demux, &assignments, message).await {
            debug!(pipeline = %name, "Partition source dropped, stopping driver");
            break;
        }
    }
}

/// Deliver one message to its partition channel, opening the channel first if
/// needed. A channel whose task has gone away is reopened once. Returns
/// `false` when nobody takes assignments any more.
async fn forward(
    name: &str,
    demux: &Mutex<PartitionDemux>,
    assignments: &mpsc::UnboundedSender<PartitionAssignment>,
    mut message: RawMessage,
) -> bool {
    loop {
        let (sender, opened) = lock_demux(demux).route(&message.topic, message.partition);
        let fresh = opened.is_some();
        if let Some(assignment) = opened {
            if assignments.send(assignment).is_err() {
                return false;
            }
        }

        match sender.send(message).await {
            Ok(()) => return true,
            Err(mpsc::error::SendError(returned)) if !fresh => message = returned,
            Err(mpsc::error::SendError(returned)) => {
                warn!(
                    pipeline = %name,
                    topic = %returned.topic,
                    partition = returned.partition,
                    offset = returned.offset,
                    "Partition task gone, dropping message"
                );
                return true;
            },
        }
    }
}

/// In-process partition source fed from channels. Used by tests and local
/// replays; commits are recorded instead of sent anywhere.
pub struct ChannelPartitionSource {
    assignments: mpsc::Receiver<PartitionAssignment>,
    committer: Arc<RecordingCommitter>,
}

impl ChannelPartitionSource {
    /// Returns the source and the sender used to hand it assignments
    pub fn new() -> (Self, mpsc::Sender<PartitionAssignment>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                assignments: rx,
                committer: Arc::new(RecordingCommitter::default()),
            },
            tx,
        )
    }

    /// Shared view of every committed offset
    pub fn commits(&self) -> Arc<RecordingCommitter> {
        Arc::clone(&self.committer)
    }
}

#[async_trait]
impl PartitionSource for ChannelPartitionSource {
    async fn next_assignment(&mut self) -> Option<PartitionAssignment> {
        self.assignments.recv().await
    }

    fn committer(&self) -> Arc<dyn OffsetCommitter> {
        self.committer.clone()
    }
}

/// Committer that remembers `(topic, partition, offset)` triples
#[derive(Debug, Default)]
pub struct RecordingCommitter {
    commits: Mutex<Vec<(String, i32, i64)>>,
}

impl RecordingCommitter {
    pub fn committed(&self) -> Vec<(String, i32, i64)> {
        self.commits
            .lock()
            .map(|commits| commits.clone())
            .unwrap_or_default()
    }
}

impl OffsetCommitter for RecordingCommitter {
    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<()> {
        self.commits
            .lock()
            .map_err(|_| crate::error::Error::internal("commit log poisoned"))?
            .push((topic.to_string(), partition, offset));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_yields_assignments_then_ends() {
        let (mut source, tx) = ChannelPartitionSource::new();
        let (_msg_tx, msg_rx) = mpsc::channel(1);

        tx.send(PartitionAssignment {
            topic: "shark.account".to_string(),
            partition: 2,
            messages: msg_rx,
        })
        .await
        .unwrap();
        drop(tx);

        let assignment = source.next_assignment().await.unwrap();
        assert_eq!(assignment.topic, "shark.account");
        assert_eq!(assignment.partition, 2);
        assert!(source.next_assignment().await.is_none());
    }

    fn raw(topic: &str, partition: i32, offset: i64) -> RawMessage {
        RawMessage::new(topic, partition, offset, format!("m{}", offset).into_bytes())
    }

    #[tokio::test]
    async fn test_demux_opens_partition_on_first_message() {
        let mut demux = PartitionDemux::new(4);

        let (tx, opened) = demux.route("cdc.merchant", 0);
        let mut assignment = opened.unwrap();
        tx.send(raw("cdc.merchant", 0, 10)).await.unwrap();

        let (_, again) = demux.route("cdc.merchant", 0);
        assert!(again.is_none());
        assert_eq!(assignment.topic, "cdc.merchant");
        assert_eq!(assignment.partition, 0);
        assert_eq!(assignment.messages.recv().await.unwrap().offset, 10);
        assert_eq!(demux.open_partitions(), 1);
    }

    #[tokio::test]
    async fn test_forward_keeps_partition_order() {
        let demux = Mutex::new(PartitionDemux::new(16));
        let (assign_tx, mut assign_rx) = mpsc::unbounded_channel();

        for (partition, offset) in [(0, 1), (1, 1), (0, 2), (0, 3), (1, 2)] {
            assert!(forward("cdc", &demux, &assign_tx, raw("cdc.merchant", partition, offset)).await);
        }

        let mut first = assign_rx.recv().await.unwrap();
        let mut second = assign_rx.recv().await.unwrap();
        assert!(assign_rx.try_recv().is_err());
        assert_eq!((first.partition, second.partition), (0, 1));

        let mut offsets = Vec::new();
        while let Ok(message) = first.messages.try_recv() {
            offsets.push(message.offset);
        }
        assert_eq!(offsets, vec![1, 2, 3]);
        assert_eq!(second.messages.try_recv().unwrap().offset, 1);
        assert_eq!(second.messages.try_recv().unwrap().offset, 2);
    }

    #[tokio::test]
    async fn test_forward_reopens_revoked_partition() {
        let demux = Mutex::new(PartitionDemux::new(4));
        let (assign_tx, mut assign_rx) = mpsc::unbounded_channel();

        assert!(forward("cdc", &demux, &assign_tx, raw("cdc.merchant", 0, 1)).await);
        let mut old = assign_rx.recv().await.unwrap();
        assert!(lock_demux(&demux).revoke("cdc.merchant", 0));

        assert!(forward("cdc", &demux, &assign_tx, raw("cdc.merchant", 0, 2)).await);
        let mut new = assign_rx.recv().await.unwrap();

        assert_eq!(old.messages.recv().await.unwrap().offset, 1);
        assert!(old.messages.recv().await.is_none());
        assert_eq!(new.messages.recv().await.unwrap().offset, 2);
    }

    #[tokio::test]
    async fn test_forward_redelivers_when_partition_task_is_gone() {
        let demux = Mutex::new(PartitionDemux::new(4));
        let (assign_tx, mut assign_rx) = mpsc::unbounded_channel();

        assert!(forward("cdc", &demux, &assign_tx, raw("cdc.merchant", 0, 1)).await);
        drop(assign_rx.recv().await.unwrap());

        assert!(forward("cdc", &demux, &assign_tx, raw("cdc.merchant", 0, 2)).await);
        let mut reopened = assign_rx.recv().await.unwrap();
        assert_eq!(reopened.messages.recv().await.unwrap().offset, 2);
    }

    #[tokio::test]
    async fn test_forward_stops_without_assignment_receiver() {
        let demux = Mutex::new(PartitionDemux::new(4));
        let (assign_tx, assign_rx) = mpsc::unbounded_channel();
        drop(assign_rx);

        assert!(!forward("cdc", &demux, &assign_tx, raw("cdc.merchant", 0, 1)).await);
    }

    #[test]
    fn test_recording_committer() {
        let (source, _tx) = ChannelPartitionSource::new();
        let committer = source.committer();
        committer.commit("t", 0, 5).unwrap();
        committer.commit("t", 0, 6).unwrap();

        assert_eq!(
            source.commits().committed(),
            vec![("t".to_string(), 0, 5), ("t".to_string(), 0, 6)]
        );
    }
}
