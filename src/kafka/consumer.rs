//! Consumer group runner
//!
//! One runner per pipeline. Every assigned partition gets its own task that
//! drains the partition's channel in order; each message is dispatched, any
//! failure is logged (and dead-lettered when a sink is configured), and the
//! offset is marked either way.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use super::producer::DeadLetterSink;
use super::router::MessageHandler;
use super::source::{OffsetCommitter, PartitionAssignment, PartitionSource};
use super::{DlqMessage, RawMessage};
use crate::logging::Timer;
use crate::{kafka_span, log_error};

/// Lifecycle of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Starting,
    Running,
    /// The assignment stream ended
    PartitionClosed,
    Interrupted,
    Terminated,
}

pub struct ConsumerGroupRunner<S> {
    name: String,
    source: S,
    dispatcher: Arc<dyn MessageHandler>,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
    state: RunnerState,
    partitions: Vec<JoinHandle<()>>,
}

impl<S: PartitionSource> ConsumerGroupRunner<S> {
    pub fn new(
        name: impl Into<String>,
        source: S,
        dispatcher: Arc<dyn MessageHandler>,
        dead_letter: Option<Arc<dyn DeadLetterSink>>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            dispatcher,
            dead_letter,
            state: RunnerState::Starting,
            partitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    fn transition(&mut self, next: RunnerState) {
        info!(pipeline = %self.name, from = ?self.state, to = ?next, "Runner state change");
        self.state = next;
    }

    /// Run until the assignment stream closes.
    pub async fn run(self) -> RunnerState {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until the assignment stream closes or `interrupt` resolves. On
    /// interrupt, partition tasks are aborted without draining.
    pub async fn run_until<F>(mut self, interrupt: F) -> RunnerState
    where
        F: Future<Output = ()> + Send,
    {
        self.transition(RunnerState::Running);
        let committer = self.source.committer();

        tokio::pin!(interrupt);
        let interrupted = loop {
            tokio::select! {
                _ = &mut interrupt => break true,
                assignment = self.source.next_assignment() => match assignment {
                    Some(assignment) => self.spawn_partition(assignment, Arc::clone(&committer)),
                    None => break false,
                },
            }
        };

        if interrupted {
            self.transition(RunnerState::Interrupted);
            for task in self.partitions.drain(..) {
                task.abort();
            }
        } else {
            self.transition(RunnerState::PartitionClosed);
            for task in self.partitions.drain(..) {
                if let Err(e) = task.await {
                    error!(pipeline = %self.name, error = %e, "Partition task failed");
                }
            }
        }

        self.transition(RunnerState::Terminated);
        self.state
    }

    fn spawn_partition(&mut self, assignment: PartitionAssignment, committer: Arc<dyn OffsetCommitter>) {
        info!(
            pipeline = %self.name,
            topic = %assignment.topic,
            partition = assignment.partition,
            "Starting partition task"
        );

        let name = self.name.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let dead_letter = self.dead_letter.clone();

        self.partitions.push(tokio::spawn(async move {
            let PartitionAssignment {
                topic,
                partition,
                mut messages,
            } = assignment;

            while let Some(message) = messages.recv().await {
                process_message(
                    &name,
                    &message,
                    dispatcher.as_ref(),
                    dead_letter.as_deref(),
                    committer.as_ref(),
                )
                .await;
            }

            info!(pipeline = %name, topic = %topic, partition, "Partition channel closed");
        }));
    }
}

/// Dispatch one message and mark its offset regardless of the outcome.
pub async fn process_message(
    pipeline: &str,
    message: &RawMessage,
    dispatcher: &dyn MessageHandler,
    dead_letter: Option<&dyn DeadLetterSink>,
    committer: &dyn OffsetCommitter,
) {
    let span = kafka_span!(pipeline, message);

    async {
        let timer = Timer::start(format!("{}:{}", pipeline, message.topic));

        if let Err(e) = dispatcher.handle(message).await {
            log_error!(
                e,
                "Failed to process message",
                pipeline = pipeline,
                topic = message.topic,
                partition = message.partition,
                offset = message.offset,
                payload = message.payload_lossy(),
            );

            if let Some(sink) = dead_letter {
                if let Err(dlq_err) = sink.send(DlqMessage::from_failure(pipeline, message, &e)).await {
                    log_error!(dlq_err, "Failed to send message to DLQ");
                }
            }
        }

        timer.stop();

        if let Err(e) = committer.commit(&message.topic, message.partition, message.offset) {
            log_error!(e, "Failed to mark offset", offset = message.offset);
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::kafka::source::ChannelPartitionSource;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct FailOn(i64);

    #[async_trait]
    impl MessageHandler for FailOn {
        async fn handle(&self, message: &RawMessage) -> Result<()> {
            if message.offset == self.0 {
                Err(Error::decode("bad payload"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_runner_marks_every_offset() {
        let (source, assignments) = ChannelPartitionSource::new();
        let commits = source.commits();
        let runner = ConsumerGroupRunner::new("test", source, Arc::new(FailOn(1)), None);

        let (tx, rx) = mpsc::channel(8);
        assignments
            .send(PartitionAssignment {
                topic: "t".to_string(),
                partition: 0,
                messages: rx,
            })
            .await
            .unwrap();
        for offset in 0..3 {
            tx.send(RawMessage::new("t", 0, offset, b"{}".to_vec())).await.unwrap();
        }
        drop(tx);
        drop(assignments);

        assert_eq!(runner.run().await, RunnerState::Terminated);
        let offsets: Vec<i64> = commits.committed().into_iter().map(|(_, _, o)| o).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_runner_interrupt() {
        let (source, _assignments) = ChannelPartitionSource::new();
        let runner = ConsumerGroupRunner::new("test", source, Arc::new(FailOn(-1)), None);
        assert_eq!(runner.state(), RunnerState::Starting);

        let state = runner.run_until(async {}).await;
        assert_eq!(state, RunnerState::Terminated);
    }
}
