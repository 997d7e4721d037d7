//! Kafka integration module for the ingestion pipelines
//!
//! This module provides:
//! - Partition sources that fan a consumer group out into one channel per
//!   assigned partition, plus the offset commit capability for them
//! - The consumer group runner that drains each partition sequentially
//! - Topic routing to message handlers
//! - The downstream publisher and the optional dead-letter sink

pub mod config;
pub mod consumer;
pub mod producer;
pub mod router;
pub mod source;

pub use consumer::{ConsumerGroupRunner, RunnerState};
pub use producer::{DeadLetterSink, KafkaDeadLetterSink, KafkaPublisher, Publisher};
pub use router::{MessageHandler, TopicRouter};
pub use source::{
    ChannelPartitionSource, KafkaPartitionSource, OffsetCommitter, PartitionAssignment,
    PartitionDemux, PartitionSource,
};

use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Kafka-specific error types
#[derive(Debug, Error)]
pub enum KafkaIntegrationError {
    #[error("Kafka connection error: {0}")]
    ConnectionError(#[from] KafkaError),

    #[error("Offset store failed: {0}")]
    OffsetCommitError(String),

    #[error("Publish failed: {0}")]
    PublishError(String),

    #[error("DLQ send failed: {0}")]
    DlqError(String),
}

impl From<KafkaIntegrationError> for Error {
    fn from(err: KafkaIntegrationError) -> Self {
        Error::kafka(err.to_string())
    }
}

/// One consumed message, detached from the consumer that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            value: value.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Message key as UTF-8, if present and valid
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_deref().and_then(|k| std::str::from_utf8(k).ok())
    }

    /// Payload rendered for logs
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

impl<'a> From<&BorrowedMessage<'a>> for RawMessage {
    fn from(message: &BorrowedMessage<'a>) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(|k| k.to_vec()),
            value: message.payload().map(|p| p.to_vec()).unwrap_or_default(),
        }
    }
}

/// Dead Letter Queue message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    /// Pipeline that consumed the message
    pub pipeline: String,

    /// Original message payload that failed processing
    pub original_message: Vec<u8>,

    /// Original message key
    pub original_key: Option<Vec<u8>>,

    /// Error description
    pub error: String,

    /// Error type/category
    pub error_type: String,

    /// Whether redelivery would fail the same way
    pub permanent: bool,

    /// Timestamp when the error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Source Kafka partition
    pub partition: i32,

    /// Source Kafka offset
    pub offset: i64,

    /// Source topic
    pub source_topic: String,
}

impl DlqMessage {
    pub fn from_failure(pipeline: &str, message: &RawMessage, error: &Error) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            original_message: message.value.clone(),
            original_key: message.key.clone(),
            error: error.to_string(),
            error_type: error.kind().to_string(),
            permanent: error.is_permanent(),
            timestamp: chrono::Utc::now(),
            partition: message.partition,
            offset: message.offset,
            source_topic: message.topic.clone(),
        }
    }
}
