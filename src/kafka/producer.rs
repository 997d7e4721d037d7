//! Kafka producers: the downstream publisher and the dead-letter sink

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{DlqMessage, KafkaIntegrationError};
use crate::error::{Error, Result};

/// Re-publishes derived events after a local write
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_kafka(&self, topic: &str, key: &str, value: &[u8]) -> Result<()>;
}

/// Receives messages whose processing failed
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, message: DlqMessage) -> Result<()>;
}

/// FutureProducer-backed publisher
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .create()
            .map_err(|e| Error::from(KafkaIntegrationError::ConnectionError(e)))?;

        Ok(Self {
            producer,
            send_timeout: Duration::from_secs(30),
        })
    }

    /// Flush any pending messages
    pub fn flush(&self) {
        if let Err(e) = self.producer.flush(self.send_timeout) {
            error!(error = %e, "Failed to flush producer");
        }
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish_kafka(&self, topic: &str, key: &str, value: &[u8]) -> Result<()> {
        let record = FutureRecord::to(topic).payload(value).key(key);

        match self.producer.send(record, self.send_timeout).await {
            Ok(_) => {
                debug!(topic = topic, key = key, "Published message");
                Ok(())
            },
            Err((kafka_error, _)) => Err(Error::from(KafkaIntegrationError::PublishError(
                format!("Failed to publish to '{}': {}", topic, kafka_error),
            ))),
        }
    }
}

/// Dead-letter sink writing JSON [`DlqMessage`]s to one topic
pub struct KafkaDeadLetterSink {
    publisher: KafkaPublisher,
    dlq_topic: String,
}

impl KafkaDeadLetterSink {
    pub fn new(publisher: KafkaPublisher, dlq_topic: impl Into<String>) -> Self {
        Self {
            publisher,
            dlq_topic: dlq_topic.into(),
        }
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn send(&self, message: DlqMessage) -> Result<()> {
        let payload = serde_json::to_vec(&message).map_err(|e| {
            Error::from(KafkaIntegrationError::DlqError(format!(
                "Failed to serialize DLQ message: {}",
                e
            )))
        })?;

        // Key by origin so one partition's failures stay together
        let key = format!("{}-{}-{}", message.source_topic, message.partition, message.offset);

        self.publisher
            .publish_kafka(&self.dlq_topic, &key, &payload)
            .await
            .map_err(|e| Error::from(KafkaIntegrationError::DlqError(e.to_string())))?;

        info!(
            dlq_topic = %self.dlq_topic,
            source_topic = %message.source_topic,
            partition = message.partition,
            offset = message.offset,
            "Sent message to DLQ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::config::producer_config;

    #[tokio::test]
    async fn test_publisher_creation() {
        let result = KafkaPublisher::new(producer_config("localhost:9092"));
        assert!(result.is_ok());
    }

    // Integration test would require a running Kafka instance
    #[ignore]
    #[tokio::test]
    async fn test_publish_to_kafka() {
        let publisher = KafkaPublisher::new(producer_config("localhost:9092")).unwrap();
        let result = publisher
            .publish_kafka("user-service.merchant", "MCH1", br#"{"eventType":"merchantCreated"}"#)
            .await;
        assert!(result.is_ok());
    }
}
