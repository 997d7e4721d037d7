//! Integration tests for the Kafka partition source and publisher
//!
//! These need a broker on localhost:9092 and are ignored by default.

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use user_sync::config::KafkaConfig;
use user_sync::kafka::config::{consumer_config, producer_config};
use user_sync::kafka::{
    ConsumerGroupRunner, DeadLetterSink, KafkaDeadLetterSink, KafkaPartitionSource, KafkaPublisher,
    Publisher, TopicRouter,
};
use user_sync::models::rows::B2CMerchant;
use user_sync::pipeline::cdc_router;
use user_sync::test_utils::InMemoryStore;
use user_sync::topics::CdcTopics;
use uuid::Uuid;

/// Test Kafka broker address
const TEST_KAFKA_BROKER: &str = "localhost:9092";

/// Create test topics for integration testing
async fn create_test_topics(topics: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let admin: AdminClient<DefaultClientContext> =
        ClientConfig::new().set("bootstrap.servers", TEST_KAFKA_BROKER).create()?;

    let new_topics: Vec<NewTopic> = topics
        .iter()
        .map(|topic| NewTopic::new(topic, 1, TopicReplication::Fixed(1)))
        .collect();

    let results = admin.create_topics(&new_topics, &AdminOptions::new()).await?;

    for result in results {
        if let Err((topic, err)) = result {
            // Ignore if topic already exists
            if !err.to_string().contains("already exists") {
                return Err(format!("Failed to create topic {}: {}", topic, err).into());
            }
        }
    }

    Ok(())
}

fn kafka_config() -> KafkaConfig {
    KafkaConfig {
        broker_1: TEST_KAFKA_BROKER.to_string(),
        broker_2: String::new(),
        broker_3: String::new(),
        cdc_broker: TEST_KAFKA_BROKER.to_string(),
        group_shark: "test-shark".to_string(),
        group_cdc: format!("test-cdc-{}", Uuid::new_v4()),
        group_gws: "test-gws".to_string(),
        group_worker: "test-worker".to_string(),
        group_dolphin: "test-dolphin".to_string(),
        session_timeout_ms: 10000,
        auto_commit_interval_ms: 500,
        auto_offset_reset: "earliest".to_string(),
        dead_letter_topic: String::new(),
        partition_buffer: 16,
    }
}

fn cdc_topics(merchant: &str) -> CdcTopics {
    CdcTopics {
        merchant: merchant.to_string(),
        merchant_document: format!("{}-document", merchant),
        merchant_bank: format!("{}-bank", merchant),
        shipping_address: format!("{}-shipping", merchant),
        contact_document: format!("{}-contact-document", merchant),
    }
}

#[tokio::test]
#[ignore] // Requires Kafka to be running
async fn test_cdc_pipeline_consumes_from_kafka() {
    let topic = format!("test-cdc-merchant-{}", Uuid::new_v4());
    create_test_topics(&[&topic]).await.unwrap();

    let publisher = KafkaPublisher::new(producer_config(TEST_KAFKA_BROKER)).unwrap();
    let event = json!({"payload": {"after": {"id": "MCH1701", "merchantName": "Acme"}, "op": "c"}});
    publisher
        .publish_kafka(&topic, "MCH1701", &serde_json::to_vec(&event).unwrap())
        .await
        .unwrap();

    let kafka = kafka_config();
    let store = InMemoryStore::new();
    let router: Arc<TopicRouter> = Arc::new(cdc_router(&cdc_topics(&topic), &store));
    let source = KafkaPartitionSource::new(
        "cdc",
        consumer_config(&kafka, TEST_KAFKA_BROKER, &kafka.group_cdc),
        &[topic.clone()],
        kafka.partition_buffer,
    )
    .unwrap();
    let runner = ConsumerGroupRunner::new("cdc", source, router, None);
    let handle = tokio::spawn(runner.run());

    let mut found = None;
    for _ in 0..30 {
        found = store.get::<B2CMerchant>("MCH1701");
        if found.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    handle.abort();

    assert_eq!(found.unwrap().merchant_name.as_deref(), Some("Acme"));
}

#[tokio::test]
#[ignore] // Requires Kafka to be running
async fn test_dead_letter_sink_publishes() {
    let dlq_topic = format!("test-dlq-{}", Uuid::new_v4());
    create_test_topics(&[&dlq_topic]).await.unwrap();

    let publisher = KafkaPublisher::new(producer_config(TEST_KAFKA_BROKER)).unwrap();
    let sink = KafkaDeadLetterSink::new(publisher, &dlq_topic);
    let message = user_sync::kafka::RawMessage::new("cdc.merchant", 0, 3, b"garbage".to_vec());
    let error = user_sync::Error::decode("expected value");

    let result = sink
        .send(user_sync::kafka::DlqMessage::from_failure("cdc", &message, &error))
        .await;
    assert!(result.is_ok());
}
