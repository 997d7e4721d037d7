//! rdkafka client configuration

use crate::config::KafkaConfig;

/// Consumer configuration for one pipeline.
///
/// Offsets are stored explicitly after each message (`enable.auto.offset.store`
/// off) and the stored offsets are committed in the background by librdkafka.
pub fn consumer_config(kafka: &KafkaConfig, brokers: &str, group_id: &str) -> rdkafka::ClientConfig {
    let mut config = rdkafka::ClientConfig::new();

    config
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "true")
        .set("auto.commit.interval.ms", kafka.auto_commit_interval_ms.to_string())
        .set("enable.auto.offset.store", "false")
        .set("session.timeout.ms", kafka.session_timeout_ms.to_string())
        .set("auto.offset.reset", &kafka.auto_offset_reset)
        .set("enable.partition.eof", "false");

    config
}

/// Producer configuration for the re-publish topic and the dead-letter topic
pub fn producer_config(brokers: &str) -> rdkafka::ClientConfig {
    let mut config = rdkafka::ClientConfig::new();

    config
        .set("bootstrap.servers", brokers)
        .set("message.timeout.ms", "30000")
        .set("enable.idempotence", "true")
        .set("acks", "all");

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka() -> KafkaConfig {
        KafkaConfig {
            broker_1: "broker1:9092".to_string(),
            broker_2: String::new(),
            broker_3: String::new(),
            cdc_broker: "cdc:9092".to_string(),
            group_shark: "shark".to_string(),
            group_cdc: "cdc".to_string(),
            group_gws: "gws".to_string(),
            group_worker: "worker".to_string(),
            group_dolphin: "dolphin".to_string(),
            session_timeout_ms: 45000,
            auto_commit_interval_ms: 2000,
            auto_offset_reset: "latest".to_string(),
            dead_letter_topic: String::new(),
            partition_buffer: 16,
        }
    }

    #[test]
    fn test_consumer_config_stores_offsets_explicitly() {
        let config = consumer_config(&kafka(), "cdc:9092", "user-service-cdc");
        assert_eq!(config.get("bootstrap.servers"), Some("cdc:9092"));
        assert_eq!(config.get("group.id"), Some("user-service-cdc"));
        assert_eq!(config.get("enable.auto.offset.store"), Some("false"));
        assert_eq!(config.get("enable.auto.commit"), Some("true"));
        assert_eq!(config.get("auto.commit.interval.ms"), Some("2000"));
        assert_eq!(config.get("session.timeout.ms"), Some("45000"));
        assert_eq!(config.get("auto.offset.reset"), Some("latest"));
    }

    #[test]
    fn test_producer_config() {
        let config = producer_config("broker1:9092");
        assert_eq!(config.get("bootstrap.servers"), Some("broker1:9092"));
        assert_eq!(config.get("acks"), Some("all"));
    }
}
