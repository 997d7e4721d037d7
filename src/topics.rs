//! Topic registry
//!
//! Resolves the Kafka topic names each pipeline subscribes to from the
//! environment. Everything is read once at startup; a missing variable is a
//! fatal configuration error.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shark legacy CDC topics (account and contact tables).
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct SharkTopics {
    #[envconfig(from = "TOPIC_SHARK_ACCOUNT")]
    pub account: String,

    #[envconfig(from = "TOPIC_SHARK_ACCOUNT_CONTACT")]
    pub account_contact: String,

    #[envconfig(from = "TOPIC_SHARK_ACCOUNT_TEMPORARY")]
    pub account_temporary: String,

    #[envconfig(from = "TOPIC_SHARK_CONTACT")]
    pub contact: String,

    #[envconfig(from = "TOPIC_SHARK_ADDRESS")]
    pub address: String,

    #[envconfig(from = "TOPIC_SHARK_PHONE")]
    pub phone: String,

    #[envconfig(from = "TOPIC_SHARK_DOCUMENT")]
    pub document: String,

    #[envconfig(from = "TOPIC_SHARK_CONTACT_NPWP")]
    pub contact_npwp: String,

    #[envconfig(from = "TOPIC_SHARK_CONTACT_ADDRESS")]
    pub contact_address: String,

    #[envconfig(from = "TOPIC_SHARK_CONTACT_TEMP")]
    pub contact_temp: String,

    #[envconfig(from = "TOPIC_SHARK_LEADS")]
    pub leads: String,
}

impl SharkTopics {
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.account.clone(),
            self.account_contact.clone(),
            self.account_temporary.clone(),
            self.contact.clone(),
            self.address.clone(),
            self.phone.clone(),
            self.document.clone(),
            self.contact_npwp.clone(),
            self.contact_address.clone(),
            self.contact_temp.clone(),
            self.leads.clone(),
        ]
    }
}

/// CDC topics for the merchant-side tables, read from the CDC broker.
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct CdcTopics {
    #[envconfig(from = "KAFKA_SHARK_MERCHANT")]
    pub merchant: String,

    #[envconfig(from = "KAFKA_SHARK_MERCHANT_DOCUMENT")]
    pub merchant_document: String,

    #[envconfig(from = "KAFKA_SHARK_MERCHANT_BANK")]
    pub merchant_bank: String,

    #[envconfig(from = "KAFKA_SHARK_SHIPPING_ADDRESS")]
    pub shipping_address: String,

    #[envconfig(from = "KAFKA_SHARK_CONTACT_DOCUMENT")]
    pub contact_document: String,
}

impl CdcTopics {
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.merchant.clone(),
            self.merchant_document.clone(),
            self.merchant_bank.clone(),
            self.shipping_address.clone(),
            self.contact_document.clone(),
        ]
    }
}

/// GWS merchant management topics.
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct GwsTopics {
    #[envconfig(from = "KAFKA_GWS_MERCHANT")]
    pub merchant: String,

    #[envconfig(from = "KAFKA_GWS_MERCHANT_BANK")]
    pub merchant_bank: String,

    /// Where the normalized merchant row is re-published after a GWS upsert
    #[envconfig(from = "KAFKA_USER_SERVICE_MERCHANT_TOPIC")]
    pub merchant_republish: String,

    /// Whether the GWS merchant topic is subscribed at all
    #[envconfig(from = "SYNC_MERCHANT_FROM_GWS", default = "false")]
    pub sync_merchant: bool,
}

impl GwsTopics {
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = Vec::with_capacity(2);
        if self.sync_merchant {
            topics.push(self.merchant.clone());
        }
        topics.push(self.merchant_bank.clone());
        topics
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct WorkerTopics {
    #[envconfig(from = "KAFKA_WORKER_TOPIC")]
    pub worker: String,
}

impl WorkerTopics {
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.worker.clone()]
    }
}

/// Member lifecycle topic forwarded to Dolphin CRM.
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct DolphinTopics {
    #[envconfig(from = "KAFKA_USER_SERVICE_TOPIC")]
    pub member: String,

    /// Whether the dolphin pipeline starts at all
    #[envconfig(from = "ENABLE_CONSUMER_MEMBER_DOLPHIN", default = "false")]
    pub enabled: bool,
}

impl DolphinTopics {
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.member.clone()]
    }
}

/// Every topic set, one per pipeline
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct TopicRegistry {
    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub shark: SharkTopics,

    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub cdc: CdcTopics,

    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub gws: GwsTopics,

    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub worker: WorkerTopics,

    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub dolphin: DolphinTopics,
}

impl TopicRegistry {
    /// Resolve all topic names from the environment
    pub fn load() -> Result<Self> {
        let registry = Self::init_from_env().map_err(Error::from)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Reject topic variables that are set but empty
    pub fn validate(&self) -> Result<()> {
        let mut all = self.shark.subscriptions();
        all.extend(self.cdc.subscriptions());
        all.push(self.gws.merchant.clone());
        all.push(self.gws.merchant_bank.clone());
        all.push(self.gws.merchant_republish.clone());
        all.extend(self.worker.subscriptions());
        all.extend(self.dolphin.subscriptions());

        if all.iter().any(|topic| topic.trim().is_empty()) {
            return Err(Error::config("Topic names cannot be empty"));
        }
        Ok(())
    }
}
