//! Worker topic dispatcher

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::kafka::{MessageHandler, RawMessage};
use crate::models::envelope::QueuePayload;
use crate::services::WorkerUsecases;

pub const UPSERT_MERCHANT: &str = "UpsertMerchant";
pub const SYNC_MEMBER_DOLPHIN: &str = "SyncMemberDolphin";
pub const UPSERT_SHIPPING_ADDRESS: &str = "UpsertShippingAddress";

pub struct WorkerHandler {
    usecases: Arc<dyn WorkerUsecases>,
}

impl WorkerHandler {
    pub fn new(usecases: Arc<dyn WorkerUsecases>) -> Self {
        Self { usecases }
    }
}

fn payload<T: DeserializeOwned>(event_type: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::decode(format!("{} payload: {}", event_type, e)))
}

#[async_trait]
impl MessageHandler for WorkerHandler {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        let envelope: QueuePayload<Value> = serde_json::from_slice(&message.value).map_err(|e| {
            error!(error = %e, payload = %message.payload_lossy(), "Failed to decode worker event");
            Error::decode(format!("worker: {}", e))
        })?;

        let event_type = envelope.event_type.as_str();
        tracing::Span::current().record("entity", event_type);

        match event_type {
            UPSERT_MERCHANT => {
                self.usecases
                    .upsert_merchant(payload(event_type, envelope.payload)?)
                    .await
            },
            SYNC_MEMBER_DOLPHIN => {
                self.usecases
                    .sync_member_dolphin(payload(event_type, envelope.payload)?)
                    .await
            },
            UPSERT_SHIPPING_ADDRESS => {
                self.usecases
                    .upsert_shipping_address(payload(event_type, envelope.payload)?)
                    .await
            },
            other => {
                debug!(event_type = other, "Ignoring worker event");
                Ok(())
            },
        }
    }
}
