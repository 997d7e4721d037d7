//! GWS merchant and merchant-bank handlers
//!
//! The merchant path is the only one with side effects beyond its own
//! tables. Once the transaction commits, the merchant row is re-published
//! for the rest of the user-service and an audit entry goes to the Activity
//! Service. Both happen at most once and never fail the message.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::repository::{EntityRepository, MerchantRepository, MerchantUnitOfWork};
use crate::error::{Error, Result};
use crate::kafka::{MessageHandler, Publisher, RawMessage};
use crate::models::envelope::{GwsEnvelope, GwsEventClass};
use crate::models::gws::{GwsMasterMerchantBank, GwsMerchantData};
use crate::models::restructure::{gws_master_bank, gws_merchant, mark_merchant_deleted, GWS_SOURCE};
use crate::models::rows::{B2CMerchantBank, B2CMerchantDataV2, B2CMerchantDocument};
use crate::services::{ActivityService, TokenGenerator};

/// Activity log module name for merchant changes
pub const MERCHANT_MODULE: &str = "Merchant";

/// Event re-published after a GWS merchant write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMerchantEvent {
    pub event_type: String,
    pub producer: String,
    pub payload: B2CMerchantDataV2,
}

fn decode<T: serde::de::DeserializeOwned>(message: &RawMessage, what: &str) -> Result<GwsEnvelope<T>> {
    serde_json::from_slice(&message.value).map_err(|e| {
        error!(
            entity = what,
            error = %e,
            payload = %message.payload_lossy(),
            "Failed to decode GWS envelope"
        );
        Error::decode(format!("{}: {}", what, e))
    })
}

pub struct GwsMerchantHandler {
    merchants: Arc<dyn MerchantRepository>,
    publisher: Arc<dyn Publisher>,
    republish_topic: String,
    activity: Arc<dyn ActivityService>,
    tokens: Arc<dyn TokenGenerator>,
}

impl GwsMerchantHandler {
    pub fn new(
        merchants: Arc<dyn MerchantRepository>,
        publisher: Arc<dyn Publisher>,
        republish_topic: impl Into<String>,
        activity: Arc<dyn ActivityService>,
        tokens: Arc<dyn TokenGenerator>,
    ) -> Self {
        Self {
            merchants,
            publisher,
            republish_topic: republish_topic.into(),
            activity,
            tokens,
        }
    }

    async fn write(
        uow: &mut dyn MerchantUnitOfWork,
        class: GwsEventClass,
        row: &B2CMerchantDataV2,
        documents: &[B2CMerchantDocument],
    ) -> Result<()> {
        match class {
            GwsEventClass::Create => uow.insert_merchant(row).await?,
            GwsEventClass::Update | GwsEventClass::Delete => uow.update_merchant(row).await?,
        }
        uow.save_documents(documents).await?;
        Ok(())
    }

    async fn republish(&self, event_type: &str, row: &B2CMerchantDataV2) {
        let event = UpsertMerchantEvent {
            event_type: event_type.to_string(),
            producer: GWS_SOURCE.to_string(),
            payload: row.clone(),
        };

        let published = match serde_json::to_vec(&event) {
            Ok(value) => {
                self.publisher
                    .publish_kafka(&self.republish_topic, &row.id, &value)
                    .await
            },
            Err(e) => Err(e.into()),
        };

        if let Err(e) = published {
            warn!(merchant_id = %row.id, topic = %self.republish_topic, error = %e, "Failed to re-publish merchant");
        }
    }

    async fn audit(&self, class: GwsEventClass, old: Option<&B2CMerchantDataV2>, new: &B2CMerchantDataV2) {
        let token = match self.tokens.anonymous_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(merchant_id = %new.id, error = %e, "Failed to generate service token");
                return;
            },
        };

        if let Err(e) = self
            .activity
            .insert_log_merchant(&token, old, new, class.action(), MERCHANT_MODULE)
            .await
        {
            warn!(merchant_id = %new.id, error = %e, "Failed to write merchant activity log");
        }
    }
}

#[async_trait]
impl MessageHandler for GwsMerchantHandler {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        tracing::Span::current().record("entity", "gws_merchant");

        let envelope: GwsEnvelope<GwsMerchantData> = decode(message, "gws_merchant")?;
        let class = match GwsEventClass::classify(&envelope.event_type) {
            Some(class) => class,
            None => {
                debug!(event_type = %envelope.event_type, "Ignoring GWS merchant event");
                return Ok(());
            },
        };

        let (mut row, documents) = gws_merchant(envelope.data)?;
        if class == GwsEventClass::Delete {
            mark_merchant_deleted(&mut row, Utc::now());
        }

        let old = self.merchants.load_merchant(&row.id).await?;

        let mut uow = self.merchants.begin().await?;
        if let Err(e) = Self::write(uow.as_mut(), class, &row, &documents).await {
            error!(merchant_id = %row.id, error = %e, "Merchant write failed, rolling back");
            if let Err(rollback_err) = uow.rollback().await {
                warn!(merchant_id = %row.id, error = %rollback_err, "Rollback failed");
            }
            return Err(e);
        }
        uow.commit().await?;

        info!(
            merchant_id = %row.id,
            event_type = %envelope.event_type,
            documents = documents.len(),
            "GWS merchant synced"
        );

        self.republish(&envelope.event_type, &row).await;
        self.audit(class, old.as_ref(), &row).await;
        Ok(())
    }
}

pub struct GwsMerchantBankHandler {
    repo: Arc<dyn EntityRepository<B2CMerchantBank>>,
}

impl GwsMerchantBankHandler {
    pub fn new(repo: Arc<dyn EntityRepository<B2CMerchantBank>>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MessageHandler for GwsMerchantBankHandler {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        tracing::Span::current().record("entity", "gws_merchant_bank");

        let envelope: GwsEnvelope<GwsMasterMerchantBank> = decode(message, "gws_merchant_bank")?;
        let class = match GwsEventClass::classify(&envelope.event_type) {
            Some(class) => class,
            None => {
                debug!(event_type = %envelope.event_type, "Ignoring GWS merchant bank event");
                return Ok(());
            },
        };

        let row = gws_master_bank(envelope.data)?;
        match class {
            GwsEventClass::Create => self.repo.save(&row).await?,
            GwsEventClass::Update => self.repo.update(&row).await?,
            GwsEventClass::Delete => self.repo.soft_delete(&row.id.to_string()).await?,
        }

        debug!(bank_id = row.id, action = class.action(), "GWS merchant bank synced");
        Ok(())
    }
}
