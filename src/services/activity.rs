//! Activity Service client

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::rows::B2CMerchantDataV2;

const LOG_PATH: &str = "/api/v1/activity-log";

/// Audit trail of merchant changes
#[async_trait]
pub trait ActivityService: Send + Sync {
    async fn insert_log_merchant(
        &self,
        token: &str,
        old: Option<&B2CMerchantDataV2>,
        new: &B2CMerchantDataV2,
        action: &str,
        module: &str,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityLogRequest<'a> {
    module: &'a str,
    action: &'a str,
    object_id: &'a str,
    before: Value,
    after: Value,
    created_at: chrono::DateTime<Utc>,
}

pub struct HttpActivityService {
    client: Client,
    base_url: String,
}

impl HttpActivityService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ActivityService for HttpActivityService {
    async fn insert_log_merchant(
        &self,
        token: &str,
        old: Option<&B2CMerchantDataV2>,
        new: &B2CMerchantDataV2,
        action: &str,
        module: &str,
    ) -> Result<()> {
        let body = ActivityLogRequest {
            module,
            action,
            object_id: &new.id,
            before: old.map(serde_json::to_value).transpose()?.unwrap_or(Value::Null),
            after: serde_json::to_value(new)?,
            created_at: Utc::now(),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOG_PATH))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!(
                "Activity service returned {} for {} {}",
                status, module, new.id
            )));
        }

        debug!(merchant_id = %new.id, action = action, "Activity log written");
        Ok(())
    }
}
