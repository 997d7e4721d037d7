//! Dolphin CRM member sync

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::db::repository::EntityRepository;
use crate::error::{Error, Result};
use crate::kafka::{MessageHandler, RawMessage};
use crate::models::envelope::QueuePayload;
use crate::models::rows::DolphinLog;
use crate::services::{DolphinMember, DolphinService};

pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Member event named by the message key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DolphinKind {
    MemberRegistration,
    MemberUpdate,
    MemberActivation,
}

impl DolphinKind {
    /// Parse a `"<Kind>:<email>"` key
    pub fn parse_key(key: &str) -> Option<(Self, &str)> {
        let (kind, email) = key.split_once(':')?;
        let kind = match kind {
            "MemberRegistration" => DolphinKind::MemberRegistration,
            "MemberUpdate" => DolphinKind::MemberUpdate,
            "MemberActivation" => DolphinKind::MemberActivation,
            _ => return None,
        };
        Some((kind, email))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DolphinKind::MemberRegistration => "MemberRegistration",
            DolphinKind::MemberUpdate => "MemberUpdate",
            DolphinKind::MemberActivation => "MemberActivation",
        }
    }
}

pub struct DolphinHandler {
    dolphin: Arc<dyn DolphinService>,
    logs: Arc<dyn EntityRepository<DolphinLog>>,
}

impl DolphinHandler {
    pub fn new(dolphin: Arc<dyn DolphinService>, logs: Arc<dyn EntityRepository<DolphinLog>>) -> Self {
        Self { dolphin, logs }
    }
}

#[async_trait]
impl MessageHandler for DolphinHandler {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        let (kind, key_email) = match message.key_str().and_then(DolphinKind::parse_key) {
            Some(parsed) => parsed,
            None => {
                debug!(key = ?message.key_str(), "Ignoring member event without a known kind");
                return Ok(());
            },
        };
        tracing::Span::current().record("entity", kind.as_str());

        let envelope: QueuePayload<DolphinMember> =
            serde_json::from_slice(&message.value).map_err(|e| {
                error!(
                    kind = kind.as_str(),
                    error = %e,
                    payload = %message.payload_lossy(),
                    "Failed to decode member event"
                );
                Error::decode(format!("{}: {}", kind.as_str(), e))
            })?;

        let mut member = envelope.payload;
        if member.email.is_empty() {
            member.email = key_email.to_string();
        }

        match kind {
            DolphinKind::MemberRegistration => self.dolphin.register_member(&member).await?,
            DolphinKind::MemberUpdate => self.dolphin.update_member(&member).await?,
            DolphinKind::MemberActivation => self.dolphin.activate_member(&member).await?,
        }

        let log = DolphinLog {
            id: Uuid::new_v4().to_string(),
            member_id: member.member_id.clone(),
            email: member.email.clone(),
            event_type: kind.as_str().to_string(),
            status: STATUS_SUCCESS.to_string(),
            created_at: Utc::now(),
        };
        self.logs.save(&log).await?;

        info!(kind = kind.as_str(), email = %member.email, "Member synced to Dolphin");
        Ok(())
    }
}
