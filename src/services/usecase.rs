//! Worker use cases
//!
//! Operations other parts of the user-service enqueue on the worker topic.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::dolphin::{DolphinMember, DolphinService};
use crate::db::repository::{EntityRepository, MerchantRepository};
use crate::error::Result;
use crate::models::rows::{B2CMerchantDataV2, ShippingAddress};

#[async_trait]
pub trait WorkerUsecases: Send + Sync {
    async fn upsert_merchant(&self, merchant: B2CMerchantDataV2) -> Result<()>;

    async fn sync_member_dolphin(&self, member: DolphinMember) -> Result<()>;

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<()>;
}

pub struct RepositoryWorkerUsecases {
    merchants: Arc<dyn MerchantRepository>,
    dolphin: Arc<dyn DolphinService>,
    shipping: Arc<dyn EntityRepository<ShippingAddress>>,
}

impl RepositoryWorkerUsecases {
    pub fn new(
        merchants: Arc<dyn MerchantRepository>,
        dolphin: Arc<dyn DolphinService>,
        shipping: Arc<dyn EntityRepository<ShippingAddress>>,
    ) -> Self {
        Self {
            merchants,
            dolphin,
            shipping,
        }
    }
}

#[async_trait]
impl WorkerUsecases for RepositoryWorkerUsecases {
    /// Insert when the merchant is new, otherwise update in place.
    async fn upsert_merchant(&self, merchant: B2CMerchantDataV2) -> Result<()> {
        let exists = self.merchants.load_merchant(&merchant.id).await?.is_some();

        let mut uow = self.merchants.begin().await?;
        let written = if exists {
            uow.update_merchant(&merchant).await
        } else {
            uow.insert_merchant(&merchant).await
        };

        if let Err(e) = written {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(merchant_id = %merchant.id, error = %rollback_err, "Rollback failed");
            }
            return Err(e.into());
        }
        uow.commit().await?;

        info!(merchant_id = %merchant.id, updated = exists, "Merchant upserted from worker");
        Ok(())
    }

    /// Members without a CRM id have never been registered.
    async fn sync_member_dolphin(&self, member: DolphinMember) -> Result<()> {
        match member.member_id {
            Some(_) => self.dolphin.update_member(&member).await,
            None => self.dolphin.register_member(&member).await,
        }
    }

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<()> {
        self.shipping.save(&address).await?;
        Ok(())
    }
}
