//! Merchant repository implementation for user-sync
//!
//! The GWS merchant row and its documents are written in one explicit sqlx
//! transaction. Loads go through the generic table repository.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::db::repository::{
    MerchantRepository, MerchantUnitOfWork, RepositoryError, RepositoryResult, TableRow,
};
use crate::db::table_repo::{row_object, upsert_row, PgTableRepository, UPDATE_PRESERVED};
use crate::db::DbPool;
use crate::models::rows::{B2CMerchantDataV2, B2CMerchantDocument};

/// PostgreSQL implementation of MerchantRepository
pub struct PgMerchantRepository {
    pool: DbPool,
    merchants: PgTableRepository<B2CMerchantDataV2>,
}

impl PgMerchantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            merchants: PgTableRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl MerchantRepository for PgMerchantRepository {
    async fn load_merchant(&self, id: &str) -> RepositoryResult<Option<B2CMerchantDataV2>> {
        self.merchants.find(id).await
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn MerchantUnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("Failed to begin: {}", e)))?;

        Ok(Box::new(PgMerchantUnitOfWork { tx }))
    }
}

/// Open merchant transaction
pub struct PgMerchantUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgMerchantUnitOfWork {
    async fn write_merchant(
        &mut self,
        row: &B2CMerchantDataV2,
        preserve: &[&str],
    ) -> RepositoryResult<()> {
        upsert_row(
            &mut *self.tx,
            B2CMerchantDataV2::TABLE,
            B2CMerchantDataV2::KEY,
            row_object(row)?,
            preserve,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MerchantUnitOfWork for PgMerchantUnitOfWork {
    async fn insert_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()> {
        self.write_merchant(row, &[]).await
    }

    async fn update_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()> {
        self.write_merchant(row, UPDATE_PRESERVED).await
    }

    async fn save_documents(&mut self, documents: &[B2CMerchantDocument]) -> RepositoryResult<()> {
        for document in documents {
            upsert_row(
                &mut *self.tx,
                B2CMerchantDocument::TABLE,
                B2CMerchantDocument::KEY,
                row_object(document)?,
                UPDATE_PRESERVED,
            )
            .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("Failed to commit: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("Failed to roll back: {}", e)))
    }
}
