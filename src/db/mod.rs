//! Database module for user-sync
//!
//! This module provides database connectivity, connection pooling,
//! and the repository implementations the pipelines write through.

pub mod merchant_repo;
pub mod pool;
pub mod repository;
pub mod table_repo;

// Re-export commonly used types
pub use merchant_repo::PgMerchantRepository;
pub use pool::{create_pool, health_check, DbPool};
pub use repository::{
    EntityRepository, MerchantRepository, MerchantUnitOfWork, RepositoryError, RepositoryResult,
    RetryConfig, TableRow,
};
pub use table_repo::PgTableRepository;

use sqlx::migrate::Migrator;

/// Database migrator for running schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
