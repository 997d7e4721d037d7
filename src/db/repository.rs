//! Repository abstractions for user-sync
//!
//! This module defines the repository traits the handlers write through, and
//! the error and retry types shared by the Postgres implementations.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::rows::{B2CMerchantDataV2, B2CMerchantDocument};

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Entity not found
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Row could not be converted to or from its JSON column map
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RepositoryError::Connection(_) | RepositoryError::Timeout(_) => true,
            RepositoryError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::NotFound(_) | RepositoryError::Database(sqlx::Error::RowNotFound)
        )
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Convert repository errors to application errors
impl From<RepositoryError> for crate::error::Error {
    fn from(err: RepositoryError) -> Self {
        crate::error::Error::database(err.to_string())
    }
}

/// A row persisted in one table, keyed by one primary-key column.
///
/// The row's serde field names are the table's column names.
pub trait TableRow: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY: &'static str;

    /// Whether the table carries an `is_deleted` flag
    const SOFT_DELETE: bool = true;

    /// Primary key rendered as text
    fn key(&self) -> String;
}

/// Per-entity write surface used by the CDC handlers.
///
/// Every operation is keyed by primary key, so redelivery of the same event
/// is harmless.
#[async_trait]
pub trait EntityRepository<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    /// Persist a created (or snapshot) image
    async fn save(&self, row: &R) -> RepositoryResult<()>;

    /// Persist an updated image, keeping the stored creation audit columns
    async fn update(&self, row: &R) -> RepositoryResult<()>;

    /// Flag the row with this primary key as deleted. No other column
    /// changes; a key with no stored row is a no-op.
    async fn soft_delete(&self, key: &str) -> RepositoryResult<()>;
}

/// Merchant aggregate storage used by the GWS and worker paths
#[async_trait]
pub trait MerchantRepository: Send + Sync {
    /// Current merchant row, if any
    async fn load_merchant(&self, id: &str) -> RepositoryResult<Option<B2CMerchantDataV2>>;

    /// Start a unit of work spanning the merchant row and its documents
    async fn begin(&self) -> RepositoryResult<Box<dyn MerchantUnitOfWork>>;
}

/// One open merchant transaction. Dropping it without `commit` discards the
/// writes.
#[async_trait]
pub trait MerchantUnitOfWork: Send {
    async fn insert_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()>;

    async fn update_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()>;

    async fn save_documents(&mut self, documents: &[B2CMerchantDocument]) -> RepositoryResult<()>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

/// Retry configuration for repository operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Give up after this many milliseconds in total
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            multiplier: 2.0,
            max_elapsed_ms: 30000,
        }
    }
}

impl RetryConfig {
    /// Set the initial backoff
    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Set the maximum backoff
    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_elapsed(mut self, ms: u64) -> Self {
        self.max_elapsed_ms = ms;
        self
    }
}
