//! Database connection pool management for user-sync
//!
//! This module provides connection pooling using SQLx with configuration
//! options for connection limits and timeouts.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Type alias for the database connection pool
pub type DbPool = PgPool;

/// Create a new database connection pool
///
/// # Arguments
/// * `config` - Database configuration
///
/// # Returns
/// A configured connection pool ready for use
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let connect_options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| Error::config(format!("Invalid database URL: {}", e)))?
        .application_name("user-sync")
        .log_statements(tracing::log::LevelFilter::Debug)
        .statement_cache_capacity(100);

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_max_size)
        .min_connections(config.pool_min_idle)
        .acquire_timeout(config.pool_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .test_before_acquire(true)
        .max_lifetime(Some(Duration::from_secs(3600)))
        .connect_with(connect_options)
        .await
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    health_check(&pool).await?;

    tracing::info!(
        max_connections = config.pool_max_size,
        min_idle = config.pool_min_idle,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Pool health check
///
/// Verifies that the pool can acquire a connection and execute a simple query.
pub async fn health_check(pool: &DbPool) -> Result<()> {
    let start = std::time::Instant::now();

    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::database(format!("Health check failed: {}", e)))?;

    let elapsed = start.elapsed();

    if elapsed > Duration::from_secs(1) {
        tracing::warn!(
            elapsed_ms = elapsed.as_millis(),
            "Database health check slow"
        );
    }

    Ok(())
}
