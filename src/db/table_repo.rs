//! Generic Postgres table repository
//!
//! Rows are written as JSON objects expanded with `jsonb_populate_record`, so
//! one statement shape covers every replicated table:
//!
//! ```sql
//! INSERT INTO "t" ("c1", "c2") SELECT "c1", "c2"
//! FROM jsonb_populate_record(NULL::"t", $1)
//! ON CONFLICT ("id") DO UPDATE SET "c2" = EXCLUDED."c2"
//! ```

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::time::Duration;

use crate::db::repository::{
    EntityRepository, RepositoryError, RepositoryResult, RetryConfig, TableRow,
};
use crate::db::DbPool;
use crate::models::rows::*;

/// Columns an update never overwrites
pub const UPDATE_PRESERVED: &[&str] = &["created_at", "created_by"];

const SOFT_DELETE_COLUMN: &str = "is_deleted";

macro_rules! table_rows {
    ($($row:ty => $table:literal),* $(,)?) => {
        $(
            impl TableRow for $row {
                const TABLE: &'static str = $table;
                const KEY: &'static str = "id";

                fn key(&self) -> String {
                    self.id.to_string()
                }
            }
        )*
    };
}

table_rows! {
    B2BAccount => "b2b_account",
    B2BAccountContact => "b2b_account_contact",
    B2BAccountTemporary => "b2b_account_temporary",
    B2BContact => "b2b_contact",
    B2BAddress => "b2b_address",
    B2BPhone => "b2b_phone",
    B2BDocument => "b2b_document",
    B2BContactNpwp => "b2b_contact_npwp",
    B2BContactAddress => "b2b_contact_address",
    B2BContactTemp => "b2b_contact_temp",
    B2BLeads => "b2b_leads",
    B2BContactDocument => "b2b_contact_document",
    B2CMerchant => "b2c_merchant",
    B2CMerchantDataV2 => "b2c_merchant_data_v2",
    B2CMerchantDocument => "b2c_merchant_document",
    B2CMerchantBankAccount => "b2c_merchant_bank_account",
    B2CMerchantBank => "b2c_merchant_bank",
    ShippingAddress => "shipping_address",
}

impl TableRow for DolphinLog {
    const TABLE: &'static str = "dolphin_log";
    const KEY: &'static str = "id";
    const SOFT_DELETE: bool = false;

    fn key(&self) -> String {
        self.id.clone()
    }
}

pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Build the upsert statement for the given column list. Columns in
/// `preserve` are inserted but never overwritten on conflict.
pub(crate) fn upsert_sql(table: &str, key: &str, columns: &[&str], preserve: &[&str]) -> String {
    let table = quote(table);
    let column_list = columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");

    let assignments = columns
        .iter()
        .filter(|c| **c != key && !preserve.contains(c))
        .map(|c| format!("{col} = EXCLUDED.{col}", col = quote(c)))
        .collect::<Vec<_>>();

    let on_conflict = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    format!(
        "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) \
         ON CONFLICT ({key}) {on_conflict}",
        table = table,
        cols = column_list,
        key = quote(key),
        on_conflict = on_conflict,
    )
}

/// Flag one row as deleted by primary key, leaving every other column as is.
pub(crate) fn soft_delete_sql(table: &str, key: &str) -> String {
    format!(
        "UPDATE {table} SET {flag} = TRUE, \"modified_at\" = now() WHERE {key}::text = $1",
        table = quote(table),
        flag = quote(SOFT_DELETE_COLUMN),
        key = quote(key),
    )
}

/// Serialize a row into its column map
pub(crate) fn row_object<R: serde::Serialize>(row: &R) -> RepositoryResult<Map<String, Value>> {
    match serde_json::to_value(row)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Serialization(format!(
            "row serialized to {} instead of an object",
            other
        ))),
    }
}

/// Upsert one column map through any Postgres executor (pool or transaction).
pub(crate) async fn upsert_row<'e, E>(
    executor: E,
    table: &str,
    key: &str,
    row: Map<String, Value>,
    preserve: &[&str],
) -> RepositoryResult<u64>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = {
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        upsert_sql(table, key, &columns, preserve)
    };

    let result = sqlx::query(&sql)
        .bind(Value::Object(row))
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// PostgreSQL implementation of [`EntityRepository`] for any [`TableRow`]
pub struct PgTableRepository<R> {
    pool: DbPool,
    retry_config: RetryConfig,
    _row: PhantomData<fn() -> R>,
}

impl<R: TableRow> PgTableRepository<R> {
    pub fn new(pool: DbPool) -> Self {
        Self::with_retry_config(pool, RetryConfig::default())
    }

    /// Create with custom retry configuration
    pub fn with_retry_config(pool: DbPool, retry_config: RetryConfig) -> Self {
        Self {
            pool,
            retry_config,
            _row: PhantomData,
        }
    }

    /// Execute a query with retry logic
    async fn execute_with_retry<F, T>(&self, operation: F) -> RepositoryResult<T>
    where
        F: Fn() -> futures::future::BoxFuture<'static, Result<T, RepositoryError>>,
    {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry_config.initial_backoff_ms),
            max_interval: Duration::from_millis(self.retry_config.max_backoff_ms),
            multiplier: self.retry_config.multiplier,
            max_elapsed_time: Some(Duration::from_millis(self.retry_config.max_elapsed_ms)),
            ..Default::default()
        };

        retry(backoff, || async {
            match operation().await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(error = ?e, table = R::TABLE, "Retrying database operation");
                    Err(backoff::Error::transient(e))
                },
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn upsert(&self, row: Map<String, Value>, preserve: &'static [&'static str]) -> RepositoryResult<()> {
        let pool = self.pool.clone();

        self.execute_with_retry(|| {
            let pool = pool.clone();
            let row = row.clone();
            Box::pin(async move {
                upsert_row(&pool, R::TABLE, R::KEY, row, preserve).await?;
                Ok(())
            })
        })
        .await
    }

    /// Find a row by primary key
    pub async fn find(&self, key: &str) -> RepositoryResult<Option<R>> {
        let pool = self.pool.clone();
        let sql = format!(
            "SELECT to_jsonb(t) FROM {table} t WHERE {key}::text = $1",
            table = quote(R::TABLE),
            key = quote(R::KEY),
        );
        let key = key.to_string();

        let value = self
            .execute_with_retry(|| {
                let pool = pool.clone();
                let sql = sql.clone();
                let key = key.clone();
                Box::pin(async move {
                    let value = sqlx::query_scalar::<_, Value>(&sql)
                        .bind(key)
                        .fetch_optional(&pool)
                        .await?;
                    Ok(value)
                })
            })
            .await?;

        value
            .map(|v| serde_json::from_value(v).map_err(RepositoryError::from))
            .transpose()
    }
}

#[async_trait]
impl<R: TableRow> EntityRepository<R> for PgTableRepository<R> {
    async fn save(&self, row: &R) -> RepositoryResult<()> {
        self.upsert(row_object(row)?, &[]).await
    }

    async fn update(&self, row: &R) -> RepositoryResult<()> {
        self.upsert(row_object(row)?, UPDATE_PRESERVED).await
    }

    async fn soft_delete(&self, key: &str) -> RepositoryResult<()> {
        if !R::SOFT_DELETE {
            return Err(RepositoryError::QueryExecution(format!(
                "{} has no {} column",
                R::TABLE,
                SOFT_DELETE_COLUMN
            )));
        }

        let pool = self.pool.clone();
        let sql = soft_delete_sql(R::TABLE, R::KEY);
        let key = key.to_string();

        let affected = self
            .execute_with_retry(|| {
                let pool = pool.clone();
                let sql = sql.clone();
                let key = key.clone();
                Box::pin(async move {
                    let result = sqlx::query(&sql).bind(key).execute(&pool).await?;
                    Ok(result.rows_affected())
                })
            })
            .await?;

        if affected == 0 {
            tracing::debug!(table = R::TABLE, key = %key, "Soft delete matched no row");
        } else {
            tracing::debug!(table = R::TABLE, key = %key, "Soft deleted row");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_upsert_sql_shape() {
        let sql = upsert_sql("b2c_merchant", "id", &["id", "merchant_name", "created_at"], &[]);
        assert_eq!(
            sql,
            "INSERT INTO \"b2c_merchant\" (\"id\", \"merchant_name\", \"created_at\") \
             SELECT \"id\", \"merchant_name\", \"created_at\" \
             FROM jsonb_populate_record(NULL::\"b2c_merchant\", $1) \
             ON CONFLICT (\"id\") DO UPDATE SET \"merchant_name\" = EXCLUDED.\"merchant_name\", \
             \"created_at\" = EXCLUDED.\"created_at\""
        );
    }

    #[test]
    fn test_upsert_sql_preserves_columns() {
        let sql = upsert_sql("t", "id", &["id", "name", "created_at"], UPDATE_PRESERVED);
        assert!(sql.contains("\"name\" = EXCLUDED.\"name\""));
        assert!(!sql.contains("\"created_at\" = EXCLUDED"));
    }

    #[test]
    fn test_upsert_sql_key_only_does_nothing() {
        let sql = upsert_sql("t", "id", &["id"], &[]);
        assert!(sql.ends_with("ON CONFLICT (\"id\") DO NOTHING"));
    }

    #[test]
    fn test_soft_delete_sql_touches_only_the_flag() {
        let sql = soft_delete_sql("b2c_merchant", "id");
        assert_eq!(
            sql,
            "UPDATE \"b2c_merchant\" SET \"is_deleted\" = TRUE, \"modified_at\" = now() \
             WHERE \"id\"::text = $1"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_row_object_uses_column_names() {
        let log = DolphinLog {
            id: "log-1".to_string(),
            member_id: None,
            email: "a@b.c".to_string(),
            event_type: "MemberUpdate".to_string(),
            status: "SUCCESS".to_string(),
            created_at: Utc::now(),
        };
        let object = row_object(&log).unwrap();
        assert!(object.contains_key("event_type"));
        assert!(!object.contains_key(SOFT_DELETE_COLUMN));
        assert_eq!(log.key(), "log-1");
        assert_eq!(<DolphinLog as TableRow>::TABLE, "dolphin_log");
        assert!(!<DolphinLog as TableRow>::SOFT_DELETE);
        assert!(<B2CMerchant as TableRow>::SOFT_DELETE);
    }
}
