//! Test utilities for user-sync
//!
//! In-memory stand-ins for the repositories and outbound services, with
//! failure injection. The table store keeps rows as the same JSON column
//! maps the Postgres repositories write, so upsert, update and soft-delete
//! semantics match.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::repository::{
    EntityRepository, MerchantRepository, MerchantUnitOfWork, RepositoryError, RepositoryResult,
    TableRow,
};
use crate::db::table_repo::{row_object, UPDATE_PRESERVED};
use crate::error::{Error, Result};
use crate::kafka::{DeadLetterSink, Publisher};
use crate::kafka::DlqMessage;
use crate::models::rows::{B2CMerchantDataV2, B2CMerchantDocument, ShippingAddress};
use crate::pipeline::{RepositoryProvider, Services};
use crate::services::{ActivityService, DolphinMember, DolphinService, TokenGenerator, WorkerUsecases};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One-shot failure switch
#[derive(Debug, Clone, Default)]
pub struct FailSwitch(Arc<Mutex<Option<String>>>);

impl FailSwitch {
    pub fn arm(&self, message: &str) {
        *lock(&self.0) = Some(message.to_string());
    }

    fn take(&self) -> Option<String> {
        lock(&self.0).take()
    }

    fn check_repository(&self) -> RepositoryResult<()> {
        match self.take() {
            Some(message) => Err(RepositoryError::QueryExecution(message)),
            None => Ok(()),
        }
    }

    fn check(&self, to_error: fn(String) -> Error) -> Result<()> {
        match self.take() {
            Some(message) => Err(to_error(message)),
            None => Ok(()),
        }
    }
}

type Tables = HashMap<&'static str, BTreeMap<String, Map<String, Value>>>;

/// Shared in-memory table store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    merchant_writes: Arc<Mutex<Vec<(&'static str, String)>>>,
    fail_next: FailSwitch,
    fail_documents: FailSwitch,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next repository write or load
    pub fn fail_next(&self, message: &str) {
        self.fail_next.arm(message);
    }

    /// Fail the next merchant `save_documents` inside a unit of work
    pub fn fail_next_documents(&self, message: &str) {
        self.fail_documents.arm(message);
    }

    fn put(&self, table: &'static str, key: String, mut row: Map<String, Value>, preserve: &[&str]) {
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table).or_default();
        if let Some(existing) = rows.get(&key) {
            for column in preserve {
                if let Some(value) = existing.get(*column) {
                    row.insert(column.to_string(), value.clone());
                }
            }
        }
        rows.insert(key, row);
    }

    /// Insert a row directly, bypassing failure injection
    pub fn seed<R: TableRow>(&self, row: &R) {
        if let Ok(object) = row_object(row) {
            self.put(R::TABLE, row.key(), object, &[]);
        }
    }

    pub fn get<R: TableRow>(&self, key: &str) -> Option<R> {
        lock(&self.tables)
            .get(R::TABLE)
            .and_then(|rows| rows.get(key))
            .and_then(|row| serde_json::from_value(Value::Object(row.clone())).ok())
    }

    /// All rows of `R`'s table, ordered by key
    pub fn rows<R: TableRow>(&self) -> Vec<R> {
        lock(&self.tables)
            .get(R::TABLE)
            .map(|rows| {
                rows.values()
                    .filter_map(|row| serde_json::from_value(Value::Object(row.clone())).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unit-of-work merchant writes as `("insert" | "update", id)`, in call order
    pub fn merchant_writes(&self) -> Vec<(&'static str, String)> {
        lock(&self.merchant_writes).clone()
    }

    pub fn count<R: TableRow>(&self) -> usize {
        lock(&self.tables).get(R::TABLE).map(BTreeMap::len).unwrap_or(0)
    }
}

/// [`EntityRepository`] over one table of an [`InMemoryStore`]
pub struct InMemoryTable<R> {
    store: InMemoryStore,
    _row: PhantomData<fn() -> R>,
}

#[async_trait]
impl<R: TableRow> EntityRepository<R> for InMemoryTable<R> {
    async fn save(&self, row: &R) -> RepositoryResult<()> {
        self.store.fail_next.check_repository()?;
        self.store.put(R::TABLE, row.key(), row_object(row)?, &[]);
        Ok(())
    }

    async fn update(&self, row: &R) -> RepositoryResult<()> {
        self.store.fail_next.check_repository()?;
        self.store.put(R::TABLE, row.key(), row_object(row)?, UPDATE_PRESERVED);
        Ok(())
    }

    async fn soft_delete(&self, key: &str) -> RepositoryResult<()> {
        self.store.fail_next.check_repository()?;
        if !R::SOFT_DELETE {
            return Err(RepositoryError::QueryExecution(format!(
                "{} has no is_deleted column",
                R::TABLE
            )));
        }
        let mut tables = lock(&self.store.tables);
        if let Some(row) = tables.get_mut(R::TABLE).and_then(|rows| rows.get_mut(key)) {
            row.insert("is_deleted".to_string(), Value::Bool(true));
        }
        Ok(())
    }
}

#[async_trait]
impl MerchantRepository for InMemoryStore {
    async fn load_merchant(&self, id: &str) -> RepositoryResult<Option<B2CMerchantDataV2>> {
        self.fail_next.check_repository()?;
        Ok(self.get(id))
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn MerchantUnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

const NO_PRESERVE: &[&str] = &[];

type StagedRow = (&'static str, String, Map<String, Value>, &'static [&'static str]);

/// Writes are staged and only reach the store on commit
pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
    staged: Vec<StagedRow>,
}

#[async_trait]
impl MerchantUnitOfWork for InMemoryUnitOfWork {
    async fn insert_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()> {
        self.store.fail_next.check_repository()?;
        lock(&self.store.merchant_writes).push(("insert", row.key()));
        self.staged
            .push((B2CMerchantDataV2::TABLE, row.key(), row_object(row)?, NO_PRESERVE));
        Ok(())
    }

    async fn update_merchant(&mut self, row: &B2CMerchantDataV2) -> RepositoryResult<()> {
        self.store.fail_next.check_repository()?;
        lock(&self.store.merchant_writes).push(("update", row.key()));
        self.staged
            .push((B2CMerchantDataV2::TABLE, row.key(), row_object(row)?, UPDATE_PRESERVED));
        Ok(())
    }

    async fn save_documents(&mut self, documents: &[B2CMerchantDocument]) -> RepositoryResult<()> {
        self.store.fail_documents.check_repository()?;
        for document in documents {
            self.staged.push((
                B2CMerchantDocument::TABLE,
                document.key(),
                row_object(document)?,
                UPDATE_PRESERVED,
            ));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        let InMemoryUnitOfWork { store, staged } = *self;
        for (table, key, row, preserve) in staged {
            store.put(table, key, row, preserve);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }
}

impl RepositoryProvider for InMemoryStore {
    fn entity<R: TableRow>(&self) -> Arc<dyn EntityRepository<R>> {
        Arc::new(InMemoryTable::<R> {
            store: self.clone(),
            _row: PhantomData,
        })
    }

    fn merchants(&self) -> Arc<dyn MerchantRepository> {
        Arc::new(self.clone())
    }
}

/// Repository that records every call instead of storing rows
#[derive(Debug)]
pub struct RecordingRepository<R> {
    saved: Mutex<Vec<R>>,
    updated: Mutex<Vec<R>>,
    deleted: Mutex<Vec<String>>,
    fail_next: FailSwitch,
}

impl<R: Clone> RecordingRepository<R> {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_next: FailSwitch::default(),
        }
    }

    pub fn fail_next(&self, message: &str) {
        self.fail_next.arm(message);
    }

    pub fn saved(&self) -> Vec<R> {
        lock(&self.saved).clone()
    }

    pub fn updated(&self) -> Vec<R> {
        lock(&self.updated).clone()
    }

    /// Keys passed to `soft_delete`
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }
}

impl<R: Clone> Default for RecordingRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> EntityRepository<R> for RecordingRepository<R> {
    async fn save(&self, row: &R) -> RepositoryResult<()> {
        self.fail_next.check_repository()?;
        lock(&self.saved).push(row.clone());
        Ok(())
    }

    async fn update(&self, row: &R) -> RepositoryResult<()> {
        self.fail_next.check_repository()?;
        lock(&self.updated).push(row.clone());
        Ok(())
    }

    async fn soft_delete(&self, key: &str) -> RepositoryResult<()> {
        self.fail_next.check_repository()?;
        lock(&self.deleted).push(key.to_string());
        Ok(())
    }
}

/// Published `(topic, key, value)` triples
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, String, Vec<u8>)>>,
    fail_next: FailSwitch,
}

impl RecordingPublisher {
    pub fn fail_next(&self, message: &str) {
        self.fail_next.arm(message);
    }

    pub fn published(&self) -> Vec<(String, String, Vec<u8>)> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_kafka(&self, topic: &str, key: &str, value: &[u8]) -> Result<()> {
        self.fail_next.check(Error::Kafka)?;
        lock(&self.published).push((topic.to_string(), key.to_string(), value.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub token: String,
    pub old: Option<B2CMerchantDataV2>,
    pub new: B2CMerchantDataV2,
    pub action: String,
    pub module: String,
}

#[derive(Debug, Default)]
pub struct RecordingActivity {
    entries: Mutex<Vec<ActivityEntry>>,
    fail_next: FailSwitch,
}

impl RecordingActivity {
    pub fn fail_next(&self, message: &str) {
        self.fail_next.arm(message);
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl ActivityService for RecordingActivity {
    async fn insert_log_merchant(
        &self,
        token: &str,
        old: Option<&B2CMerchantDataV2>,
        new: &B2CMerchantDataV2,
        action: &str,
        module: &str,
    ) -> Result<()> {
        self.fail_next.check(Error::Http)?;
        lock(&self.entries).push(ActivityEntry {
            token: token.to_string(),
            old: old.cloned(),
            new: new.clone(),
            action: action.to_string(),
            module: module.to_string(),
        });
        Ok(())
    }
}

/// Dolphin calls as `(method, member)`
#[derive(Debug, Default)]
pub struct RecordingDolphin {
    calls: Mutex<Vec<(&'static str, DolphinMember)>>,
    fail_next: FailSwitch,
}

impl RecordingDolphin {
    pub fn fail_next(&self, message: &str) {
        self.fail_next.arm(message);
    }

    pub fn calls(&self) -> Vec<(&'static str, DolphinMember)> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &'static str, member: &DolphinMember) -> Result<()> {
        self.fail_next.check(Error::Http)?;
        lock(&self.calls).push((method, member.clone()));
        Ok(())
    }
}

#[async_trait]
impl DolphinService for RecordingDolphin {
    async fn register_member(&self, member: &DolphinMember) -> Result<()> {
        self.record("register_member", member)
    }

    async fn update_member(&self, member: &DolphinMember) -> Result<()> {
        self.record("update_member", member)
    }

    async fn activate_member(&self, member: &DolphinMember) -> Result<()> {
        self.record("activate_member", member)
    }
}

#[derive(Debug, Default)]
pub struct RecordingUsecases {
    merchants: Mutex<Vec<B2CMerchantDataV2>>,
    members: Mutex<Vec<DolphinMember>>,
    addresses: Mutex<Vec<ShippingAddress>>,
}

impl RecordingUsecases {
    pub fn merchants(&self) -> Vec<B2CMerchantDataV2> {
        lock(&self.merchants).clone()
    }

    pub fn members(&self) -> Vec<DolphinMember> {
        lock(&self.members).clone()
    }

    pub fn addresses(&self) -> Vec<ShippingAddress> {
        lock(&self.addresses).clone()
    }
}

#[async_trait]
impl WorkerUsecases for RecordingUsecases {
    async fn upsert_merchant(&self, merchant: B2CMerchantDataV2) -> Result<()> {
        lock(&self.merchants).push(merchant);
        Ok(())
    }

    async fn sync_member_dolphin(&self, member: DolphinMember) -> Result<()> {
        lock(&self.members).push(member);
        Ok(())
    }

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<()> {
        lock(&self.addresses).push(address);
        Ok(())
    }
}

/// Returns the same token every time
#[derive(Debug, Clone)]
pub struct StaticTokenGenerator(pub String);

impl TokenGenerator for StaticTokenGenerator {
    fn anonymous_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Default)]
pub struct RecordingDeadLetterSink {
    messages: Mutex<Vec<DlqMessage>>,
}

impl RecordingDeadLetterSink {
    pub fn messages(&self) -> Vec<DlqMessage> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetterSink {
    async fn send(&self, message: DlqMessage) -> Result<()> {
        lock(&self.messages).push(message);
        Ok(())
    }
}

/// Recording doubles behind a [`Services`] bundle
pub struct TestServices {
    pub publisher: Arc<RecordingPublisher>,
    pub activity: Arc<RecordingActivity>,
    pub dolphin: Arc<RecordingDolphin>,
    pub usecases: Arc<RecordingUsecases>,
}

impl TestServices {
    pub fn new() -> Self {
        Self {
            publisher: Arc::new(RecordingPublisher::default()),
            activity: Arc::new(RecordingActivity::default()),
            dolphin: Arc::new(RecordingDolphin::default()),
            usecases: Arc::new(RecordingUsecases::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            publisher: self.publisher.clone(),
            activity: self.activity.clone(),
            dolphin: self.dolphin.clone(),
            tokens: Arc::new(StaticTokenGenerator("test-token".to_string())),
            usecases: self.usecases.clone(),
        }
    }
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rows::DolphinLog;
    use chrono::{TimeZone, Utc};

    fn merchant(id: &str, name: &str) -> B2CMerchantDataV2 {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "merchant_name": name,
            "legal_entity": 0,
            "number_of_employee": 0,
            "is_pkp": false,
            "is_active": true,
            "source": "gws",
            "is_deleted": false,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let store = InMemoryStore::new();
        let repo = store.entity::<B2CMerchantDataV2>();

        let mut original = merchant("M1", "Acme");
        original.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        repo.save(&original).await.unwrap();

        let mut changed = merchant("M1", "Acme Ltd");
        changed.created_at = None;
        repo.update(&changed).await.unwrap();

        let stored: B2CMerchantDataV2 = store.get("M1").unwrap();
        assert_eq!(stored.merchant_name.as_deref(), Some("Acme Ltd"));
        assert_eq!(stored.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_soft_delete_requires_column() {
        let store = InMemoryStore::new();
        let repo = store.entity::<DolphinLog>();
        repo.save(&DolphinLog {
            id: "L1".to_string(),
            member_id: None,
            email: "a@example.com".to_string(),
            event_type: "MemberUpdate".to_string(),
            status: "SUCCESS".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        assert!(repo.soft_delete("L1").await.is_err());
    }

    #[tokio::test]
    async fn test_soft_delete_flags_row_by_key() {
        let store = InMemoryStore::new();
        let repo = store.entity::<B2CMerchantDataV2>();
        let mut original = merchant("M1", "Acme");
        original.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        repo.save(&original).await.unwrap();

        repo.soft_delete("M1").await.unwrap();
        repo.soft_delete("missing").await.unwrap();

        let stored: B2CMerchantDataV2 = store.get("M1").unwrap();
        assert!(stored.is_deleted);
        assert_eq!(stored.merchant_name.as_deref(), Some("Acme"));
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(store.count::<B2CMerchantDataV2>(), 1);
    }

    #[tokio::test]
    async fn test_unit_of_work_records_merchant_writes() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_merchant(&merchant("M1", "Acme")).await.unwrap();
        uow.update_merchant(&merchant("M2", "Beta")).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(
            store.merchant_writes(),
            vec![("insert", "M1".to_string()), ("update", "M2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_merchant(&merchant("M1", "Acme")).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.count::<B2CMerchantDataV2>(), 0);
    }
}
