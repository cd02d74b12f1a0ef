use std::future::Future;
use std::sync::Arc;

use error_common::HimsError;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connection::{ConnectionConfig, PgStore};
use crate::entity::{Entity, Versioned};
use crate::error::{DatabaseError, DatabaseResult};
use crate::memory::MemoryStore;
use crate::reference::reference_number;
use crate::retry::RetryPolicy;
use crate::store::EntityStore;
use crate::transaction::ChangeSet;

const REFERENCE_ATTEMPTS: usize = 8;

/// Typed access to an [`EntityStore`]
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn EntityStore>,
    retry: RetryPolicy,
}

impl Database {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub async fn connect(config: &ConnectionConfig) -> DatabaseResult<Self> {
        let store = PgStore::connect(config).await?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.store.health_check().await
    }

    pub async fn get<T: Entity>(&self, id: Uuid) -> DatabaseResult<Option<Versioned<T>>> {
        self.store
            .fetch(T::KIND, id)
            .await?
            .map(|record| record.decode())
            .transpose()
    }

    /// Like [`get`](Self::get) but a missing entity is an error
    pub async fn require<T: Entity>(&self, id: Uuid) -> DatabaseResult<Versioned<T>> {
        self.get(id)
            .await?
            .ok_or(DatabaseError::NotFound { kind: T::KIND, id })
    }

    pub async fn find<T: Entity>(&self, filter: Value) -> DatabaseResult<Vec<Versioned<T>>> {
        self.store
            .scan(T::KIND, &filter)
            .await?
            .into_iter()
            .map(|record| record.decode())
            .collect()
    }

    pub async fn find_one<T: Entity>(&self, filter: Value) -> DatabaseResult<Option<Versioned<T>>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    pub async fn all<T: Entity>(&self) -> DatabaseResult<Vec<Versioned<T>>> {
        self.find(json!({})).await
    }

    pub async fn insert<T: Entity>(&self, value: &T) -> DatabaseResult<()> {
        let mut changes = ChangeSet::new();
        changes.insert(value)?;
        self.commit(changes).await
    }

    pub async fn update<T: Entity>(&self, record: &Versioned<T>) -> DatabaseResult<()> {
        let mut changes = ChangeSet::new();
        changes.update(record)?;
        self.commit(changes).await
    }

    pub async fn commit(&self, changes: ChangeSet) -> DatabaseResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.store.commit(changes).await
    }

    /// Run a read-modify-commit closure, re-running it from scratch when the
    /// commit loses an optimistic-concurrency race
    ///
    /// The closure must re-read everything it writes on every call.
    pub async fn transact<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> error_common::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = error_common::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying after concurrent modification"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(operation, attempt, "Giving up after repeated conflicts");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Draw reference numbers until one is not used by any `T` in `field`
    pub async fn unique_reference<T: Entity>(
        &self,
        prefix: &str,
        field: &str,
    ) -> error_common::Result<String> {
        for _ in 0..REFERENCE_ATTEMPTS {
            let candidate = reference_number(prefix);
            let mut filter = serde_json::Map::new();
            filter.insert(field.to_string(), Value::String(candidate.clone()));
            if self.find::<T>(Value::Object(filter)).await?.is_empty() {
                return Ok(candidate);
            }
        }
        Err(HimsError::conflict(format!(
            "Could not allocate a unique {} number",
            prefix
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: Uuid,
        value: i64,
    }
    crate::entity!(Counter, "test_counter");

    fn fast_db() -> Database {
        Database::in_memory().with_retry_policy(RetryPolicy::new(5, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn require_reports_missing_entity() {
        let db = fast_db();
        let err = db.require::<Counter>(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { kind: "test_counter", .. }));
        let err: HimsError = err.into();
        assert!(matches!(err, HimsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn transact_retries_conflicts_until_success() {
        let db = fast_db();
        let calls = &AtomicU32::new(0);
        let result = db
            .transact("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(HimsError::ConcurrentModification("busy".into()));
                }
                Ok(42)
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transact_surfaces_conflict_after_max_attempts() {
        let db = fast_db().with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
        let calls = &AtomicU32::new(0);
        let err = db
            .transact("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HimsError::ConcurrentModification("busy".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transact_does_not_retry_business_errors() {
        let db = fast_db();
        let calls = &AtomicU32::new(0);
        let err = db
            .transact("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HimsError::invalid_state("not draft"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HimsError::InvalidState(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let db = Database::in_memory()
            .with_retry_policy(RetryPolicy::new(50, Duration::from_millis(1)));
        let counter = Counter {
            id: Uuid::new_v4(),
            value: 0,
        };
        db.insert(&counter).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let id = counter.id;
            handles.push(tokio::spawn(async move {
                let store = &db;
                db.transact("increment", move || async move {
                    let mut record = store.require::<Counter>(id).await?;
                    tokio::task::yield_now().await;
                    record.value.value += 1;
                    store.update(&record).await?;
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = db.require::<Counter>(counter.id).await.unwrap();
        assert_eq!(stored.value.value, 10);
        assert_eq!(stored.version, 11);
    }

    #[tokio::test]
    async fn unique_reference_uses_prefix() {
        let db = fast_db();
        let number = db.unique_reference::<Counter>("CLM", "number").await.unwrap();
        assert!(number.starts_with("CLM-"));
    }
}
