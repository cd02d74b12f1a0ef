use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::entity::StoredRecord;
use crate::error::DatabaseResult;
use crate::transaction::ChangeSet;

/// Storage backend for versioned JSON entities
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn fetch(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<StoredRecord>>;

    /// All records of `kind` whose body contains `filter`
    async fn scan(&self, kind: &str, filter: &Value) -> DatabaseResult<Vec<StoredRecord>>;

    /// Apply every change or none of them
    async fn commit(&self, changes: ChangeSet) -> DatabaseResult<()>;

    async fn health_check(&self) -> DatabaseResult<()>;

    fn backend(&self) -> &'static str;
}
