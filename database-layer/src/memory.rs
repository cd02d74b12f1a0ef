// In-process store used for tests and database-less development runs
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::entity::{json_contains, StoredRecord};
use crate::error::{DatabaseError, DatabaseResult};
use crate::store::EntityStore;
use crate::transaction::{Change, ChangeSet};

#[derive(Debug, Clone)]
struct Row {
    version: i64,
    body: Value,
    seq: u64,
}

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<(String, Uuid), Row>,
    next_seq: u64,
}

/// Thread-safe in-memory [`EntityStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(tables: &Tables, change: &Change) -> DatabaseResult<()> {
        let key = (change.kind().to_string(), change.id());
        let current = tables.rows.get(&key).map(|row| row.version);
        match change {
            Change::Insert { kind, id, .. } => {
                if current.is_some() {
                    return Err(DatabaseError::DuplicateKey {
                        kind: kind.to_string(),
                        id: *id,
                    });
                }
            }
            Change::Update {
                kind,
                id,
                expected_version,
                ..
            }
            | Change::Delete {
                kind,
                id,
                expected_version,
            }
            | Change::Guard {
                kind,
                id,
                expected_version,
            } => {
                if current != Some(*expected_version) {
                    return Err(DatabaseError::VersionConflict {
                        kind: kind.to_string(),
                        id: *id,
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<StoredRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .rows
            .get(&(kind.to_string(), id))
            .map(|row| StoredRecord {
                id,
                version: row.version,
                body: row.body.clone(),
            }))
    }

    async fn scan(&self, kind: &str, filter: &Value) -> DatabaseResult<Vec<StoredRecord>> {
        let tables = self.tables.read();
        let mut matches: Vec<(u64, StoredRecord)> = tables
            .rows
            .iter()
            .filter(|((row_kind, _), row)| row_kind == kind && json_contains(&row.body, filter))
            .map(|((_, id), row)| {
                (
                    row.seq,
                    StoredRecord {
                        id: *id,
                        version: row.version,
                        body: row.body.clone(),
                    },
                )
            })
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.into_iter().map(|(_, record)| record).collect())
    }

    async fn commit(&self, changes: ChangeSet) -> DatabaseResult<()> {
        let mut tables = self.tables.write();

        let mut seen = HashSet::new();
        for change in changes.changes() {
            if !seen.insert((change.kind(), change.id())) {
                return Err(DatabaseError::QueryFailed(format!(
                    "{} {} appears twice in one change set",
                    change.kind(),
                    change.id()
                )));
            }
            Self::check(&tables, change)?;
        }

        let count = changes.len();
        for change in changes.into_changes() {
            match change {
                Change::Insert { kind, id, body } => {
                    let seq = tables.next_seq;
                    tables.next_seq += 1;
                    tables.rows.insert(
                        (kind.to_string(), id),
                        Row {
                            version: 1,
                            body,
                            seq,
                        },
                    );
                }
                Change::Update {
                    kind,
                    id,
                    expected_version,
                    body,
                } => {
                    if let Some(row) = tables.rows.get_mut(&(kind.to_string(), id)) {
                        row.version = expected_version + 1;
                        row.body = body;
                    }
                }
                Change::Delete { kind, id, .. } => {
                    tables.rows.remove(&(kind.to_string(), id));
                }
                Change::Guard { .. } => {}
            }
        }
        debug!(changes = count, "Committed change set");
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Versioned;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Bed {
        id: Uuid,
        ward: String,
        occupied: bool,
    }
    crate::entity!(Bed, "test_bed");

    fn bed(ward: &str) -> Bed {
        Bed {
            id: Uuid::new_v4(),
            ward: ward.to_string(),
            occupied: false,
        }
    }

    async fn load(store: &MemoryStore, id: Uuid) -> Versioned<Bed> {
        store
            .fetch("test_bed", id)
            .await
            .unwrap()
            .unwrap()
            .decode()
            .unwrap()
    }

    #[tokio::test]
    async fn insert_starts_at_version_one_and_update_bumps() {
        let store = MemoryStore::new();
        let b = bed("A");
        let mut changes = ChangeSet::new();
        changes.insert(&b).unwrap();
        store.commit(changes).await.unwrap();

        let mut record = load(&store, b.id).await;
        assert_eq!(record.version, 1);

        record.occupied = true;
        let mut changes = ChangeSet::new();
        changes.update(&record).unwrap();
        store.commit(changes).await.unwrap();

        let reloaded = load(&store, b.id).await;
        assert_eq!(reloaded.version, 2);
        assert!(reloaded.occupied);
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let store = MemoryStore::new();
        let b = bed("A");
        let mut changes = ChangeSet::new();
        changes.insert(&b).unwrap();
        store.commit(changes).await.unwrap();

        let first = load(&store, b.id).await;
        let second = load(&store, b.id).await;

        let mut changes = ChangeSet::new();
        changes.update(&first).unwrap();
        store.commit(changes).await.unwrap();

        let mut changes = ChangeSet::new();
        changes.update(&second).unwrap();
        let err = store.commit(changes).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn failed_change_set_applies_nothing() {
        let store = MemoryStore::new();
        let existing = bed("A");
        let mut changes = ChangeSet::new();
        changes.insert(&existing).unwrap();
        store.commit(changes).await.unwrap();

        let mut stale = load(&store, existing.id).await;
        stale.version = 7;
        let fresh = bed("B");

        let mut changes = ChangeSet::new();
        changes.insert(&fresh).unwrap();
        changes.update(&stale).unwrap();
        assert!(store.commit(changes).await.is_err());

        assert!(store.fetch("test_bed", fresh.id).await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn guard_detects_concurrent_change() {
        let store = MemoryStore::new();
        let b = bed("A");
        let mut changes = ChangeSet::new();
        changes.insert(&b).unwrap();
        store.commit(changes).await.unwrap();

        let read = load(&store, b.id).await;
        let mut writer = read.clone();
        writer.occupied = true;
        let mut changes = ChangeSet::new();
        changes.update(&writer).unwrap();
        store.commit(changes).await.unwrap();

        let mut changes = ChangeSet::new();
        changes.guard(&read);
        changes.insert(&bed("B")).unwrap();
        assert!(store.commit(changes).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn scan_filters_by_containment_in_insertion_order() {
        let store = MemoryStore::new();
        let beds = [bed("A"), bed("B"), bed("A")];
        for b in &beds {
            let mut changes = ChangeSet::new();
            changes.insert(b).unwrap();
            store.commit(changes).await.unwrap();
        }

        let ward_a = store.scan("test_bed", &json!({"ward": "A"})).await.unwrap();
        let ids: Vec<Uuid> = ward_a.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![beds[0].id, beds[2].id]);
        assert!(store.scan("other", &json!({})).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_requires_matching_version() {
        let store = MemoryStore::new();
        let b = bed("A");
        let mut changes = ChangeSet::new();
        changes.insert(&b).unwrap();
        store.commit(changes).await.unwrap();

        let record = load(&store, b.id).await;
        let mut changes = ChangeSet::new();
        changes.delete(&record);
        store.commit(changes).await.unwrap();
        assert!(store.is_empty());
    }
}
