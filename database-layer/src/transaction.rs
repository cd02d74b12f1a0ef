// Atomic multi-entity change sets
use serde_json::Value;
use uuid::Uuid;

use crate::entity::{Entity, Versioned};
use crate::error::DatabaseResult;

/// One write (or read check) inside a [`ChangeSet`]
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Insert {
        kind: &'static str,
        id: Uuid,
        body: Value,
    },
    Update {
        kind: &'static str,
        id: Uuid,
        expected_version: i64,
        body: Value,
    },
    Delete {
        kind: &'static str,
        id: Uuid,
        expected_version: i64,
    },
    /// Fails the set unless the entity is still at `expected_version`
    Guard {
        kind: &'static str,
        id: Uuid,
        expected_version: i64,
    },
}

impl Change {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { kind, .. }
            | Self::Update { kind, .. }
            | Self::Delete { kind, .. }
            | Self::Guard { kind, .. } => kind,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Insert { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. }
            | Self::Guard { id, .. } => *id,
        }
    }
}

/// Writes that commit together or not at all
///
/// Updates, deletes and guards carry the version the caller read; a store
/// rejects the whole set with a version conflict if any of them moved.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Entity>(&mut self, value: &T) -> DatabaseResult<()> {
        self.changes.push(Change::Insert {
            kind: T::KIND,
            id: value.id(),
            body: serde_json::to_value(value)?,
        });
        Ok(())
    }

    pub fn update<T: Entity>(&mut self, record: &Versioned<T>) -> DatabaseResult<()> {
        self.changes.push(Change::Update {
            kind: T::KIND,
            id: record.value.id(),
            expected_version: record.version,
            body: serde_json::to_value(&record.value)?,
        });
        Ok(())
    }

    pub fn delete<T: Entity>(&mut self, record: &Versioned<T>) {
        self.changes.push(Change::Delete {
            kind: T::KIND,
            id: record.value.id(),
            expected_version: record.version,
        });
    }

    pub fn guard<T: Entity>(&mut self, record: &Versioned<T>) {
        self.changes.push(Change::Guard {
            kind: T::KIND,
            id: record.value.id(),
            expected_version: record.version,
        });
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}
