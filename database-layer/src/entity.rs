use std::ops::{Deref, DerefMut};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DatabaseResult;

/// A document stored in the entity table
///
/// `KIND` partitions the table; it must be unique across the workspace.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

/// Implements [`Entity`] for a struct with an `id: Uuid` field
#[macro_export]
macro_rules! entity {
    ($ty:ty, $kind:literal) => {
        impl $crate::Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> $crate::Uuid {
                self.id
            }
        }
    };
}

/// An entity together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: i64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Versioned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Raw row as returned by a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: Uuid,
    pub version: i64,
    pub body: Value,
}

impl StoredRecord {
    pub fn decode<T: Entity>(self) -> DatabaseResult<Versioned<T>> {
        let value = serde_json::from_value(self.body)?;
        Ok(Versioned {
            version: self.version,
            value,
        })
    }
}

/// JSONB containment (`doc @> pattern`) evaluated in memory
pub fn json_contains(doc: &Value, pattern: &Value) -> bool {
    match (doc, pattern) {
        (Value::Object(doc), Value::Object(pattern)) => pattern.iter().all(|(key, expected)| {
            doc.get(key)
                .map(|actual| json_contains(actual, expected))
                .unwrap_or(false)
        }),
        (Value::Array(doc), Value::Array(pattern)) => pattern
            .iter()
            .all(|expected| doc.iter().any(|actual| json_contains(actual, expected))),
        (Value::Array(doc), scalar) if !scalar.is_object() => {
            doc.iter().any(|actual| actual == scalar)
        }
        (doc, pattern) => doc == pattern,
    }
}
