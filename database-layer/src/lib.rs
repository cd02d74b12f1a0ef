//! Versioned entity storage for the HIMS engine
//!
//! Every domain record is a JSON document keyed by `(kind, id)` and carrying a
//! version number. Writes are grouped into a [`ChangeSet`] that a store applies
//! atomically; updates carry the version they were read at, so two requests
//! racing on the same invoice or bed cannot both win. [`Database::transact`]
//! re-runs the losing request against fresh state.
//!
//! Two backends implement [`EntityStore`]:
//!
//! - [`PgStore`]: a single Postgres `entities` table with a JSONB body and a
//!   GIN index, one sqlx transaction per change set
//! - [`MemoryStore`]: a lock-protected map used in tests and when no database
//!   URL is configured
//!
//! # Example
//!
//! ```rust
//! use database_layer::{entity, ChangeSet, Database};
//! use serde::{Deserialize, Serialize};
//! use uuid::Uuid;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Ward {
//!     id: Uuid,
//!     name: String,
//! }
//! entity!(Ward, "doc_ward");
//!
//! # tokio_test_block(async {
//! let db = Database::in_memory();
//! let ward = Ward { id: Uuid::new_v4(), name: "Maternity".into() };
//! let mut changes = ChangeSet::new();
//! changes.insert(&ward)?;
//! db.commit(changes).await?;
//!
//! let stored = db.require::<Ward>(ward.id).await?;
//! assert_eq!(stored.version, 1);
//! # Ok::<(), database_layer::DatabaseError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod connection;
pub mod entity;
pub mod error;
pub mod memory;
pub mod reference;
pub mod repository;
pub mod retry;
pub mod store;
pub mod transaction;

pub use connection::{ConnectionConfig, PgStore};
pub use entity::{json_contains, Entity, StoredRecord, Versioned};
pub use error::{DatabaseError, DatabaseResult};
pub use memory::MemoryStore;
pub use reference::reference_number;
pub use repository::Database;
pub use retry::RetryPolicy;
pub use store::EntityStore;
pub use transaction::{Change, ChangeSet};

pub use uuid::Uuid;
