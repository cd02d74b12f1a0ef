// Postgres-backed entity store
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::StoredRecord;
use crate::error::{DatabaseError, DatabaseResult};
use crate::store::EntityStore;
use crate::transaction::{Change, ChangeSet};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entities (
        kind TEXT NOT NULL,
        id UUID NOT NULL,
        version BIGINT NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (kind, id)
    )",
    "CREATE INDEX IF NOT EXISTS entities_body_idx ON entities USING GIN (body jsonb_path_ops)",
    "CREATE INDEX IF NOT EXISTS entities_kind_created_idx ON entities (kind, created_at)",
];

/// Connection settings for [`PgStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Entity store over a single `entities` table
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a pool and make sure the schema exists
    pub async fn connect(config: &ConnectionConfig) -> DatabaseResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created successfully"
        );

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn initialize_schema(&self) -> DatabaseResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed(format!("Schema setup failed: {}", e)))?;
        }
        debug!("Entity schema ready");
        Ok(())
    }

    fn record(row: &PgRow) -> DatabaseResult<StoredRecord> {
        Ok(StoredRecord {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
            body: row.try_get("body")?,
        })
    }
}

fn expect_one_row(affected: u64, change: &Change) -> DatabaseResult<()> {
    if affected == 1 {
        return Ok(());
    }
    let kind = change.kind().to_string();
    let id = change.id();
    Err(match change {
        Change::Insert { .. } => DatabaseError::DuplicateKey { kind, id },
        _ => DatabaseError::VersionConflict { kind, id },
    })
}

#[async_trait]
impl EntityStore for PgStore {
    async fn fetch(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<StoredRecord>> {
        let row = sqlx::query("SELECT id, version, body FROM entities WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        row.as_ref().map(Self::record).transpose()
    }

    async fn scan(&self, kind: &str, filter: &Value) -> DatabaseResult<Vec<StoredRecord>> {
        let rows = sqlx::query(
            "SELECT id, version, body FROM entities \
             WHERE kind = $1 AND body @> $2 ORDER BY created_at, id",
        )
        .bind(kind)
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        rows.iter().map(Self::record).collect()
    }

    async fn commit(&self, changes: ChangeSet) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e))
        })?;

        for change in changes.changes() {
            let affected = match change {
                Change::Insert { kind, id, body } => sqlx::query(
                    "INSERT INTO entities (kind, id, version, body) VALUES ($1, $2, 1, $3) \
                     ON CONFLICT (kind, id) DO NOTHING",
                )
                .bind(*kind)
                .bind(*id)
                .bind(body)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?
                .rows_affected(),
                Change::Update {
                    kind,
                    id,
                    expected_version,
                    body,
                } => sqlx::query(
                    "UPDATE entities SET body = $4, version = version + 1, updated_at = now() \
                     WHERE kind = $1 AND id = $2 AND version = $3",
                )
                .bind(*kind)
                .bind(*id)
                .bind(*expected_version)
                .bind(body)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?
                .rows_affected(),
                Change::Delete {
                    kind,
                    id,
                    expected_version,
                } => sqlx::query(
                    "DELETE FROM entities WHERE kind = $1 AND id = $2 AND version = $3",
                )
                .bind(*kind)
                .bind(*id)
                .bind(*expected_version)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?
                .rows_affected(),
                Change::Guard {
                    kind,
                    id,
                    expected_version,
                } => {
                    let locked = sqlx::query(
                        "SELECT 1 FROM entities \
                         WHERE kind = $1 AND id = $2 AND version = $3 FOR SHARE",
                    )
                    .bind(*kind)
                    .bind(*id)
                    .bind(*expected_version)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DatabaseError::from_sqlx)?;
                    u64::from(locked.is_some())
                }
            };

            if let Err(err) = expect_one_row(affected, change) {
                warn!(kind = change.kind(), id = %change.id(), "Rolling back change set: {}", err);
                tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
                return Err(err);
            }
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        debug!(changes = changes.len(), "Committed change set");
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
