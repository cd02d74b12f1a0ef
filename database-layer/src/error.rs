use error_common::HimsError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("{kind} {id} was modified concurrently")]
    VersionConflict { kind: String, id: Uuid },

    #[error("{kind} {id} already exists")]
    DuplicateKey { kind: String, id: Uuid },

    #[error("Transaction aborted by the database: {0}")]
    SerializationFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl DatabaseError {
    /// Whether re-reading and retrying the operation may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. } | Self::DuplicateKey { .. } | Self::SerializationFailure(_)
        )
    }

    /// Classify a sqlx error, promoting serialization failures and deadlocks
    /// to retryable conflicts
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let retryable = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code == "40001" || code == "40P01")
            .unwrap_or(false);
        if retryable {
            Self::SerializationFailure(err.to_string())
        } else {
            Self::SqlxError(err)
        }
    }
}

impl From<DatabaseError> for HimsError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { kind, id } => HimsError::not_found(kind, id),
            err if err.is_conflict() => HimsError::ConcurrentModification(err.to_string()),
            err => HimsError::Database(err.to_string()),
        }
    }
}
