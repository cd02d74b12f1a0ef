use database_layer::DatabaseError;
use error_common::HimsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Event serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Notification {0} not found")]
    NotificationNotFound(uuid::Uuid),

    #[error("Department name must not be empty")]
    EmptyDepartment,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, EventBusError>;

impl From<EventBusError> for HimsError {
    fn from(err: EventBusError) -> Self {
        match err {
            EventBusError::NotificationNotFound(id) => HimsError::not_found("Notification", id),
            EventBusError::EmptyDepartment => HimsError::validation(err.to_string()),
            EventBusError::Database(db) => db.into(),
            EventBusError::SerializationError(e) => HimsError::internal(e.to_string()),
        }
    }
}
