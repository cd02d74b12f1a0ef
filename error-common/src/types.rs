use thiserror::Error;
use uuid::Uuid;

use crate::codes;

/// Domain error shared by every service crate
#[derive(Error, Debug)]
pub enum HimsError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Operation not allowed in the entity's current state
    #[error("{0}")]
    InvalidState(String),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Uniqueness violation (duplicate number, second claim on an invoice)
    #[error("{0}")]
    Conflict(String),

    /// Optimistic concurrency retries exhausted
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for HIMS operations
pub type Result<T> = std::result::Result<T, HimsError>;

impl HimsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn not_found_uuid(entity: &'static str, id: Uuid) -> Self {
        Self::not_found(entity, id)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => codes::VALIDATION,
            Self::InvalidState(_) => codes::INVALID_STATE,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::Unauthorized(_) => codes::UNAUTHORIZED,
            Self::Forbidden(_) => codes::FORBIDDEN,
            Self::Conflict(_) => codes::CONFLICT,
            Self::ConcurrentModification(_) => codes::CONCURRENT_MODIFICATION,
            Self::Database(_) => codes::DATABASE,
            Self::Configuration(_) => codes::CONFIGURATION,
            Self::Internal(_) | Self::Other(_) => codes::INTERNAL,
        }
    }

    /// Whether a retry after re-reading state may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Whether the error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) | Self::Other(_)
        )
    }
}

/// Log an error with the operation it came from
pub fn log_error(context: &str, error: &HimsError) {
    if error.is_client_error() {
        tracing::debug!(context = context, code = error.code(), error = %error, "Request rejected");
    } else {
        tracing::error!(
            context = context,
            code = error.code(),
            error = %error,
            "HIMS error occurred"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = HimsError::not_found("Invoice", "INV-1");
        assert_eq!(err.to_string(), "Invoice INV-1 not found");
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn only_concurrent_modification_is_retryable() {
        assert!(HimsError::ConcurrentModification("x".into()).is_retryable());
        assert!(!HimsError::conflict("dup").is_retryable());
        assert!(!HimsError::invalid_state("no").is_retryable());
    }

    #[test]
    fn server_side_errors_are_not_client_errors() {
        assert!(HimsError::validation("bad").is_client_error());
        assert!(!HimsError::Database("down".into()).is_client_error());
        assert!(!HimsError::from(anyhow::anyhow!("boom")).is_client_error());
    }
}
