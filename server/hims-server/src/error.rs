use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use error_common::{codes, HimsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Stable error code
    pub error_type: String,
    /// Unique id for correlating with server logs
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for pagination
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    /// Anything raised by a domain service
    #[error(transparent)]
    Domain(#[from] HimsError),

    #[error("{message}")]
    Authentication { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(HimsError::validation(message))
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => match err {
                HimsError::Validation(_) | HimsError::InvalidState(_) => StatusCode::BAD_REQUEST,
                HimsError::NotFound { .. } => StatusCode::NOT_FOUND,
                HimsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                HimsError::Forbidden(_) => StatusCode::FORBIDDEN,
                HimsError::Conflict(_) | HimsError::ConcurrentModification(_) => {
                    StatusCode::CONFLICT
                }
                HimsError::Database(_)
                | HimsError::Configuration(_)
                | HimsError::Internal(_)
                | HimsError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => err.code(),
            ApiError::Authentication { .. } => codes::UNAUTHORIZED,
            ApiError::Authorization { .. } => codes::FORBIDDEN,
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::NotFound { .. } => codes::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        let message = if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
            "Internal server error".to_string()
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = status_code.as_u16(),
                "Request rejected: {}",
                self
            );
            self.to_string()
        };

        let body = ApiErrorResponse {
            error: message,
            error_type: self.error_type().to_string(),
            error_id,
            timestamp: Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<auth_identity::IdentityError> for ApiError {
    fn from(err: auth_identity::IdentityError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<events_bus::EventBusError> for ApiError {
    fn from(err: events_bus::EventBusError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<database_layer::DatabaseError> for ApiError {
    fn from(err: database_layer::DatabaseError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Helper function to create successful API responses with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
