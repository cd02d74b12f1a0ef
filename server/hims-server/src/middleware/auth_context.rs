//! Authentication context extraction
//!
//! Handlers that take an [`AuthContext`] require a valid
//! `Authorization: Bearer <jwt>` header; the token is verified against the
//! server's signing key and turned into the caller's [`Principal`].

use auth_identity::{Principal, StaffRole};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::HimsServer;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.principal.user_id
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(&[])
    }

    /// Admins always pass
    pub fn require_role(&self, roles: &[StaffRole]) -> Result<(), ApiError> {
        if self.principal.has_any_role(roles) {
            return Ok(());
        }
        Err(ApiError::authorization(format!(
            "Role {} is not allowed to perform this operation",
            self.principal.role
        )))
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::authentication(
                "Invalid Authorization header format. Expected: Bearer <token>",
            )
        })
}

#[async_trait]
impl FromRequestParts<HimsServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &HimsServer,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let principal = server
            .identity
            .tokens()
            .verify(token)
            .map_err(|err| ApiError::authentication(err.to_string()))?;
        tracing::debug!(
            user_id = %principal.user_id,
            role = %principal.role,
            "Request authenticated"
        );
        Ok(Self { principal })
    }
}
