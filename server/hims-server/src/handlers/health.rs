use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiResponse};
use crate::server::HimsServer;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system health status
    #[schema(example = "healthy")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// System uptime in seconds
    #[schema(example = 3600)]
    pub uptime: u64,
    /// Individual component checks
    pub checks: HashMap<String, String>,
}

/// Version information response
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = "HIMS Engine")]
    pub name: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Storage backend in use
    #[schema(example = "postgres")]
    pub storage: String,
    pub modules: Vec<String>,
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (
            status = 200,
            description = "Health report; `status` is `degraded` when storage is unreachable",
            body = HealthResponse
        )
    )
)]
pub async fn health_check(State(server): State<HimsServer>) -> Json<ApiResponse<HealthResponse>> {
    let mut checks = HashMap::new();
    let database = match server.db.health_check().await {
        Ok(()) => "healthy".to_string(),
        Err(err) => {
            tracing::warn!("Storage health check failed: {}", err);
            "unhealthy".to_string()
        }
    };
    let healthy = database == "healthy";
    checks.insert("database".to_string(), database);
    checks.insert(
        "notification_channels".to_string(),
        format!("{} connected", server.hub.connected_users()),
    );

    Json(api_success(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_seconds(),
        checks,
    }))
}

/// Version information handler
#[utoipa::path(
    get,
    path = "/version",
    tag = "health",
    responses(
        (status = 200, description = "Version information", body = VersionResponse)
    )
)]
pub async fn version_info(State(server): State<HimsServer>) -> Json<ApiResponse<VersionResponse>> {
    let modules = [
        "reception",
        "triage",
        "consultation",
        "laboratory",
        "pharmacy",
        "wards",
        "billing",
        "insurance",
        "notifications",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect();

    Json(api_success(VersionResponse {
        name: "HIMS Engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: server.db.backend().to_string(),
        modules,
    }))
}
