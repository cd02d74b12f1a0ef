use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::routes::paths;
use crate::server::HimsServer;

/// OpenAPI document for the public endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,
        crate::handlers::auth::login,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::handlers::health::VersionResponse,
            crate::handlers::auth::LoginPayload,
        )
    ),
    tags(
        (name = "health", description = "System health and version"),
        (name = "authentication", description = "Staff sign-in"),
    ),
    info(
        title = "HIMS Engine API",
        description = "Hospital information management: reception, clinical care, pharmacy, \
                       wards, billing and insurance.",
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_docs_routes() -> Router<HimsServer> {
    Router::new().route(paths::docs::OPENAPI_JSON, get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_public_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
    }
}
