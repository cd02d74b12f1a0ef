//! HIMS Server - hospital information management HTTP API
//!
//! Wires the domain services into an axum router: REST endpoints under
//! `/api/v1`, public health and version checks, the OpenAPI document, and a
//! WebSocket channel that pushes staff notifications as they are persisted.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod reports;
pub mod routes;
pub mod server;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::ServerSettings;
pub use error::*;
pub use server::HimsServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: HimsServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
