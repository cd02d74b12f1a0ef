pub mod auth;
pub mod billing;
pub mod clinical;
pub mod health;
pub mod insurance;
pub mod laboratory;
pub mod notifications;
pub mod pharmacy;
pub mod reception;
pub mod reports;
pub mod wards;
pub mod websocket;

use axum::{http::StatusCode, Json};

use crate::error::{api_success, ApiResponse};

/// 201 with the standard envelope
pub(crate) fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(api_success(data)))
}

/// 200 with the standard envelope
pub(crate) fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(api_success(data))
}
