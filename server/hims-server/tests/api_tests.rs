mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, ADMIN_EMAIL};

#[tokio::test]
async fn health_and_version_are_public() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let (status, body) = app.send(Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["storage"], "memory");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/auth/login"].is_object());
}

#[tokio::test]
async fn api_requires_a_bearer_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/patients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_type"], "unauthorized");

    let (status, _) = app.get("/api/v1/patients", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn me_returns_the_signed_in_profile() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/auth/me", &app.admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn error_bodies_carry_type_and_id() {
    let app = TestApp::new().await;
    let missing = uuid::Uuid::new_v4();
    let (status, body) = app
        .get(&format!("/api/v1/patients/{missing}"), &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
    assert!(body["error"].as_str().unwrap().contains(&missing.to_string()));
    assert!(body["error_id"].as_str().is_some());
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/patients/not-a-uuid", &app.admin_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "bad_request");

    let (status, _) = app
        .post("/api/v1/patients", &app.admin_token, json!({ "first_name": "Only" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_admins_register_staff() {
    let app = TestApp::new().await;
    let (_, nurse_token) = app.staff("nurse", Some("ward")).await;

    let (status, body) = app
        .post(
            "/api/v1/staff",
            &nurse_token,
            json!({
                "email": "intruder@hims.test",
                "password": "long-enough",
                "first_name": "In",
                "last_name": "Truder",
                "employee_id": null,
                "role": "admin",
                "department": null,
                "phone": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_type"], "forbidden");
}

#[tokio::test]
async fn ward_setup_is_admin_only() {
    let app = TestApp::new().await;
    let (_, accountant_token) = app.staff("accountant", Some("billing")).await;
    let ward = json!({
        "name": "Ward A",
        "ward_type": "general",
        "capacity": 4,
        "head_nurse_id": null,
        "description": null
    });

    let (status, _) = app.post("/api/v1/wards", &accountant_token, ward.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/v1/wards", &app.admin_token, ward).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn list_endpoints_are_paginated() {
    let app = TestApp::new().await;
    for name in ["Amina", "Baraka", "Chidi"] {
        app.register_patient(name).await;
    }
    let (status, body) = app
        .get("/api/v1/patients?page=2&page_size=2", &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["metadata"]["total_count"], 3);
    assert_eq!(body["metadata"]["pagination"]["has_previous"], true);
    assert_eq!(body["metadata"]["pagination"]["has_next"], false);
}
