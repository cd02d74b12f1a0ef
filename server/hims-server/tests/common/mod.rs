#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use database_layer::Database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use hims_server::config::BootstrapAdmin;
use hims_server::{create_app, HimsServer, ServerSettings};

pub const ADMIN_EMAIL: &str = "admin@hims.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_PASSWORD: &str = "staff-password";

/// Router over a fresh in-memory server with a bootstrapped administrator
pub struct TestApp {
    pub server: HimsServer,
    pub app: Router,
    pub admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let settings = ServerSettings {
            bootstrap_admin: Some(BootstrapAdmin {
                email: ADMIN_EMAIL.into(),
                password: ADMIN_PASSWORD.into(),
                first_name: "Ada".into(),
                last_name: "Admin".into(),
            }),
            ..ServerSettings::for_tests()
        };
        let server = HimsServer::with_database(Database::in_memory(), settings);
        server.bootstrap().await.unwrap();
        let app = create_app(server.clone());

        let mut test_app = Self {
            server,
            app,
            admin_token: String::new(),
        };
        test_app.admin_token = test_app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        test_app
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Register a staff member through the API and sign them in
    pub async fn staff(&self, role: &str, department: Option<&str>) -> (Uuid, String) {
        let email = format!("{role}-{}@hims.test", Uuid::new_v4().simple());
        let (status, body) = self
            .post(
                "/api/v1/staff",
                &self.admin_token,
                json!({
                    "email": email,
                    "password": STAFF_PASSWORD,
                    "first_name": "Sam",
                    "last_name": "Staff",
                    "employee_id": null,
                    "role": role,
                    "department": department,
                    "phone": null
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "staff creation failed: {body}");
        let token = self.login(&email, STAFF_PASSWORD).await;
        (id_of(&body), token)
    }

    pub async fn register_patient(&self, first_name: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/v1/patients",
                &self.admin_token,
                json!({
                    "first_name": first_name,
                    "last_name": "Okafor",
                    "date_of_birth": "1985-04-12",
                    "gender": "female",
                    "blood_type": "O+",
                    "phone_number": "+254700000001",
                    "email": null,
                    "address": null,
                    "city": "Nairobi",
                    "emergency_contact_name": null,
                    "emergency_contact_phone": null,
                    "allergies": null,
                    "chronic_conditions": null
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "patient registration failed: {body}");
        id_of(&body)
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

/// Decimal fields serialize as strings
pub fn money(value: &Value) -> f64 {
    value
        .as_str()
        .map(|s| s.parse().unwrap())
        .or_else(|| value.as_f64())
        .unwrap()
}
