mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{id_of, money, TestApp};

async fn billable(app: &TestApp, service_type: &str, cost: &str, tax_rate: &str) -> Uuid {
    let (status, body) = app
        .post(
            "/api/v1/billing/services",
            &app.admin_token,
            json!({
                "name": format!("{service_type} service"),
                "code": format!("SVC-{}", Uuid::new_v4().simple()),
                "service_type": service_type,
                "description": null,
                "cost": cost,
                "is_taxable": tax_rate != "0",
                "tax_rate": tax_rate
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

/// Draft invoice with a taxed consultation (150 at 10%) and an untaxed lab test (75)
async fn invoice_for(app: &TestApp, patient_id: Uuid) -> Uuid {
    let consultation = billable(app, "consultation", "150.00", "10").await;
    let laboratory = billable(app, "laboratory", "75.00", "0").await;

    let (status, body) = app
        .post(
            "/api/v1/invoices",
            &app.admin_token,
            json!({
                "patient_id": patient_id,
                "ward_stay_id": null,
                "due_date": null,
                "discount": null,
                "notes": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let invoice_id = id_of(&body);
    assert_eq!(body["data"]["status"], "draft");

    for service_id in [consultation, laboratory] {
        let (status, body) = app
            .post(
                &format!("/api/v1/invoices/{invoice_id}/items"),
                &app.admin_token,
                json!({ "service_id": service_id, "quantity": 1, "description": null }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    invoice_id
}

async fn pay(app: &TestApp, invoice_id: Uuid, amount: &str) -> (StatusCode, Value) {
    app.post(
        &format!("/api/v1/invoices/{invoice_id}/payments"),
        &app.admin_token,
        json!({
            "amount": amount,
            "payment_method": "cash",
            "reference": null,
            "notes": null
        }),
    )
    .await
}

#[tokio::test]
async fn registered_patients_can_be_found() {
    let app = TestApp::new().await;
    let patient_id = app.register_patient("Wanjiru").await;

    let (status, body) = app
        .get(&format!("/api/v1/patients/{patient_id}"), &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["patient_number"]
        .as_str()
        .unwrap()
        .starts_with("PAT-"));

    let (status, body) = app
        .get("/api/v1/patients/search?q=wanjiru", &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], patient_id.to_string());

    let (status, _) = app.get("/api/v1/patients/search?q=", &app.admin_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invoice_totals_and_payment_settle() {
    let app = TestApp::new().await;
    let patient_id = app.register_patient("Kamau").await;
    let invoice_id = invoice_for(&app, patient_id).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/invoices/{invoice_id}/finalize"),
            &app.admin_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert!((money(&body["data"]["total_amount"]) - 240.0).abs() < f64::EPSILON);
    assert!((money(&body["data"]["tax_amount"]) - 15.0).abs() < f64::EPSILON);

    let (status, body) = pay(&app, invoice_id, "100.00").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["invoice"]["status"], "partial");
    assert!((money(&body["data"]["invoice"]["balance"]) - 140.0).abs() < f64::EPSILON);

    let (status, body) = pay(&app, invoice_id, "500.00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");

    let (status, body) = pay(&app, invoice_id, "140.00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["invoice"]["status"], "paid");
    assert!(money(&body["data"]["invoice"]["balance"]).abs() < f64::EPSILON);

    let (status, body) = app
        .get(&format!("/api/v1/invoices/{invoice_id}"), &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn items_cannot_change_after_finalize() {
    let app = TestApp::new().await;
    let patient_id = app.register_patient("Otieno").await;
    let invoice_id = invoice_for(&app, patient_id).await;
    let extra = billable(&app, "procedure", "20.00", "0").await;

    let (status, _) = app
        .post(
            &format!("/api/v1/invoices/{invoice_id}/finalize"),
            &app.admin_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            &format!("/api/v1/invoices/{invoice_id}/items"),
            &app.admin_token,
            json!({ "service_id": extra, "quantity": 1, "description": null }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_state");
}

#[tokio::test]
async fn approved_claim_pays_the_invoice() {
    let app = TestApp::new().await;
    let patient_id = app.register_patient("Njeri").await;
    let invoice_id = invoice_for(&app, patient_id).await;
    app.post(
        &format!("/api/v1/invoices/{invoice_id}/finalize"),
        &app.admin_token,
        json!({}),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/v1/insurance/claims",
            &app.admin_token,
            json!({
                "invoice_id": invoice_id,
                "provider_name": "NHIF",
                "policy_number": "POL-7781",
                "member_id": null,
                "amount_claimed": "240.00",
                "notes": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let claim_id = id_of(&body);

    let (status, _) = app
        .post(
            &format!("/api/v1/insurance/claims/{claim_id}/submit"),
            &app.admin_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            &format!("/api/v1/insurance/claims/{claim_id}/approve"),
            &app.admin_token,
            json!({ "amount_approved": "240.00", "apply_payment": true, "notes": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["claim"]["status"], "approved");
    assert_eq!(body["data"]["payment"]["payment_method"], "insurance");

    let (_, body) = app
        .get(&format!("/api/v1/invoices/{invoice_id}"), &app.admin_token)
        .await;
    assert_eq!(body["data"]["status"], "paid");

    let (status, body) = app
        .get(&format!("/api/v1/invoices/{invoice_id}/claim"), &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], claim_id.to_string());
}

#[tokio::test]
async fn occupied_bed_cannot_be_admitted_twice() {
    let app = TestApp::new().await;
    let (doctor_id, _) = app.staff("doctor", Some("medicine")).await;
    let first = app.register_patient("Achieng").await;
    let second = app.register_patient("Mwangi").await;

    let (status, body) = app
        .post(
            "/api/v1/wards",
            &app.admin_token,
            json!({
                "name": "Medical Ward",
                "ward_type": "general",
                "capacity": 2,
                "head_nurse_id": null,
                "description": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ward_id = id_of(&body);

    let (status, body) = app
        .post(
            &format!("/api/v1/wards/{ward_id}/beds"),
            &app.admin_token,
            json!({ "bed_number": "M-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let bed_id = id_of(&body);

    let admission = |patient_id: Uuid| {
        json!({
            "patient_id": patient_id,
            "bed_id": bed_id,
            "admitting_doctor_id": null,
            "attending_doctor_id": doctor_id,
            "diagnosis": "Pneumonia",
            "notes": null
        })
    };

    let (status, body) = app
        .post("/api/v1/ward-stays", &app.admin_token, admission(first))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let stay_id = id_of(&body);

    let (status, body) = app
        .post("/api/v1/ward-stays", &app.admin_token, admission(second))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_state");
    assert!(body["error"].as_str().unwrap().contains("not available"));

    let (_, body) = app.get(&format!("/api/v1/beds/{bed_id}"), &app.admin_token).await;
    assert_eq!(body["data"]["status"], "occupied");

    let (status, body) = app
        .post(
            &format!("/api/v1/ward-stays/{stay_id}/discharge"),
            &app.admin_token,
            json!({ "diagnosis": "Recovered", "instructions": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_active"], false);

    let (_, body) = app
        .get(&format!("/api/v1/wards/{ward_id}/occupancy"), &app.admin_token)
        .await;
    assert_eq!(body["data"]["occupied"], 0);
    assert_eq!(body["data"]["available"], 1);
}

#[tokio::test]
async fn emergency_triage_jumps_the_queue_and_alerts_emergency() {
    let app = TestApp::new().await;
    let (_, er_nurse_token) = app.staff("nurse", Some("emergency")).await;
    let early = app.register_patient("Halima").await;
    let critical = app.register_patient("Juma").await;

    let mut entries = Vec::new();
    for patient_id in [early, critical] {
        let (status, body) = app
            .post(
                "/api/v1/queue",
                &app.admin_token,
                json!({ "patient_id": patient_id, "department": "outpatient", "priority": null }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        entries.push(id_of(&body));
    }

    let (status, body) = app
        .post(
            "/api/v1/triage",
            &app.admin_token,
            json!({
                "patient_id": critical,
                "queue_entry_id": entries[1],
                "vitals": {
                    "temperature": "39.8",
                    "pulse_rate": 132,
                    "respiratory_rate": 30,
                    "blood_pressure_systolic": 85,
                    "blood_pressure_diastolic": 50,
                    "oxygen_saturation": 86
                },
                "weight_kg": "70",
                "height_cm": "175",
                "chief_complaint": "Shortness of breath",
                "brief_history": null,
                "triage_level": 1,
                "notes": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let triage_id = id_of(&body);

    let (status, body) = app
        .post(
            &format!("/api/v1/triage/{triage_id}/complete"),
            &app.admin_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["priority"], "emergency");
    assert_eq!(body["data"]["department"], "emergency");

    let (_, body) = app
        .get("/api/v1/queue?department=outpatient", &app.admin_token)
        .await;
    let queue = body["data"].as_array().unwrap();
    assert_eq!(queue[0]["id"], entries[1].to_string());
    assert_eq!(queue[1]["id"], entries[0].to_string());

    let (_, body) = app.get("/api/v1/notifications/unread-count", &er_nurse_token).await;
    assert_eq!(body["data"]["unread"], 1);

    let (status, _) = app
        .post(
            &format!("/api/v1/triage/{triage_id}/complete"),
            &app.admin_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
