use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use clinical_service::{
    CollectSample, CompleteResult, LabResult, LabResultStatus, LabTest, NewLabTest, RecordResult,
    Sample, SampleStatus,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

const LAB_ROLES: &[StaffRole] = &[StaffRole::LabTechnician];

#[derive(Debug, Deserialize)]
pub struct CatalogueQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct TestActivation {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SampleStatusChange {
    pub status: SampleStatus,
}

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<LabResultStatus>,
}

// Test catalogue

pub async fn list_lab_tests(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<CatalogueQuery>,
) -> ApiResult<Json<ApiResponse<Vec<LabTest>>>> {
    Ok(ok(server.laboratory.list_lab_tests(query.active_only).await?))
}

pub async fn create_lab_test(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<NewLabTest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LabTest>>)> {
    auth.require_role(LAB_ROLES)?;
    Ok(created(server.laboratory.create_lab_test(request).await?))
}

pub async fn get_lab_test(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabTest>>> {
    Ok(ok(server.laboratory.get_lab_test(id).await?))
}

pub async fn set_lab_test_active(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(change): Payload<TestActivation>,
) -> ApiResult<Json<ApiResponse<LabTest>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.set_lab_test_active(id, change.is_active).await?))
}

// Samples

pub async fn collect_sample(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(lab_request_id): Id<Uuid>,
    Payload(request): Payload<CollectSample>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Sample>>)> {
    auth.require_role(&[StaffRole::LabTechnician, StaffRole::Nurse])?;
    Ok(created(
        server
            .laboratory
            .collect_sample(&auth.principal, lab_request_id, request)
            .await?,
    ))
}

pub async fn samples_for_request(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(lab_request_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Sample>>>> {
    Ok(ok(server.laboratory.samples_for_request(lab_request_id).await?))
}

pub async fn get_sample(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Sample>>> {
    Ok(ok(server.laboratory.get_sample(id).await?))
}

pub async fn receive_sample(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Sample>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.receive_sample(&auth.principal, id).await?))
}

pub async fn update_sample_status(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(change): Payload<SampleStatusChange>,
) -> ApiResult<Json<ApiResponse<Sample>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.update_sample_status(id, change.status).await?))
}

// Results

pub async fn record_result(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(lab_request_id): Id<Uuid>,
    Payload(request): Payload<RecordResult>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LabResult>>)> {
    auth.require_role(LAB_ROLES)?;
    Ok(created(
        server
            .laboratory
            .record_result(&auth.principal, lab_request_id, request)
            .await?,
    ))
}

pub async fn list_results(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<ResultQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<LabResult>>>> {
    let results = server
        .laboratory
        .list_results(query.patient_id, query.status)
        .await?;
    Ok(Json(page.paginate(results)))
}

pub async fn get_result(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabResult>>> {
    Ok(ok(server.laboratory.get_result(id).await?))
}

pub async fn start_processing(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabResult>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.start_processing(id).await?))
}

pub async fn complete_result(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<CompleteResult>,
) -> ApiResult<Json<ApiResponse<LabResult>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.complete_result(id, request).await?))
}

pub async fn verify_result(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabResult>>> {
    auth.require_role(LAB_ROLES)?;
    Ok(ok(server.laboratory.verify_result(&auth.principal, id).await?))
}

pub async fn deliver_result(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabResult>>> {
    Ok(ok(server.laboratory.deliver_result(id).await?))
}
