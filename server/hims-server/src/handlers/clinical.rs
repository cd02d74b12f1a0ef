use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use clinical_service::{
    Consultation, ConsultationDetail, ConsultationFilter, ConsultationNote, LabRequest,
    LabRequestStatus, NewLabRequest, NewPrescription, Prescription, PrescriptionStatus,
    RecordTriage, StartConsultation, TriageDetail, TriageNote, TriageOutcome, TriageRecord,
    UpdateConsultation,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

const CLINICAL_ROLES: &[StaffRole] = &[StaffRole::Doctor, StaffRole::Nurse];

/// Free-text note appended to a triage record or consultation
#[derive(Debug, Deserialize)]
pub struct NotePayload {
    pub note: String,
}

impl RequestValidation for NotePayload {
    fn validate(&self) -> ApiResult<()> {
        validate_required!(self.note, "Note text is required");
        validate_length!(self.note, 1, 4000, "Note must be at most 4000 characters");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PatientQuery {
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<PrescriptionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LabRequestQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<LabRequestStatus>,
}

// Triage

pub async fn record_triage(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<RecordTriage>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TriageRecord>>)> {
    auth.require_role(CLINICAL_ROLES)?;
    Ok(created(server.triage.record_triage(&auth.principal, request).await?))
}

pub async fn list_triage(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<PatientQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<TriageRecord>>>> {
    let records = server.triage.list_triage(query.patient_id).await?;
    Ok(Json(page.paginate(records)))
}

pub async fn get_triage(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<TriageDetail>>> {
    Ok(ok(server.triage.get_triage(id).await?))
}

pub async fn add_triage_note(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<NotePayload>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TriageNote>>)> {
    request.validate()?;
    Ok(created(
        server.triage.add_triage_note(&auth.principal, id, &request.note).await?,
    ))
}

pub async fn complete_triage(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<TriageOutcome>>> {
    auth.require_role(CLINICAL_ROLES)?;
    Ok(ok(server.triage.complete_triage(&auth.principal, id).await?))
}

// Consultations

pub async fn start_consultation(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<StartConsultation>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Consultation>>)> {
    Ok(created(
        server.consultations.start_consultation(&auth.principal, request).await?,
    ))
}

pub async fn list_consultations(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<ConsultationFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Consultation>>>> {
    let consultations = server.consultations.list_consultations(&filter).await?;
    Ok(Json(page.paginate(consultations)))
}

pub async fn get_consultation(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<ConsultationDetail>>> {
    Ok(ok(server.consultations.get_consultation(id).await?))
}

pub async fn update_consultation(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(changes): Payload<UpdateConsultation>,
) -> ApiResult<Json<ApiResponse<Consultation>>> {
    auth.require_role(&[StaffRole::Doctor])?;
    Ok(ok(server.consultations.update_consultation(id, changes).await?))
}

pub async fn complete_consultation(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Consultation>>> {
    Ok(ok(
        server.consultations.complete_consultation(&auth.principal, id).await?,
    ))
}

pub async fn add_consultation_note(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<NotePayload>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ConsultationNote>>)> {
    request.validate()?;
    Ok(created(
        server.consultations.add_note(&auth.principal, id, &request.note).await?,
    ))
}

pub async fn prescribe(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<NewPrescription>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Prescription>>)> {
    auth.require_role(&[StaffRole::Doctor])?;
    Ok(created(
        server.consultations.prescribe(&auth.principal, id, request).await?,
    ))
}

pub async fn request_lab(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<NewLabRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LabRequest>>)> {
    auth.require_role(&[StaffRole::Doctor])?;
    Ok(created(
        server.consultations.request_lab(&auth.principal, id, request).await?,
    ))
}

// Prescriptions

pub async fn list_prescriptions(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<PrescriptionQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Prescription>>>> {
    let prescriptions = server
        .consultations
        .list_prescriptions(query.patient_id, query.status)
        .await?;
    Ok(Json(page.paginate(prescriptions)))
}

pub async fn get_prescription(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Prescription>>> {
    Ok(ok(server.consultations.get_prescription(id).await?))
}

pub async fn cancel_prescription(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Prescription>>> {
    auth.require_role(&[StaffRole::Doctor, StaffRole::Pharmacist])?;
    Ok(ok(server.consultations.cancel_prescription(id).await?))
}

// Lab requests

pub async fn list_lab_requests(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<LabRequestQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<LabRequest>>>> {
    let requests = server
        .consultations
        .list_lab_requests(query.patient_id, query.status)
        .await?;
    Ok(Json(page.paginate(requests)))
}

pub async fn get_lab_request(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabRequest>>> {
    Ok(ok(server.consultations.get_lab_request(id).await?))
}

pub async fn cancel_lab_request(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<LabRequest>>> {
    auth.require_role(&[StaffRole::Doctor, StaffRole::LabTechnician])?;
    Ok(ok(server.consultations.cancel_lab_request(id).await?))
}
