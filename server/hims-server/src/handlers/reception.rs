use axum::{extract::State, http::StatusCode, Json};
use reception_service::{
    Appointment, AppointmentFilter, Enqueue, Patient, PatientFilter, QueueEntry, QueuePriority,
    RegisterPatient, ScheduleAppointment, UpdatePatient,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PriorityChange {
    pub priority: QueuePriority,
}

// Patients

pub async fn register_patient(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<RegisterPatient>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Patient>>)> {
    Ok(created(server.reception.register_patient(&auth.principal, request).await?))
}

pub async fn list_patients(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<PatientFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Patient>>>> {
    let patients = server.reception.list_patients(&filter).await?;
    Ok(Json(page.paginate(patients)))
}

pub async fn search_patients(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<SearchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Patient>>>> {
    Ok(ok(server.reception.search_patients(&query.q).await?))
}

pub async fn get_patient(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    Ok(ok(server.reception.get_patient(id).await?))
}

pub async fn update_patient(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(changes): Payload<UpdatePatient>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    Ok(ok(server.reception.update_patient(id, changes).await?))
}

pub async fn deactivate_patient(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    Ok(ok(server.reception.deactivate_patient(id).await?))
}

// Appointments

pub async fn schedule_appointment(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<ScheduleAppointment>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    Ok(created(
        server.reception.schedule_appointment(&auth.principal, request).await?,
    ))
}

pub async fn list_appointments(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<AppointmentFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Appointment>>>> {
    let appointments = server.reception.list_appointments(&filter).await?;
    Ok(Json(page.paginate(appointments)))
}

pub async fn todays_appointments(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Appointment>>>> {
    Ok(ok(server.reception.todays_appointments().await?))
}

pub async fn get_appointment(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    Ok(ok(server.reception.get_appointment(id).await?))
}

pub async fn check_in(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<QueueEntry>>> {
    Ok(ok(server.reception.check_in(&auth.principal, id).await?))
}

pub async fn cancel_appointment(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Appointment>>> {
    Ok(ok(server.reception.cancel_appointment(id).await?))
}

// Queue

pub async fn enqueue(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<Enqueue>,
) -> ApiResult<(StatusCode, Json<ApiResponse<QueueEntry>>)> {
    Ok(created(server.reception.enqueue(&auth.principal, request).await?))
}

pub async fn current_queue(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<QueueQuery>,
) -> ApiResult<Json<ApiResponse<Vec<QueueEntry>>>> {
    Ok(ok(server.reception.current_queue(query.department.as_deref()).await?))
}

pub async fn get_queue_entry(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<QueueEntry>>> {
    Ok(ok(server.reception.get_queue_entry(id).await?))
}

pub async fn update_priority(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(change): Payload<PriorityChange>,
) -> ApiResult<Json<ApiResponse<QueueEntry>>> {
    Ok(ok(server.reception.update_priority(id, change.priority).await?))
}

pub async fn start_service(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<QueueEntry>>> {
    Ok(ok(server.reception.start_service(id).await?))
}

pub async fn complete_service(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<QueueEntry>>> {
    Ok(ok(server.reception.complete_service(id).await?))
}
