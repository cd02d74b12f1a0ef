use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use ward_service::{
    Admission, BedStatus, BedView, Discharge, NewBed, NewTask, NewVitals, NewWard, NursingTask,
    StayFilter, VitalSign, Ward, WardOccupancy, WardStay,
};

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

const WARD_ROLES: &[StaffRole] = &[StaffRole::Nurse, StaffRole::Doctor];

#[derive(Debug, Deserialize)]
pub struct BedQuery {
    pub status: Option<BedStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BedStatusChange {
    pub status: BedStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskCompletion {
    pub notes: Option<String>,
}

// Wards and beds

pub async fn list_wards(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Ward>>>> {
    Ok(ok(server.wards.list_wards().await?))
}

pub async fn create_ward(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<NewWard>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Ward>>)> {
    auth.require_admin()?;
    Ok(created(server.wards.create_ward(request).await?))
}

pub async fn get_ward(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Ward>>> {
    Ok(ok(server.wards.get_ward(id).await?))
}

pub async fn list_beds(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(ward_id): Id<Uuid>,
    Params(query): Params<BedQuery>,
) -> ApiResult<Json<ApiResponse<Vec<BedView>>>> {
    Ok(ok(server.wards.list_beds(ward_id, query.status).await?))
}

pub async fn add_bed(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(ward_id): Id<Uuid>,
    Payload(request): Payload<NewBed>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BedView>>)> {
    auth.require_admin()?;
    Ok(created(server.wards.add_bed(ward_id, request).await?))
}

pub async fn ward_occupancy(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(ward_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<WardOccupancy>>> {
    Ok(ok(server.wards.ward_occupancy(ward_id).await?))
}

pub async fn get_bed(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<BedView>>> {
    Ok(ok(server.wards.get_bed(id).await?))
}

pub async fn change_bed_status(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(change): Payload<BedStatusChange>,
) -> ApiResult<Json<ApiResponse<BedView>>> {
    auth.require_role(&[StaffRole::Nurse])?;
    Ok(ok(server.wards.change_bed_status(id, change.status).await?))
}

// Stays

pub async fn list_stays(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<StayFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<WardStay>>>> {
    let stays = server.wards.list_stays(&filter).await?;
    Ok(Json(page.paginate(stays)))
}

pub async fn admit(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<Admission>,
) -> ApiResult<(StatusCode, Json<ApiResponse<WardStay>>)> {
    auth.require_role(WARD_ROLES)?;
    Ok(created(server.wards.admit(&auth.principal, request).await?))
}

pub async fn get_stay(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<WardStay>>> {
    Ok(ok(server.wards.get_stay(id).await?))
}

pub async fn discharge(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<Discharge>,
) -> ApiResult<Json<ApiResponse<WardStay>>> {
    auth.require_role(WARD_ROLES)?;
    Ok(ok(server.wards.discharge(&auth.principal, id, request).await?))
}

// Vitals

pub async fn vitals_history(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(stay_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<VitalSign>>>> {
    Ok(ok(server.wards.vitals_history(stay_id).await?))
}

pub async fn record_vitals(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(stay_id): Id<Uuid>,
    Payload(request): Payload<NewVitals>,
) -> ApiResult<(StatusCode, Json<ApiResponse<VitalSign>>)> {
    auth.require_role(WARD_ROLES)?;
    Ok(created(
        server.wards.record_vitals(&auth.principal, stay_id, request).await?,
    ))
}

pub async fn latest_vitals(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(stay_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Option<VitalSign>>>> {
    Ok(ok(server.wards.latest_vitals(stay_id).await?))
}

// Nursing tasks

pub async fn tasks_for_stay(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(stay_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<NursingTask>>>> {
    Ok(ok(server.wards.tasks_for_stay(stay_id).await?))
}

pub async fn create_task(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(stay_id): Id<Uuid>,
    Payload(request): Payload<NewTask>,
) -> ApiResult<(StatusCode, Json<ApiResponse<NursingTask>>)> {
    auth.require_role(WARD_ROLES)?;
    Ok(created(
        server.wards.create_task(&auth.principal, stay_id, request).await?,
    ))
}

pub async fn upcoming_tasks(
    State(server): State<HimsServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<NursingTask>>>> {
    Ok(ok(server.wards.upcoming_tasks(&auth.principal).await?))
}

pub async fn start_task(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<NursingTask>>> {
    auth.require_role(&[StaffRole::Nurse])?;
    Ok(ok(server.wards.start_task(id).await?))
}

pub async fn complete_task(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<TaskCompletion>,
) -> ApiResult<Json<ApiResponse<NursingTask>>> {
    auth.require_role(&[StaffRole::Nurse])?;
    Ok(ok(
        server.wards.complete_task(&auth.principal, id, request.notes).await?,
    ))
}

pub async fn cancel_task(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<NursingTask>>> {
    auth.require_role(WARD_ROLES)?;
    Ok(ok(server.wards.cancel_task(id).await?))
}
