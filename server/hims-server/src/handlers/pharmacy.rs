use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use clinical_service::Prescription;
use pharmacy_service::{
    AdjustStock, CreateDispense, DispenseStatus, Medication, MedicationDispense, MedicationFilter,
    MedicationTransaction, NewMedication, ReceiveStock, UpdateMedication,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

const PHARMACY_ROLES: &[StaffRole] = &[StaffRole::Pharmacist];

#[derive(Debug, Deserialize)]
pub struct ExpiryQuery {
    #[serde(default = "default_expiry_days")]
    pub days: i64,
}

fn default_expiry_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct DispenseQuery {
    pub status: Option<DispenseStatus>,
}

// Medications

pub async fn list_medications(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<MedicationFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Medication>>>> {
    let medications = server.pharmacy.list_medications(&filter).await?;
    Ok(Json(page.paginate(medications)))
}

pub async fn create_medication(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<NewMedication>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Medication>>)> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(created(server.pharmacy.create_medication(&auth.principal, request).await?))
}

pub async fn low_stock(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Medication>>>> {
    Ok(ok(server.pharmacy.low_stock().await?))
}

/// Stock expiring within `days` (default 30), including stock already expired
pub async fn expiring_soon(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<ExpiryQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Medication>>>> {
    Ok(ok(server.pharmacy.expiring_soon(query.days).await?))
}

pub async fn get_medication(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Medication>>> {
    Ok(ok(server.pharmacy.get_medication(id).await?))
}

pub async fn update_medication(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(changes): Payload<UpdateMedication>,
) -> ApiResult<Json<ApiResponse<Medication>>> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(ok(server.pharmacy.update_medication(id, changes).await?))
}

pub async fn receive_stock(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<ReceiveStock>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MedicationTransaction>>)> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(created(
        server.pharmacy.receive_stock(&auth.principal, id, request).await?,
    ))
}

pub async fn adjust_stock(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<AdjustStock>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MedicationTransaction>>)> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(created(
        server.pharmacy.adjust_stock(&auth.principal, id, request).await?,
    ))
}

pub async fn stock_history(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<MedicationTransaction>>>> {
    Ok(ok(server.pharmacy.stock_history(id).await?))
}

pub async fn pending_prescriptions(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Prescription>>>> {
    Ok(ok(server.pharmacy.pending_prescriptions().await?))
}

// Dispenses

pub async fn list_dispenses(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<DispenseQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<MedicationDispense>>>> {
    let dispenses = server.pharmacy.list_dispenses(query.status).await?;
    Ok(Json(page.paginate(dispenses)))
}

pub async fn create_dispense(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<CreateDispense>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MedicationDispense>>)> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(created(server.pharmacy.create_dispense(&auth.principal, request).await?))
}

pub async fn get_dispense(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<MedicationDispense>>> {
    Ok(ok(server.pharmacy.get_dispense(id).await?))
}

pub async fn prepare_dispense(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<MedicationDispense>>> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(ok(server.pharmacy.prepare_dispense(&auth.principal, id).await?))
}

pub async fn complete_dispense(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<MedicationDispense>>> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(ok(server.pharmacy.complete_dispense(&auth.principal, id).await?))
}

pub async fn cancel_dispense(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<MedicationDispense>>> {
    auth.require_role(PHARMACY_ROLES)?;
    Ok(ok(server.pharmacy.cancel_dispense(id).await?))
}
