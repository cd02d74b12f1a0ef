use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use billing_service::Payment;
use insurance_service::{ApproveClaim, ClaimStatus, InsuranceClaim, NewClaim, RejectClaim};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

const CLAIM_ROLES: &[StaffRole] = &[StaffRole::Accountant];

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    pub status: Option<ClaimStatus>,
}

/// Claim after the insurer's decision, with the payment credited to the invoice if any
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub claim: InsuranceClaim,
    pub payment: Option<Payment>,
}

pub async fn list_claims(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<ClaimQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<InsuranceClaim>>>> {
    let claims = server.insurance.list_claims(query.status).await?;
    Ok(Json(page.paginate(claims)))
}

pub async fn create_claim(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<NewClaim>,
) -> ApiResult<(StatusCode, Json<ApiResponse<InsuranceClaim>>)> {
    auth.require_role(CLAIM_ROLES)?;
    Ok(created(server.insurance.create_claim(&auth.principal, request).await?))
}

pub async fn get_claim(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<InsuranceClaim>>> {
    Ok(ok(server.insurance.get_claim(id).await?))
}

pub async fn claim_for_invoice(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(invoice_id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<InsuranceClaim>>> {
    let claim = server
        .insurance
        .claim_for_invoice(invoice_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Insurance claim"))?;
    Ok(ok(claim))
}

pub async fn submit_claim(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<InsuranceClaim>>> {
    auth.require_role(CLAIM_ROLES)?;
    Ok(ok(server.insurance.submit_claim(&auth.principal, id).await?))
}

pub async fn begin_review(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<InsuranceClaim>>> {
    auth.require_role(CLAIM_ROLES)?;
    Ok(ok(server.insurance.begin_review(&auth.principal, id).await?))
}

pub async fn approve_claim(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<ApproveClaim>,
) -> ApiResult<Json<ApiResponse<ApprovalOutcome>>> {
    auth.require_role(CLAIM_ROLES)?;
    let (claim, payment) = server
        .insurance
        .process_approval(&auth.principal, id, request)
        .await?;
    Ok(ok(ApprovalOutcome { claim, payment }))
}

pub async fn reject_claim(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<RejectClaim>,
) -> ApiResult<Json<ApiResponse<InsuranceClaim>>> {
    auth.require_role(CLAIM_ROLES)?;
    Ok(ok(server.insurance.reject_claim(&auth.principal, id, request).await?))
}
