use auth_identity::{CreateStaffRequest, LoginResponse, StaffProfile, StaffRole};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

/// Sign-in request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginPayload {
    #[schema(example = "nurse@hospital.org")]
    pub email: String,
    pub password: String,
}

impl RequestValidation for LoginPayload {
    fn validate(&self) -> ApiResult<()> {
        validate_required!(self.email, "Email is required");
        validate_required!(self.password, "Password is required");
        validate_length!(self.email, 3, 254, "Email must be between 3 and 254 characters");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    pub department: Option<String>,
    pub role: Option<StaffRole>,
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "authentication",
    request_body = LoginPayload,
    responses(
        (
            status = 200,
            description = "Signed in; the body carries a bearer token and the staff profile"
        ),
        (status = 401, description = "Invalid credentials or disabled account")
    )
)]
pub async fn login(
    State(server): State<HimsServer>,
    Payload(request): Payload<LoginPayload>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    request.validate()?;
    let response = server
        .identity
        .authenticate(&request.email, &request.password)
        .await?;
    tracing::info!(staff_id = %response.staff.id, role = %response.staff.role, "Staff signed in");
    Ok(ok(response))
}

pub async fn me(
    State(server): State<HimsServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<StaffProfile>>> {
    Ok(ok(server.identity.get_staff(auth.user_id()).await?))
}

pub async fn list_staff(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<StaffQuery>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<StaffProfile>>>> {
    let staff = server
        .identity
        .list_staff(query.department.as_deref(), query.role)
        .await?;
    Ok(Json(page.paginate(staff)))
}

pub async fn create_staff(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<CreateStaffRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<StaffProfile>>)> {
    Ok(created(server.identity.register_staff(&auth.principal, request).await?))
}

pub async fn get_staff(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<StaffProfile>>> {
    Ok(ok(server.identity.get_staff(id).await?))
}

pub async fn activate_staff(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<StaffProfile>>> {
    Ok(ok(server.identity.set_active(&auth.principal, id, true).await?))
}

pub async fn deactivate_staff(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<StaffProfile>>> {
    Ok(ok(server.identity.set_active(&auth.principal, id, false).await?))
}
