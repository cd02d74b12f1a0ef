use axum::{extract::State, Json};
use events_bus::{DepartmentNotification, Notification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ok;
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::validation::RequestValidation;
use crate::validate_field;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

impl InboxQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkRead {
    pub ids: Vec<Uuid>,
}

impl RequestValidation for MarkRead {
    fn validate(&self) -> ApiResult<()> {
        validate_field!(!self.ids.is_empty(), "At least one notification id is required");
        validate_field!(self.ids.len() <= MAX_LIMIT, "Too many notification ids in one request");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkedRead {
    pub marked: usize,
}

pub async fn list_notifications(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Params(query): Params<InboxQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = server
        .hub
        .list_for_user(auth.user_id(), query.unread_only, query.limit())
        .await?;
    Ok(ok(notifications))
}

pub async fn get_notification(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    Ok(ok(server.hub.get(auth.user_id(), id).await?))
}

pub async fn unread_count(
    State(server): State<HimsServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<UnreadCount>>> {
    let unread = server.hub.unread_count(auth.user_id()).await?;
    Ok(ok(UnreadCount { unread }))
}

pub async fn mark_read(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<MarkRead>,
) -> ApiResult<Json<ApiResponse<MarkedRead>>> {
    request.validate()?;
    let marked = server.hub.mark_read(auth.user_id(), &request.ids).await?;
    Ok(ok(MarkedRead { marked }))
}

pub async fn mark_all_read(
    State(server): State<HimsServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<MarkedRead>>> {
    let marked = server.hub.mark_all_read(auth.user_id()).await?;
    Ok(ok(MarkedRead { marked }))
}

pub async fn department_feed(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(department): Id<String>,
    Params(query): Params<InboxQuery>,
) -> ApiResult<Json<ApiResponse<Vec<DepartmentNotification>>>> {
    Ok(ok(server.hub.department_feed(&department, query.limit()).await?))
}
