use auth_identity::StaffRole;
use axum::{extract::State, http::StatusCode, Json};
use billing_service::{
    AddItem, BillableService, CreateInvoice, Invoice, InvoiceDetail, InvoiceFilter, InvoiceItem,
    NewService, Payment, RecordPayment, ServiceType, UpdateService,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{created, ok};
use crate::error::{ApiResponse, ApiResult};
use crate::extract::{Id, Params, Payload};
use crate::middleware::AuthContext;
use crate::server::HimsServer;
use crate::types::pagination::PaginationParams;

const BILLING_ROLES: &[StaffRole] = &[StaffRole::Accountant, StaffRole::Receptionist];

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub service_type: Option<ServiceType>,
    #[serde(default)]
    pub active_only: bool,
}

/// Invoice state after a payment, with the payment itself
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    pub payment: Payment,
}

// Billable services

pub async fn list_services(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<ServiceQuery>,
) -> ApiResult<Json<ApiResponse<Vec<BillableService>>>> {
    Ok(ok(server
        .billing
        .list_services(query.service_type, query.active_only)
        .await?))
}

pub async fn create_service(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<NewService>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BillableService>>)> {
    auth.require_role(&[StaffRole::Accountant])?;
    Ok(created(server.billing.create_service(request).await?))
}

pub async fn get_service(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<BillableService>>> {
    Ok(ok(server.billing.get_service(id).await?))
}

pub async fn update_service(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(changes): Payload<UpdateService>,
) -> ApiResult<Json<ApiResponse<BillableService>>> {
    auth.require_role(&[StaffRole::Accountant])?;
    Ok(ok(server.billing.update_service(id, changes).await?))
}

// Invoices

pub async fn list_invoices(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(filter): Params<InvoiceFilter>,
    Params(page): Params<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Invoice>>>> {
    let invoices = server.billing.list_invoices(&filter).await?;
    Ok(Json(page.paginate(invoices)))
}

pub async fn create_invoice(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Payload(request): Payload<CreateInvoice>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Invoice>>)> {
    auth.require_role(BILLING_ROLES)?;
    Ok(created(server.billing.create_invoice(&auth.principal, request).await?))
}

pub async fn get_invoice(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<InvoiceDetail>>> {
    Ok(ok(server.billing.get_invoice_detail(id).await?))
}

pub async fn add_item(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<AddItem>,
) -> ApiResult<(StatusCode, Json<ApiResponse<InvoiceItem>>)> {
    auth.require_role(BILLING_ROLES)?;
    Ok(created(server.billing.add_item(id, request).await?))
}

pub async fn remove_item(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id((invoice_id, item_id)): Id<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<Invoice>>> {
    auth.require_role(BILLING_ROLES)?;
    Ok(ok(server.billing.remove_item(invoice_id, item_id).await?))
}

pub async fn finalize_invoice(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Invoice>>> {
    auth.require_role(BILLING_ROLES)?;
    Ok(ok(server.billing.finalize_invoice(&auth.principal, id).await?))
}

pub async fn cancel_invoice(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Invoice>>> {
    auth.require_role(&[StaffRole::Accountant])?;
    Ok(ok(server.billing.cancel_invoice(id).await?))
}

// Payments

pub async fn record_payment(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Id(id): Id<Uuid>,
    Payload(request): Payload<RecordPayment>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PaymentReceipt>>)> {
    auth.require_role(BILLING_ROLES)?;
    let (invoice, payment) = server
        .billing
        .record_payment(&auth.principal, id, request)
        .await?;
    Ok(created(PaymentReceipt { invoice, payment }))
}

pub async fn list_payments(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Id(id): Id<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Payment>>>> {
    Ok(ok(server.billing.list_payments(id).await?))
}
