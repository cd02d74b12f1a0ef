use std::sync::Arc;

use auth_identity::Principal;
use chrono::{Duration, Utc};
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::{require_amount, require_positive, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink};
use reception_service::Patient;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use ward_service::WardStay;

use crate::error::BillingError;
use crate::models::*;
use crate::payment::{apply_payment, payment_notice};

const DEFAULT_DUE_DAYS: i64 = 30;

fn values<T>(records: Vec<Versioned<T>>) -> Vec<T> {
    records.into_iter().map(Versioned::into_inner).collect()
}

/// Price list and invoice lifecycle
pub struct BillingService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl BillingService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn create_service(&self, request: NewService) -> Result<BillableService> {
        require_text("Service name", &request.name)?;
        require_text("Service code", &request.code)?;
        validate_price(request.cost, request.tax_rate)?;

        let code = request.code.trim().to_uppercase();
        if self
            .db
            .find_one::<BillableService>(json!({ "code": code }))
            .await?
            .is_some()
        {
            return Err(BillingError::DuplicateServiceCode(code).into());
        }
        let now = Utc::now();
        let service = BillableService {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            code,
            service_type: request.service_type,
            description: request.description,
            cost: request.cost.round_dp(2),
            is_taxable: request.is_taxable,
            tax_rate: request.tax_rate,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.insert(&service).await?;
        Ok(service)
    }

    pub async fn get_service(&self, id: Uuid) -> Result<BillableService> {
        Ok(self.db.require::<BillableService>(id).await?.into_inner())
    }

    pub async fn list_services(
        &self,
        service_type: Option<ServiceType>,
        active_only: bool,
    ) -> Result<Vec<BillableService>> {
        let mut filter = serde_json::Map::new();
        if let Some(service_type) = service_type {
            filter.insert("service_type".into(), json!(service_type));
        }
        if active_only {
            filter.insert("is_active".into(), json!(true));
        }
        let mut services = values(self.db.find::<BillableService>(Value::Object(filter)).await?);
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    /// Price changes only affect items added afterwards
    pub async fn update_service(
        &self,
        id: Uuid,
        changes: UpdateService,
    ) -> Result<BillableService> {
        let db = &self.db;
        let changes = &changes;
        db.transact("update_service", move || async move {
            let mut service = db.require::<BillableService>(id).await?;
            if let Some(name) = &changes.name {
                require_text("Service name", name)?;
                service.name = name.trim().to_string();
            }
            if changes.description.is_some() {
                service.description = changes.description.clone();
            }
            if let Some(cost) = changes.cost {
                service.cost = cost.round_dp(2);
            }
            if let Some(taxable) = changes.is_taxable {
                service.is_taxable = taxable;
            }
            if let Some(rate) = changes.tax_rate {
                service.tax_rate = rate;
            }
            if let Some(active) = changes.is_active {
                service.is_active = active;
            }
            validate_price(service.cost, service.tax_rate)?;
            service.updated_at = Utc::now();
            db.update(&service).await?;
            Ok(service.into_inner())
        })
        .await
    }

    pub async fn create_invoice(
        &self,
        principal: &Principal,
        request: CreateInvoice,
    ) -> Result<Invoice> {
        let patient = self.db.require::<Patient>(request.patient_id).await?;
        if let Some(stay_id) = request.ward_stay_id {
            let stay = self.db.require::<WardStay>(stay_id).await?;
            if stay.patient_id != patient.id {
                return Err(HimsError::validation("Ward stay belongs to a different patient"));
            }
        }
        let discount = request.discount.unwrap_or(Decimal::ZERO);
        require_amount("Discount", discount)?;
        let today = Utc::now().date_naive();
        let due_date = request.due_date.unwrap_or(today + Duration::days(DEFAULT_DUE_DAYS));
        if due_date < today {
            return Err(HimsError::validation("Due date cannot be in the past"));
        }

        let number = self.db.unique_reference::<Invoice>("INV", "invoice_number").await?;
        let mut invoice = Invoice::new(
            number,
            patient.id,
            request.ward_stay_id,
            due_date,
            principal.user_id,
        );
        invoice.discount = discount.round_dp(2);
        invoice.notes = request.notes;
        self.db.insert(&invoice).await?;
        info!(invoice_number = %invoice.invoice_number, "Invoice created");
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<Invoice> {
        Ok(self.db.require::<Invoice>(id).await?.into_inner())
    }

    pub async fn get_invoice_detail(&self, id: Uuid) -> Result<InvoiceDetail> {
        let invoice = self.get_invoice(id).await?;
        let mut items = values(
            self.db
                .find::<InvoiceItem>(json!({ "invoice_id": id }))
                .await?,
        );
        items.sort_by_key(|item| item.created_at);
        let mut payments = values(self.db.find::<Payment>(json!({ "invoice_id": id })).await?);
        payments.sort_by_key(|payment| payment.payment_date);
        Ok(InvoiceDetail {
            invoice,
            items,
            payments,
        })
    }

    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>> {
        let mut query = serde_json::Map::new();
        if let Some(patient_id) = filter.patient_id {
            query.insert("patient_id".into(), json!(patient_id));
        }
        if let Some(status) = filter.status {
            query.insert("status".into(), json!(status));
        }
        let mut invoices = values(self.db.find::<Invoice>(Value::Object(query)).await?);
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    /// Snapshot the service price into a new item and re-total the invoice
    pub async fn add_item(&self, invoice_id: Uuid, request: AddItem) -> Result<InvoiceItem> {
        require_positive("Quantity", request.quantity)?;
        let db = &self.db;
        let request = &request;
        db.transact("add_item", move || async move {
            let mut invoice = db.require::<Invoice>(invoice_id).await?;
            invoice.ensure_draft()?;
            let service = db.require::<BillableService>(request.service_id).await?;
            if !service.is_active {
                return Err(BillingError::ServiceInactive(service.code.clone()).into());
            }

            let mut item = InvoiceItem::snapshot(
                invoice.id,
                &service,
                request.quantity,
                request.description.clone(),
            )?;
            item.performed_by = request.performed_by;
            let mut items = values(
                db.find::<InvoiceItem>(json!({ "invoice_id": invoice.id }))
                    .await?,
            );
            items.push(item.clone());
            invoice.recalculate(&items)?;

            let mut changes = ChangeSet::new();
            changes.insert(&item)?;
            changes.update(&invoice)?;
            db.commit(changes).await?;
            Ok(item)
        })
        .await
    }

    pub async fn remove_item(&self, invoice_id: Uuid, item_id: Uuid) -> Result<Invoice> {
        let db = &self.db;
        db.transact("remove_item", move || async move {
            let mut invoice = db.require::<Invoice>(invoice_id).await?;
            invoice.ensure_draft()?;
            let mut items = db.find::<InvoiceItem>(json!({ "invoice_id": invoice.id })).await?;
            let position = items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or_else(|| HimsError::not_found("invoice_item", item_id))?;
            let removed = items.remove(position);
            invoice.recalculate(&values(items))?;

            let mut changes = ChangeSet::new();
            changes.delete(&removed);
            changes.update(&invoice)?;
            db.commit(changes).await?;
            Ok(invoice.into_inner())
        })
        .await
    }

    /// Issue the invoice to the patient and let its author know
    pub async fn finalize_invoice(
        &self,
        principal: &Principal,
        invoice_id: Uuid,
    ) -> Result<Invoice> {
        let db = &self.db;
        let invoice = db
            .transact("finalize_invoice", move || async move {
                let mut invoice = db.require::<Invoice>(invoice_id).await?;
                invoice.finalize()?;
                db.update(&invoice).await?;
                Ok(invoice.into_inner())
            })
            .await?;

        self.notifier
            .dispatch(
                Notice::to_user(
                    invoice.created_by,
                    "Invoice finalized",
                    format!(
                        "{} issued for {}",
                        invoice.invoice_number, invoice.total_amount
                    ),
                )
                .from_sender(principal.user_id)
                .with_data(json!({
                    "invoice_id": invoice.id,
                    "total_amount": invoice.total_amount,
                })),
            )
            .await;
        Ok(invoice)
    }

    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<Invoice> {
        let db = &self.db;
        db.transact("cancel_invoice", move || async move {
            let mut invoice = db.require::<Invoice>(invoice_id).await?;
            invoice.cancel()?;
            db.update(&invoice).await?;
            Ok(invoice.into_inner())
        })
        .await
    }

    pub async fn record_payment(
        &self,
        principal: &Principal,
        invoice_id: Uuid,
        request: RecordPayment,
    ) -> Result<(Invoice, Payment)> {
        let (invoice, payment) =
            apply_payment(&self.db, invoice_id, &request, principal.user_id).await?;
        info!(
            invoice_number = %invoice.invoice_number,
            amount = %payment.amount,
            status = ?invoice.status,
            "Payment recorded"
        );
        self.notifier
            .dispatch(payment_notice(&invoice, &payment, principal.user_id))
            .await;
        Ok((invoice, payment))
    }

    pub async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        Ok(self.get_invoice_detail(invoice_id).await?.payments)
    }
}
