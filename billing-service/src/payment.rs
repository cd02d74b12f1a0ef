//! The one place a payment is credited to an invoice. Cash desk payments and
//! approved insurance claims both go through here.

use chrono::Utc;
use database_layer::{ChangeSet, Database, Versioned};
use error_common::Result;
use events_bus::{Notice, NotificationType};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Invoice, Payment, RecordPayment};

pub const BILLING_DEPARTMENT: &str = "billing";

/// Credit `request` to an invoice already read for this attempt and add the
/// invoice update and the payment row to `changes`
pub fn stage_payment(
    invoice: &mut Versioned<Invoice>,
    request: &RecordPayment,
    received_by: Uuid,
    changes: &mut ChangeSet,
) -> Result<Payment> {
    let amount = request.amount.round_dp(2);
    invoice.apply_payment(amount)?;
    let payment = Payment {
        id: Uuid::new_v4(),
        invoice_id: invoice.id,
        amount,
        payment_method: request.payment_method,
        reference: request.reference.clone(),
        notes: request.notes.clone(),
        received_by,
        payment_date: Utc::now(),
    };
    changes.update(invoice)?;
    changes.insert(&payment)?;
    Ok(payment)
}

/// Read, credit and commit in one retried transaction
pub async fn apply_payment(
    db: &Database,
    invoice_id: Uuid,
    request: &RecordPayment,
    received_by: Uuid,
) -> Result<(Invoice, Payment)> {
    db.transact("apply_payment", move || async move {
        let mut invoice = db.require::<Invoice>(invoice_id).await?;
        let mut changes = ChangeSet::new();
        let payment = stage_payment(&mut invoice, request, received_by, &mut changes)?;
        db.commit(changes).await?;
        Ok((invoice.into_inner(), payment))
    })
    .await
}

/// Billing department notice for a credited payment
pub fn payment_notice(invoice: &Invoice, payment: &Payment, sender: Uuid) -> Notice {
    Notice::to_department(
        BILLING_DEPARTMENT,
        "Payment received",
        format!(
            "{} received on {} ({:?}); balance {}",
            payment.amount, invoice.invoice_number, payment.payment_method, invoice.balance
        ),
    )
    .from_sender(sender)
    .kind(NotificationType::Success)
    .with_data(json!({
        "invoice_id": invoice.id,
        "payment_id": payment.id,
        "amount": payment.amount,
        "status": invoice.status,
    }))
}
