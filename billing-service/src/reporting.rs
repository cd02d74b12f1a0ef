use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use database_layer::{Database, Versioned};
use error_common::reporting::Period;
use error_common::validation::checked_sum;
use error_common::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentMethod, ServiceType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRevenue {
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTypeRevenue {
    pub service_type: ServiceType,
    pub total: Decimal,
}

/// Revenue report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_revenue: Decimal,
    pub payment_count: usize,
    pub by_payment_method: Vec<MethodRevenue>,
    pub by_day: Vec<DailyRevenue>,
    pub outstanding_balance: Decimal,
    pub outstanding_invoices: usize,
    pub by_service_type: Vec<ServiceTypeRevenue>,
}

/// Revenue from payments received in `[start, end]` (default: the last 30
/// days), what is still owed, and paid revenue split by service type
pub async fn financial_report(
    db: &Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<FinancialReport> {
    let period = Period::resolve(start, end)?;

    let payments: Vec<Payment> = db
        .all::<Payment>()
        .await?
        .into_iter()
        .map(Versioned::into_inner)
        .filter(|payment| period.contains(payment.payment_date.date_naive()))
        .collect();

    let mut by_method: BTreeMap<PaymentMethod, (Decimal, usize)> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for payment in &payments {
        let entry = by_method
            .entry(payment.payment_method)
            .or_insert((Decimal::ZERO, 0));
        entry.0 = checked_sum("Revenue", [entry.0, payment.amount])?;
        entry.1 += 1;
        let day = by_day
            .entry(payment.payment_date.date_naive())
            .or_insert(Decimal::ZERO);
        *day = checked_sum("Daily revenue", [*day, payment.amount])?;
    }

    let invoices: Vec<Invoice> = db
        .all::<Invoice>()
        .await?
        .into_iter()
        .map(Versioned::into_inner)
        .collect();
    let outstanding: Vec<&Invoice> = invoices
        .iter()
        .filter(|invoice| invoice.status.accepts_payment())
        .collect();

    let paid_in_period: HashMap<Uuid, &Invoice> = invoices
        .iter()
        .filter(|invoice| invoice.status == InvoiceStatus::Paid)
        .filter(|invoice| {
            invoice
                .paid_at
                .is_some_and(|paid_at| period.contains(paid_at.date_naive()))
        })
        .map(|invoice| (invoice.id, invoice))
        .collect();
    let mut by_service_type: BTreeMap<ServiceType, Decimal> = BTreeMap::new();
    for invoice_id in paid_in_period.keys() {
        for item in db
            .find::<InvoiceItem>(json!({ "invoice_id": invoice_id }))
            .await?
        {
            let total = by_service_type
                .entry(item.service_type)
                .or_insert(Decimal::ZERO);
            *total = checked_sum("Service revenue", [*total, item.total_amount])?;
        }
    }

    let total_revenue = checked_sum("Revenue", payments.iter().map(|payment| payment.amount))?;
    let outstanding_balance = checked_sum(
        "Outstanding balance",
        outstanding.iter().map(|invoice| invoice.balance),
    )?;

    Ok(FinancialReport {
        period_start: period.start,
        period_end: period.end,
        total_revenue,
        payment_count: payments.len(),
        by_payment_method: by_method
            .into_iter()
            .map(|(payment_method, (total, count))| MethodRevenue {
                payment_method,
                total,
                count,
            })
            .collect(),
        by_day: by_day
            .into_iter()
            .map(|(date, total)| DailyRevenue { date, total })
            .collect(),
        outstanding_balance,
        outstanding_invoices: outstanding.len(),
        by_service_type: by_service_type
            .into_iter()
            .map(|(service_type, total)| ServiceTypeRevenue { service_type, total })
            .collect(),
    })
}

/// Payments received on `day`
pub async fn revenue_on(db: &Database, day: NaiveDate) -> Result<Decimal> {
    let payments = db.all::<Payment>().await?;
    checked_sum(
        "Daily revenue",
        payments
            .iter()
            .filter(|payment| payment.payment_date.date_naive() == day)
            .map(|payment| payment.amount),
    )
}

/// Billed value of the items credited to `clinician` on invoices issued in
/// the period that have been at least partly paid
pub async fn clinician_revenue(db: &Database, clinician: Uuid, period: Period) -> Result<Decimal> {
    let items = db
        .find::<InvoiceItem>(json!({ "performed_by": clinician }))
        .await?;
    let mut total = Decimal::ZERO;
    let mut invoices: HashMap<Uuid, bool> = HashMap::new();
    for item in items {
        let counts = match invoices.get(&item.invoice_id) {
            Some(counts) => *counts,
            None => {
                let counts = db.get::<Invoice>(item.invoice_id).await?.is_some_and(|invoice| {
                    matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Partial)
                        && period.contains(invoice.issue_date)
                });
                invoices.insert(item.invoice_id, counts);
                counts
            }
        };
        if counts {
            total = checked_sum("Clinician revenue", [total, item.total_amount])?;
        }
    }
    Ok(total)
}
