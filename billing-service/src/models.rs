use chrono::{DateTime, NaiveDate, Utc};
use error_common::validation::MAX_AMOUNT;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Consultation,
    Laboratory,
    Pharmacy,
    Ward,
    Procedure,
    Other,
}

/// Price list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillableService {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub cost: Decimal,
    pub is_taxable: bool,
    /// Percent, e.g. 16 for 16%
    pub tax_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(BillableService, "service");

impl BillableService {
    pub fn effective_tax_rate(&self) -> Decimal {
        if self.is_taxable {
            self.tax_rate
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub code: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub cost: Decimal,
    #[serde(default)]
    pub is_taxable: bool,
    #[serde(default)]
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateService {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost: Option<Decimal>,
    pub is_taxable: Option<bool>,
    pub tax_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub fn validate_price(cost: Decimal, tax_rate: Decimal) -> BillingResult<()> {
    if cost < Decimal::ZERO {
        return Err(BillingError::InvalidPrice("cost cannot be negative".into()));
    }
    if cost > MAX_AMOUNT {
        return Err(BillingError::AmountTooLarge("Service cost"));
    }
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::from(100) {
        return Err(BillingError::InvalidPrice("tax rate must be between 0 and 100".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn accepts_payment(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub ward_stay_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Sum of item subtotals, before tax
    pub amount: Decimal,
    pub tax_amount: Decimal,
    /// Recorded for the patient's statement; not deducted from the total
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}
database_layer::entity!(Invoice, "invoice");

impl Invoice {
    pub fn new(
        invoice_number: String,
        patient_id: Uuid,
        ward_stay_id: Option<Uuid>,
        due_date: NaiveDate,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            invoice_number,
            patient_id,
            ward_stay_id,
            issue_date: now.date_naive(),
            due_date,
            amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            balance: Decimal::ZERO,
            status: InvoiceStatus::Draft,
            notes: None,
            created_by,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            paid_at: None,
        }
    }

    pub fn ensure_draft(&self) -> BillingResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::InvoiceNotDraft);
        }
        Ok(())
    }

    /// Re-aggregate every monetary field from the complete item set
    pub fn recalculate(&mut self, items: &[InvoiceItem]) -> BillingResult<()> {
        let amount = money_sum(items.iter().map(|item| item.subtotal))?;
        let tax_amount = money_sum(items.iter().map(|item| item.tax_amount))?;
        let total_amount = money_sum(items.iter().map(|item| item.total_amount))?;
        if total_amount > MAX_AMOUNT {
            return Err(BillingError::AmountTooLarge("Invoice total"));
        }
        self.amount = amount;
        self.tax_amount = tax_amount;
        self.total_amount = total_amount;
        self.balance = total_amount - self.amount_paid;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn finalize(&mut self) -> BillingResult<()> {
        self.ensure_draft()?;
        if self.total_amount <= Decimal::ZERO {
            return Err(BillingError::EmptyInvoice);
        }
        let now = Utc::now();
        self.status = InvoiceStatus::Pending;
        self.finalized_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self) -> BillingResult<()> {
        match self.status {
            InvoiceStatus::Draft => {}
            InvoiceStatus::Pending if self.amount_paid.is_zero() => {}
            InvoiceStatus::Pending | InvoiceStatus::Partial => {
                return Err(BillingError::InvoiceHasPayments)
            }
            other => return Err(BillingError::InvoiceNotPayable(other)),
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Credit a payment: paid once nothing is owed, partial otherwise
    pub fn apply_payment(&mut self, amount: Decimal) -> BillingResult<()> {
        if !self.status.accepts_payment() {
            return Err(BillingError::InvoiceNotPayable(self.status));
        }
        if amount <= Decimal::ZERO {
            return Err(BillingError::NonPositiveAmount);
        }
        if amount > MAX_AMOUNT {
            return Err(BillingError::AmountTooLarge("Payment amount"));
        }
        if amount > self.balance {
            return Err(BillingError::Overpayment {
                amount,
                balance: self.balance,
            });
        }
        let now = Utc::now();
        self.amount_paid = self
            .amount_paid
            .checked_add(amount)
            .ok_or(BillingError::AmountTooLarge("Amount paid"))?;
        self.balance = self.total_amount - self.amount_paid;
        if self.balance <= Decimal::ZERO {
            self.status = InvoiceStatus::Paid;
            self.paid_at = Some(now);
        } else {
            self.status = InvoiceStatus::Partial;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub service_id: Uuid,
    pub service_type: ServiceType,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    /// Clinician credited with the service
    #[serde(default)]
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(InvoiceItem, "invoice_item");

impl InvoiceItem {
    /// Price the item from the service as it is now; later price changes
    /// leave it untouched
    pub fn snapshot(
        invoice_id: Uuid,
        service: &BillableService,
        quantity: u32,
        description: Option<String>,
    ) -> BillingResult<Self> {
        let unit_price = service.cost;
        let tax_rate = service.effective_tax_rate();
        let subtotal = unit_price
            .checked_mul(Decimal::from(quantity))
            .filter(|subtotal| *subtotal <= MAX_AMOUNT)
            .ok_or(BillingError::AmountTooLarge("Item subtotal"))?
            .round_dp(2);
        let tax_amount = (subtotal * tax_rate / Decimal::ONE_HUNDRED).round_dp(2);
        let total_amount = subtotal
            .checked_add(tax_amount)
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or(BillingError::AmountTooLarge("Item total"))?;
        Ok(Self {
            id: Uuid::new_v4(),
            invoice_id,
            service_id: service.id,
            service_type: service.service_type,
            description: description.unwrap_or_else(|| service.name.clone()),
            quantity,
            unit_price,
            tax_rate,
            subtotal,
            tax_amount,
            total_amount,
            performed_by: None,
            created_at: Utc::now(),
        })
    }
}

fn money_sum(mut values: impl Iterator<Item = Decimal>) -> BillingResult<Decimal> {
    values
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or(BillingError::AmountTooLarge("Invoice total"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
    BankTransfer,
    Insurance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// Receipt, transaction or claim number
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub received_by: Uuid,
    pub payment_date: DateTime<Utc>,
}
database_layer::entity!(Payment, "payment");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub patient_id: Uuid,
    pub ward_stay_id: Option<Uuid>,
    /// Defaults to thirty days from today
    pub due_date: Option<NaiveDate>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItem {
    pub service_id: Uuid,
    pub quantity: u32,
    pub description: Option<String>,
    #[serde(default)]
    pub performed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}
