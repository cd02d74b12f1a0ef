use error_common::HimsError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::InvoiceStatus;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Invoice is not a draft; items can only change while it is a draft")]
    InvoiceNotDraft,

    #[error("Cannot finalize an invoice without items")]
    EmptyInvoice,

    #[error("Payments are not accepted on {0:?} invoices")]
    InvoiceNotPayable(InvoiceStatus),

    #[error("Invoice cannot be cancelled once payments are recorded")]
    InvoiceHasPayments,

    #[error("Payment amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Payment of {amount} exceeds the outstanding balance of {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },

    #[error("Service {0} is not active")]
    ServiceInactive(String),

    #[error("Service code {0} already exists")]
    DuplicateServiceCode(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("{0} cannot exceed 99999999.99")]
    AmountTooLarge(&'static str),
}

pub type BillingResult<T> = Result<T, BillingError>;

impl From<BillingError> for HimsError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::DuplicateServiceCode(_) => HimsError::conflict(err.to_string()),
            BillingError::NonPositiveAmount
            | BillingError::Overpayment { .. }
            | BillingError::InvalidPrice(_)
            | BillingError::AmountTooLarge(_) => HimsError::validation(err.to_string()),
            _ => HimsError::invalid_state(err.to_string()),
        }
    }
}
