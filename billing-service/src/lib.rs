//! Billing for the HIMS engine
//!
//! Invoices are built from a price list. Each item snapshots the service
//! price and tax at the moment it is added, and every add or remove
//! re-aggregates the invoice totals from the full item set. Payments,
//! whether taken at the cash desk or synthesized from an approved insurance
//! claim, are credited through [`payment::stage_payment`] so the balance and
//! status rules live in one place.

pub mod error;
pub mod models;
pub mod payment;
pub mod reporting;
pub mod service;

pub use error::*;
pub use models::*;
pub use payment::*;
pub use reporting::*;
pub use service::*;

#[cfg(test)]
mod tests;
