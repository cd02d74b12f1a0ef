//! Pharmacy for the HIMS engine
//!
//! Keeps the medication catalogue and a signed ledger of stock movements, and
//! turns pending prescriptions into dispenses. A dispense is prepared once
//! stock covers it and completed in one atomic step that draws the stock down
//! and marks the prescription dispensed.

pub mod models;
pub mod service;

pub use models::*;
pub use service::*;
