//! Insurance claims for the HIMS engine
//!
//! One claim per invoice, moving pending → submitted → in review →
//! approved, partially approved or rejected. Every move is appended to the
//! claim's status history. Approval can credit the approved amount straight
//! to the invoice through billing's shared payment path.

pub mod models;
pub mod service;

pub use models::*;
pub use service::*;
