//! Inpatient wards for the HIMS engine
//!
//! A bed never stores "occupied": it links to the active [`WardStay`] holding
//! it and its reported [`BedStatus`] is derived from that link. Admission and
//! discharge write the stay and the bed in one change set, so the two cannot
//! disagree.

pub mod models;
pub mod reporting;
pub mod service;

pub use models::*;
pub use reporting::*;
pub use service::*;
