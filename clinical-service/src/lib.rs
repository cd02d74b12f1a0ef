//! Clinical workflow for the HIMS engine
//!
//! - [`triage`]: vitals and urgency level; completing triage reprioritizes the
//!   patient's queue entry and alerts the receiving department
//! - [`consultation`]: doctor encounters with notes, prescriptions and lab
//!   requests
//! - [`laboratory`]: test catalogue, specimen collection and the result
//!   sign-off chain

pub mod consultation;
pub mod laboratory;
pub mod triage;

pub use consultation::*;
pub use laboratory::*;
pub use triage::*;

#[cfg(test)]
mod testing;
