//! Reception for the HIMS engine
//!
//! Registers patients, books appointments and keeps the per-department
//! waiting queue. Queue entries are created here (at check-in or walk-in) and
//! moved along by triage and consultation.

pub mod models;
pub mod reporting;
pub mod service;

pub use models::*;
pub use reporting::*;
pub use service::*;

#[cfg(test)]
mod tests;
