//! Common error handling for the HIMS engine
//!
//! Every domain crate returns [`HimsError`] from its operations. The HTTP
//! layer maps each variant onto a status code and a stable machine-readable
//! code from [`codes`], so a precondition failure surfaces as a 4xx with a
//! human-readable message while storage and wiring failures become 5xx.
//!
//! # Example
//!
//! ```rust
//! use error_common::{HimsError, Result};
//!
//! fn check_quantity(quantity: u32) -> Result<u32> {
//!     if quantity == 0 {
//!         return Err(HimsError::validation("Quantity must be at least 1"));
//!     }
//!     Ok(quantity)
//! }
//!
//! assert!(check_quantity(0).is_err());
//! ```

pub mod codes;
pub mod reporting;
pub mod types;
pub mod validation;

pub use types::*;
