//! Staff identity and authentication for the HIMS engine
//!
//! - Staff accounts with a role and an optional department
//! - Argon2 password hashing
//! - HS256 JWT issuance and verification
//! - [`Principal`], the authenticated caller every service operation receives
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_identity::{IdentityConfig, IdentityService};
//! use database_layer::Database;
//!
//! # async fn run() -> auth_identity::Result<()> {
//! let identity = IdentityService::new(Database::in_memory(), IdentityConfig::default());
//! let login = identity.authenticate("doctor@hospital.org", "correct horse").await?;
//! let principal = identity.tokens().verify(&login.token)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod token;

pub use config::*;
pub use error::*;
pub use models::*;
pub use repository::StaffRepository;
pub use service::*;
pub use token::*;
