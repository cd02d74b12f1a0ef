//! Staff notifications for the HIMS engine
//!
//! Services raise a [`Notice`] addressed to a user or a department through the
//! [`NotificationSink`] trait. [`NotificationHub`] persists one
//! [`Notification`] per recipient (expanding departments to their active
//! staff), keeps a [`DepartmentNotification`] record, and pushes an [`Event`]
//! to each recipient's live channel for the WebSocket endpoint.

pub mod error;
pub mod event;
pub mod hub;
pub mod models;

pub use error::*;
pub use event::*;
pub use hub::*;
pub use models::*;
