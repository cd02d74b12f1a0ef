// Events pushed to connected clients
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Notification;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Mirror of a persisted notification
    pub fn notification(notification: &Notification) -> serde_json::Result<Self> {
        Ok(Self::new("notification", serde_json::to_value(notification)?))
    }
}
