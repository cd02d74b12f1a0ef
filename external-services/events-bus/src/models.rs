use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Alert,
    Error,
}

/// A message in one staff member's inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub data: Value,
    pub department: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
database_layer::entity!(Notification, "notification");

/// Record of a notice addressed to a whole department
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentNotification {
    pub id: Uuid,
    pub department: String,
    pub sender_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub data: Value,
    pub recipients: usize,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(DepartmentNotification, "department_notification");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Recipient {
    User(Uuid),
    Department(String),
}

/// Something a service wants staff to know about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub recipient: Recipient,
    pub sender_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub data: Value,
}

impl Notice {
    pub fn to_user(user_id: Uuid, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Recipient::User(user_id), title, message)
    }

    pub fn to_department(
        department: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Recipient::Department(department.into()), title, message)
    }

    fn new(recipient: Recipient, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient,
            sender_id: None,
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::Info,
            data: Value::Object(Default::default()),
        }
    }

    pub fn from_sender(mut self, sender_id: Uuid) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn kind(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}
