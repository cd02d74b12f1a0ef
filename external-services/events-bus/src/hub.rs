use async_trait::async_trait;
use auth_identity::StaffRepository;
use chrono::Utc;
use dashmap::DashMap;
use database_layer::{ChangeSet, Database, Versioned};
use logger_redacted::{LoggerConfig, RedactedLogger};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{EventBusError, Result};
use crate::event::Event;
use crate::models::*;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const MARK_READ_ATTEMPTS: usize = 3;
const LOG_COMPONENT: &str = "notifications";

/// Outbound side effect used by every service
///
/// Delivery is best effort: failures are logged by the sink and never reach
/// the operation that raised the notice.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn dispatch(&self, notice: Notice);
}

/// Persists notifications and pushes them to connected staff
pub struct NotificationHub {
    db: Database,
    staff: StaffRepository,
    channels: DashMap<Uuid, broadcast::Sender<Event>>,
    capacity: usize,
    logger: RedactedLogger,
}

impl NotificationHub {
    pub fn new(db: Database) -> Self {
        Self::with_capacity(db, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(db: Database, capacity: usize) -> Self {
        Self {
            staff: StaffRepository::new(db.clone()),
            db,
            channels: DashMap::new(),
            capacity: capacity.max(1),
            logger: RedactedLogger::new(LOG_COMPONENT),
        }
    }

    /// Log through `config` instead of the default redaction settings
    pub fn with_logging(mut self, config: &LoggerConfig) -> Self {
        self.logger = RedactedLogger::with_config(LOG_COMPONENT, config);
        self
    }

    /// Live feed for one user; events published before subscribing are not replayed
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<Event> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn connected_users(&self) -> usize {
        self.channels
            .iter()
            .filter(|entry| entry.value().receiver_count() > 0)
            .count()
    }

    /// Push to a user's live channel if anyone is listening
    pub fn publish(&self, user_id: Uuid, event: Event) {
        let delivered = match self.channels.get(&user_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => return,
        };
        if !delivered {
            self.channels
                .remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
        }
    }

    /// Persist and push a notice, returning the per-user notifications written
    pub async fn deliver(&self, notice: Notice) -> Result<Vec<Notification>> {
        let now = Utc::now();
        let build = |recipient_id: Uuid, department: Option<String>| Notification {
            id: Uuid::new_v4(),
            recipient_id,
            sender_id: notice.sender_id,
            title: notice.title.clone(),
            message: notice.message.clone(),
            notification_type: notice.notification_type,
            data: notice.data.clone(),
            department,
            is_read: false,
            created_at: now,
            read_at: None,
        };

        let notifications = match &notice.recipient {
            Recipient::User(user_id) => {
                let notification = build(*user_id, None);
                self.db.insert(&notification).await?;
                vec![notification]
            }
            Recipient::Department(department) => {
                let department = department.trim().to_lowercase();
                if department.is_empty() {
                    return Err(EventBusError::EmptyDepartment);
                }
                let members = self.staff.in_department(&department).await?;
                let notifications: Vec<Notification> = members
                    .iter()
                    .map(|member| build(member.id, Some(department.clone())))
                    .collect();

                let mut changes = ChangeSet::new();
                changes.insert(&DepartmentNotification {
                    id: Uuid::new_v4(),
                    department: department.clone(),
                    sender_id: notice.sender_id,
                    title: notice.title.clone(),
                    message: notice.message.clone(),
                    notification_type: notice.notification_type,
                    data: notice.data.clone(),
                    recipients: notifications.len(),
                    created_at: now,
                })?;
                for notification in &notifications {
                    changes.insert(notification)?;
                }
                self.db.commit(changes).await?;
                notifications
            }
        };

        for notification in &notifications {
            self.publish(notification.recipient_id, Event::notification(notification)?);
        }
        Ok(notifications)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        match self.db.get::<Notification>(id).await? {
            Some(record) if record.recipient_id == user_id => Ok(record.into_inner()),
            _ => Err(EventBusError::NotificationNotFound(id)),
        }
    }

    /// Newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let filter = if unread_only {
            json!({ "recipient_id": user_id, "is_read": false })
        } else {
            json!({ "recipient_id": user_id })
        };
        let mut notifications: Vec<Notification> = self
            .db
            .find::<Notification>(filter)
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<usize> {
        Ok(self
            .db
            .find::<Notification>(json!({ "recipient_id": user_id, "is_read": false }))
            .await?
            .len())
    }

    /// Mark the given notifications read; ids belonging to other users are skipped
    pub async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        let mut marked = 0;
        for id in ids {
            for _ in 0..MARK_READ_ATTEMPTS {
                let Some(mut record) = self.db.get::<Notification>(*id).await? else {
                    break;
                };
                if record.recipient_id != user_id || record.is_read {
                    break;
                }
                record.is_read = true;
                record.read_at = Some(Utc::now());
                match self.db.update(&record).await {
                    Ok(()) => {
                        marked += 1;
                        break;
                    }
                    Err(err) if err.is_conflict() => continue,
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(marked)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<usize> {
        let unread: Vec<Uuid> = self
            .db
            .find::<Notification>(json!({ "recipient_id": user_id, "is_read": false }))
            .await?
            .iter()
            .map(|record| record.id)
            .collect();
        self.mark_read(user_id, &unread).await
    }

    /// Department notices, newest first
    pub async fn department_feed(
        &self,
        department: &str,
        limit: usize,
    ) -> Result<Vec<DepartmentNotification>> {
        let mut feed: Vec<DepartmentNotification> = self
            .db
            .find::<DepartmentNotification>(json!({
                "department": department.trim().to_lowercase()
            }))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        feed.truncate(limit);
        Ok(feed)
    }
}

#[async_trait]
impl NotificationSink for NotificationHub {
    async fn dispatch(&self, notice: Notice) {
        let recipient = notice.recipient.clone();
        let title = notice.title.clone();
        let data = notice.data.clone();
        match self.deliver(notice).await {
            Ok(sent) => self.logger.debug_with_data(
                &format!(
                    "Delivered '{}' to {:?} ({} recipients)",
                    title,
                    recipient,
                    sent.len()
                ),
                &data,
            ),
            Err(err) => self.logger.error_with_data(
                &format!("Failed to deliver '{}' to {:?}: {}", title, recipient, err),
                &data,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_identity::{CreateStaffRequest, IdentityConfig, IdentityService, Principal, StaffRole};

    async fn staff_in(identity: &IdentityService, email: &str, department: &str) -> Uuid {
        let admin = Principal::new(Uuid::new_v4(), StaffRole::Admin);
        identity
            .register_staff(
                &admin,
                CreateStaffRequest {
                    email: email.into(),
                    password: "long enough".into(),
                    first_name: "Test".into(),
                    last_name: "Staff".into(),
                    employee_id: None,
                    role: StaffRole::Accountant,
                    department: Some(department.into()),
                    phone: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn setup() -> (Database, NotificationHub, IdentityService) {
        let db = Database::in_memory();
        let hub = NotificationHub::new(db.clone());
        let identity = IdentityService::new(db.clone(), IdentityConfig::for_tests());
        (db, hub, identity)
    }

    #[tokio::test]
    async fn user_notice_is_persisted_and_pushed() {
        let (_db, hub, _) = setup();
        let user = Uuid::new_v4();
        let mut feed = hub.subscribe(user);

        hub.dispatch(
            Notice::to_user(user, "Invoice finalized", "Invoice INV-1 is ready")
                .kind(NotificationType::Success),
        )
        .await;

        let inbox = hub.list_for_user(user, false, 50).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::Success);

        let event = feed.recv().await.unwrap();
        assert_eq!(event.event_type, "notification");
        assert_eq!(event.data["id"], json!(inbox[0].id));
    }

    #[tokio::test]
    async fn department_notice_fans_out_to_members() {
        let (_db, hub, identity) = setup();
        let first = staff_in(&identity, "b1@hims.test", "billing").await;
        let second = staff_in(&identity, "b2@hims.test", "Billing").await;
        let outsider = staff_in(&identity, "p1@hims.test", "pharmacy").await;

        let sent = hub
            .deliver(Notice::to_department("BILLING", "Payment received", "KES 240.00"))
            .await
            .unwrap();
        assert_eq!(sent.len(), 2);

        assert_eq!(hub.unread_count(first).await.unwrap(), 1);
        assert_eq!(hub.unread_count(second).await.unwrap(), 1);
        assert_eq!(hub.unread_count(outsider).await.unwrap(), 0);

        let feed = hub.department_feed("billing", 10).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].recipients, 2);
    }

    #[tokio::test]
    async fn mark_read_ignores_other_users_notifications() {
        let (_db, hub, _) = setup();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let sent = hub
            .deliver(Notice::to_user(owner, "Lab result", "Verified"))
            .await
            .unwrap();
        let ids: Vec<Uuid> = sent.iter().map(|n| n.id).collect();

        assert_eq!(hub.mark_read(intruder, &ids).await.unwrap(), 0);
        assert_eq!(hub.mark_read(owner, &ids).await.unwrap(), 1);
        assert_eq!(hub.mark_read(owner, &ids).await.unwrap(), 0);
        assert_eq!(hub.unread_count(owner).await.unwrap(), 0);
        assert!(hub.get(intruder, ids[0]).await.is_err());
    }

    #[tokio::test]
    async fn mark_all_read_and_unread_filter() {
        let (_db, hub, _) = setup();
        let user = Uuid::new_v4();
        for title in ["one", "two", "three"] {
            hub.dispatch(Notice::to_user(user, title, "body")).await;
        }
        assert_eq!(hub.list_for_user(user, true, 2).await.unwrap().len(), 2);
        assert_eq!(hub.mark_all_read(user).await.unwrap(), 3);
        assert!(hub.list_for_user(user, true, 50).await.unwrap().is_empty());
        assert_eq!(hub.list_for_user(user, false, 50).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dispatch_swallows_delivery_errors() {
        let (db, hub, _) = setup();
        hub.dispatch(Notice::to_department("  ", "Nobody", "home")).await;
        assert!(db.all::<DepartmentNotification>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_channels_are_dropped() {
        let (_db, hub, _) = setup();
        let user = Uuid::new_v4();
        let feed = hub.subscribe(user);
        assert_eq!(hub.connected_users(), 1);
        drop(feed);
        hub.publish(user, Event::new("ping", json!({})));
        assert_eq!(hub.connected_users(), 0);
    }
}
