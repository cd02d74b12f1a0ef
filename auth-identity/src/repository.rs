use database_layer::{Database, DatabaseResult, Versioned};
use serde_json::json;
use uuid::Uuid;

use crate::models::{StaffMember, StaffRole};

/// Staff lookups over the entity store
#[derive(Clone)]
pub struct StaffRepository {
    db: Database,
}

impl StaffRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Versioned<StaffMember>>> {
        self.db.get(id).await
    }

    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> DatabaseResult<Option<Versioned<StaffMember>>> {
        self.db
            .find_one(json!({ "email": normalize_email(email) }))
            .await
    }

    /// Active members of a department
    pub async fn in_department(&self, department: &str) -> DatabaseResult<Vec<StaffMember>> {
        Ok(self
            .db
            .find::<StaffMember>(json!({ "department": department, "is_active": true }))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect())
    }

    pub async fn list(
        &self,
        department: Option<&str>,
        role: Option<StaffRole>,
    ) -> DatabaseResult<Vec<StaffMember>> {
        let mut filter = serde_json::Map::new();
        if let Some(department) = department {
            filter.insert("department".into(), json!(department));
        }
        if let Some(role) = role {
            filter.insert("role".into(), json!(role));
        }
        let mut staff: Vec<StaffMember> = self
            .db
            .find::<StaffMember>(serde_json::Value::Object(filter))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        staff.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(staff)
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
