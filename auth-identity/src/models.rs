use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    LabTechnician,
    Pharmacist,
    Accountant,
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Nurse => "nurse",
            Self::Receptionist => "receptionist",
            Self::LabTechnician => "lab_technician",
            Self::Pharmacist => "pharmacist",
            Self::Accountant => "accountant",
        };
        f.write_str(name)
    }
}

/// A hospital employee who can sign in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: Option<String>,
    pub role: StaffRole,
    /// Department notices fan out to every active member of the department
    pub department: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}
database_layer::entity!(StaffMember, "staff_member");

impl StaffMember {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: StaffRole,
        department: Option<String>,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            employee_id: None,
            role,
            department,
            phone: None,
            password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
            department: self.department.clone(),
        }
    }
}

/// Public view of a staff member, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: Option<String>,
    pub role: StaffRole,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&StaffMember> for StaffProfile {
    fn from(staff: &StaffMember) -> Self {
        Self {
            id: staff.id,
            email: staff.email.clone(),
            first_name: staff.first_name.clone(),
            last_name: staff.last_name.clone(),
            employee_id: staff.employee_id.clone(),
            role: staff.role,
            department: staff.department.clone(),
            phone: staff.phone.clone(),
            is_active: staff.is_active,
            last_login: staff.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaffRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: Option<String>,
    pub role: StaffRole,
    pub department: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub staff: StaffProfile,
}

/// The authenticated caller, passed explicitly to every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: StaffRole,
    pub department: Option<String>,
}

impl Principal {
    pub fn new(user_id: Uuid, role: StaffRole) -> Self {
        Self {
            user_id,
            email: String::new(),
            role,
            department: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }

    pub fn has_any_role(&self, roles: &[StaffRole]) -> bool {
        self.is_admin() || roles.contains(&self.role)
    }
}
