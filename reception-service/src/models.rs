use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use error_common::{HimsError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub patient_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub registration_date: DateTime<Utc>,
    pub last_visit_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Open ward stay; written by admission and discharge
    #[serde(default)]
    pub active_stay_id: Option<Uuid>,
    pub registered_by: Uuid,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Patient, "patient");

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `on`
    pub fn age_on(&self, on: NaiveDate) -> u32 {
        on.years_since(self.date_of_birth).unwrap_or(0)
    }

    pub fn age(&self) -> u32 {
        self.age_on(Utc::now().date_naive())
    }

    pub(crate) fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.patient_number.as_str(),
            self.phone_number.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
            || self.full_name().to_lowercase().contains(&query)
    }

    pub fn ensure_active(&self) -> Result<()> {
        if !self.is_active {
            return Err(HimsError::invalid_state(format!(
                "Patient {} is inactive",
                self.patient_number
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatient {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub blood_type: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientFilter {
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub queue_entry_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Appointment, "appointment");

impl Appointment {
    pub fn transition(&mut self, to: AppointmentStatus) -> Result<()> {
        use AppointmentStatus::*;
        let allowed = matches!(
            (self.status, to),
            (Scheduled, CheckedIn)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (CheckedIn, InProgress)
                | (CheckedIn, Completed)
                | (InProgress, Completed)
        );
        if !allowed {
            return Err(HimsError::invalid_state(format!(
                "Cannot move appointment from {:?} to {:?}",
                self.status, to
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

/// Queue band; more severe bands are served first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    Normal,
    Urgent,
    Emergency,
}

impl QueuePriority {
    /// 0 is served first
    pub fn service_rank(self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::Urgent => 1,
            Self::Normal => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub department: String,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    pub check_in_time: DateTime<Utc>,
    pub service_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}
database_layer::entity!(QueueEntry, "queue_entry");

impl QueueEntry {
    pub fn new(
        patient_id: Uuid,
        appointment_id: Option<Uuid>,
        department: &str,
        priority: QueuePriority,
        created_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            appointment_id,
            department: normalize_department(department),
            priority,
            status: QueueStatus::Waiting,
            check_in_time: Utc::now(),
            service_started_at: None,
            completed_at: None,
            created_by,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != QueueStatus::Completed
    }

    pub fn reprioritize(&mut self, priority: QueuePriority) -> Result<()> {
        if !self.is_open() {
            return Err(HimsError::invalid_state(
                "Cannot change the priority of a completed queue entry",
            ));
        }
        self.priority = priority;
        Ok(())
    }

    pub fn begin_service(&mut self) -> Result<()> {
        if self.status != QueueStatus::Waiting {
            return Err(HimsError::invalid_state("Queue entry is not waiting"));
        }
        self.status = QueueStatus::InProgress;
        self.service_started_at = Some(Utc::now());
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.status != QueueStatus::InProgress {
            return Err(HimsError::invalid_state("Queue entry is not in progress"));
        }
        self.status = QueueStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Most severe band first, then first come first served
pub fn service_order(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    a.priority
        .service_rank()
        .cmp(&b.priority.service_rank())
        .then(a.check_in_time.cmp(&b.check_in_time))
}

pub fn normalize_department(department: &str) -> String {
    let department = department.trim().to_lowercase();
    if department.is_empty() {
        "general".to_string()
    } else {
        department
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enqueue {
    pub patient_id: Uuid,
    pub department: String,
    pub priority: Option<QueuePriority>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(priority: QueuePriority, minutes_ago: i64) -> QueueEntry {
        let mut entry = QueueEntry::new(Uuid::new_v4(), None, "OPD", priority, Uuid::new_v4());
        entry.check_in_time = Utc::now() - Duration::minutes(minutes_ago);
        entry
    }

    #[test]
    fn queue_order_is_severity_then_arrival() {
        let late_emergency = entry(QueuePriority::Emergency, 1);
        let early_normal = entry(QueuePriority::Normal, 30);
        let early_urgent = entry(QueuePriority::Urgent, 20);
        let late_urgent = entry(QueuePriority::Urgent, 5);

        let mut queue = vec![
            early_normal.clone(),
            late_urgent.clone(),
            late_emergency.clone(),
            early_urgent.clone(),
        ];
        queue.sort_by(service_order);
        let ids: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec![late_emergency.id, early_urgent.id, late_urgent.id, early_normal.id]
        );
    }

    #[test]
    fn queue_entry_moves_forward_only() {
        let mut e = entry(QueuePriority::Normal, 0);
        assert_eq!(e.department, "opd");
        assert!(e.finish().is_err());
        e.begin_service().unwrap();
        assert!(e.begin_service().is_err());
        e.finish().unwrap();
        assert!(e.reprioritize(QueuePriority::Emergency).is_err());
    }

    #[test]
    fn appointment_transitions() {
        let mut appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            scheduled_date: Utc::now().date_naive(),
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            reason: "Follow-up".into(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            queue_entry_id: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        appointment.transition(AppointmentStatus::CheckedIn).unwrap();
        assert!(appointment.transition(AppointmentStatus::Cancelled).is_err());
        appointment.transition(AppointmentStatus::Completed).unwrap();
    }

    #[test]
    fn age_counts_whole_years() {
        let patient_dob = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        assert_eq!(on.years_since(patient_dob), Some(33));
    }
}
