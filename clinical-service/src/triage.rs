//! Intake vitals and urgency level, feeding the queue priority

use std::sync::Arc;

use auth_identity::Principal;
use chrono::{DateTime, Utc};
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::{require_range, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink, NotificationType};
use reception_service::{Patient, QueueEntry, QueuePriority};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub const EMERGENCY_DEPARTMENT: &str = "emergency";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    /// Degrees Celsius
    pub temperature: Decimal,
    pub pulse_rate: u16,
    pub respiratory_rate: u16,
    pub blood_pressure_systolic: u16,
    pub blood_pressure_diastolic: u16,
    pub oxygen_saturation: u8,
}

impl VitalSigns {
    pub fn validate(&self) -> Result<()> {
        require_range("Temperature", self.temperature, Decimal::from(25), Decimal::from(45))?;
        require_range("Pulse rate", self.pulse_rate, 20, 250)?;
        require_range("Respiratory rate", self.respiratory_rate, 4, 80)?;
        require_range("Systolic pressure", self.blood_pressure_systolic, 50, 260)?;
        require_range("Diastolic pressure", self.blood_pressure_diastolic, 20, 180)?;
        require_range("Oxygen saturation", self.oxygen_saturation, 50, 100)?;
        if self.blood_pressure_diastolic >= self.blood_pressure_systolic {
            return Err(HimsError::validation(
                "Diastolic pressure must be lower than systolic pressure",
            ));
        }
        Ok(())
    }
}

/// Queue priority for a triage level: 1-2 emergency, 3 urgent, 4-5 normal
pub fn priority_for_level(level: u8) -> QueuePriority {
    match level {
        0..=2 => QueuePriority::Emergency,
        3 => QueuePriority::Urgent,
        _ => QueuePriority::Normal,
    }
}

/// Department to alert once triage is done
pub fn routing_department(level: u8, queue_department: &str) -> String {
    if priority_for_level(level) == QueuePriority::Emergency {
        EMERGENCY_DEPARTMENT.to_string()
    } else {
        queue_department.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub queue_entry_id: Uuid,
    pub priority: QueuePriority,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub queue_entry_id: Option<Uuid>,
    pub vitals: VitalSigns,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub chief_complaint: String,
    pub brief_history: Option<String>,
    pub triage_level: u8,
    pub nurse_id: Uuid,
    pub notes: Option<String>,
    pub triage_time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<TriageOutcome>,
}
database_layer::entity!(TriageRecord, "triage_record");

impl TriageRecord {
    /// kg/m², two decimal places
    pub fn bmi(&self) -> Option<Decimal> {
        let weight = self.weight_kg.filter(|w| *w > Decimal::ZERO)?;
        let height_m = self.height_cm.filter(|h| *h > Decimal::ZERO)? / Decimal::ONE_HUNDRED;
        weight
            .checked_div(height_m.checked_mul(height_m)?)
            .map(|bmi| bmi.round_dp(2))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageNote {
    pub id: Uuid,
    pub triage_record_id: Uuid,
    pub note: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(TriageNote, "triage_note");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTriage {
    pub patient_id: Uuid,
    pub queue_entry_id: Option<Uuid>,
    pub vitals: VitalSigns,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub chief_complaint: String,
    pub brief_history: Option<String>,
    pub triage_level: u8,
    pub notes: Option<String>,
}

/// A triage record with its derived values and notes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageDetail {
    #[serde(flatten)]
    pub record: TriageRecord,
    pub bmi: Option<Decimal>,
    pub notes_log: Vec<TriageNote>,
}

pub struct TriageService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl TriageService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn record_triage(
        &self,
        principal: &Principal,
        request: RecordTriage,
    ) -> Result<TriageRecord> {
        require_range("Triage level", request.triage_level, 1, 5)?;
        require_text("Chief complaint", &request.chief_complaint)?;
        request.vitals.validate()?;

        let patient = self.db.require::<Patient>(request.patient_id).await?;
        if let Some(entry_id) = request.queue_entry_id {
            let entry = self.db.require::<QueueEntry>(entry_id).await?;
            if entry.patient_id != patient.id {
                return Err(HimsError::validation("Queue entry belongs to a different patient"));
            }
            if !entry.is_open() {
                return Err(HimsError::invalid_state("Queue entry has already been served"));
            }
        }

        let now = Utc::now();
        let record = TriageRecord {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            queue_entry_id: request.queue_entry_id,
            vitals: request.vitals,
            weight_kg: request.weight_kg,
            height_cm: request.height_cm,
            chief_complaint: request.chief_complaint,
            brief_history: request.brief_history,
            triage_level: request.triage_level,
            nurse_id: principal.user_id,
            notes: request.notes,
            triage_time: now,
            updated_at: now,
            completed_at: None,
            outcome: None,
        };
        self.db.insert(&record).await?;
        info!(triage_id = %record.id, level = record.triage_level, "Triage recorded");
        Ok(record)
    }

    pub async fn get_triage(&self, id: Uuid) -> Result<TriageDetail> {
        let record = self.db.require::<TriageRecord>(id).await?.into_inner();
        let mut notes_log: Vec<TriageNote> = self
            .db
            .find::<TriageNote>(json!({ "triage_record_id": id }))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        notes_log.sort_by_key(|note| note.created_at);
        Ok(TriageDetail {
            bmi: record.bmi(),
            record,
            notes_log,
        })
    }

    pub async fn list_triage(&self, patient_id: Option<Uuid>) -> Result<Vec<TriageRecord>> {
        let filter = match patient_id {
            Some(patient_id) => json!({ "patient_id": patient_id }),
            None => json!({}),
        };
        let mut records: Vec<TriageRecord> = self
            .db
            .find::<TriageRecord>(filter)
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        records.sort_by(|a, b| b.triage_time.cmp(&a.triage_time));
        Ok(records)
    }

    pub async fn add_triage_note(
        &self,
        principal: &Principal,
        triage_id: Uuid,
        note: &str,
    ) -> Result<TriageNote> {
        require_text("Note", note)?;
        self.db.require::<TriageRecord>(triage_id).await?;
        let note = TriageNote {
            id: Uuid::new_v4(),
            triage_record_id: triage_id,
            note: note.trim().to_string(),
            created_by: principal.user_id,
            created_at: Utc::now(),
        };
        self.db.insert(&note).await?;
        Ok(note)
    }

    /// Reprioritize the linked queue entry from the triage level and alert
    /// the department that will see the patient
    pub async fn complete_triage(
        &self,
        principal: &Principal,
        triage_id: Uuid,
    ) -> Result<TriageOutcome> {
        let db = &self.db;
        let (record, outcome) = db
            .transact("complete_triage", move || async move {
                let mut record = db.require::<TriageRecord>(triage_id).await?;
                if record.completed_at.is_some() {
                    return Err(HimsError::invalid_state("Triage has already been completed"));
                }
                let entry_id = record.queue_entry_id.ok_or_else(|| {
                    HimsError::validation("Triage record is not linked to a queue entry")
                })?;
                let mut entry = db.require::<QueueEntry>(entry_id).await?;

                let priority = priority_for_level(record.triage_level);
                entry.reprioritize(priority)?;
                let outcome = TriageOutcome {
                    queue_entry_id: entry.id,
                    priority,
                    department: routing_department(record.triage_level, &entry.department),
                };
                let now = Utc::now();
                record.completed_at = Some(now);
                record.updated_at = now;
                record.outcome = Some(outcome.clone());

                let mut changes = ChangeSet::new();
                changes.update(&record)?;
                changes.update(&entry)?;
                db.commit(changes).await?;
                Ok((record.into_inner(), outcome))
            })
            .await?;

        let patient_name = self
            .db
            .get::<Patient>(record.patient_id)
            .await?
            .map(|p| p.full_name())
            .unwrap_or_else(|| "Patient".to_string());
        let kind = if outcome.priority == QueuePriority::Emergency {
            NotificationType::Alert
        } else {
            NotificationType::Info
        };
        self.notifier
            .dispatch(
                Notice::to_department(
                    outcome.department.clone(),
                    "Triage completed",
                    format!(
                        "{} triaged at level {} ({:?} priority)",
                        patient_name, record.triage_level, outcome.priority
                    ),
                )
                .from_sender(principal.user_id)
                .kind(kind)
                .with_data(json!({
                    "triage_record_id": record.id,
                    "patient_id": record.patient_id,
                    "queue_entry_id": outcome.queue_entry_id,
                    "triage_level": record.triage_level,
                    "priority": outcome.priority,
                })),
            )
            .await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Clinic;
    use auth_identity::StaffRole;

    fn vitals() -> VitalSigns {
        VitalSigns {
            temperature: Decimal::new(368, 1),
            pulse_rate: 88,
            respiratory_rate: 18,
            blood_pressure_systolic: 120,
            blood_pressure_diastolic: 80,
            oxygen_saturation: 97,
        }
    }

    fn request(patient_id: Uuid, queue_entry_id: Option<Uuid>, level: u8) -> RecordTriage {
        RecordTriage {
            patient_id,
            queue_entry_id,
            vitals: vitals(),
            weight_kg: Some(Decimal::from(70)),
            height_cm: Some(Decimal::from(175)),
            chief_complaint: "Chest pain".into(),
            brief_history: None,
            triage_level: level,
            notes: None,
        }
    }

    #[test]
    fn level_maps_to_priority() {
        assert_eq!(priority_for_level(1), QueuePriority::Emergency);
        assert_eq!(priority_for_level(2), QueuePriority::Emergency);
        assert_eq!(priority_for_level(3), QueuePriority::Urgent);
        assert_eq!(priority_for_level(4), QueuePriority::Normal);
        assert_eq!(priority_for_level(5), QueuePriority::Normal);
        assert_eq!(routing_department(2, "opd"), "emergency");
        assert_eq!(routing_department(3, "opd"), "opd");
    }

    #[test]
    fn vitals_are_range_checked() {
        let mut v = vitals();
        assert!(v.validate().is_ok());
        v.oxygen_saturation = 101;
        assert!(v.validate().is_err());
        let mut v = vitals();
        v.blood_pressure_diastolic = 130;
        assert!(v.validate().is_err());
    }

    #[tokio::test]
    async fn bmi_is_derived_from_weight_and_height() {
        let clinic = Clinic::new();
        let (patient, entry) = clinic.queued_patient("opd").await;
        let record = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), 4))
            .await
            .unwrap();
        let detail = clinic.triage.get_triage(record.id).await.unwrap();
        assert_eq!(detail.bmi, Some(Decimal::new(2286, 2)));
    }

    #[tokio::test]
    async fn level_one_triage_becomes_emergency_and_alerts_emergency_department() {
        let clinic = Clinic::new();
        let on_call = clinic.staff(StaffRole::Doctor, Some("emergency")).await;
        let opd_doctor = clinic.staff(StaffRole::Doctor, Some("opd")).await;
        let (patient, entry) = clinic.queued_patient("opd").await;
        let opd_before = clinic.hub.unread_count(opd_doctor.id).await.unwrap();

        let record = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), 1))
            .await
            .unwrap();
        let outcome = clinic.triage.complete_triage(&clinic.nurse, record.id).await.unwrap();

        assert_eq!(outcome.priority, QueuePriority::Emergency);
        assert_eq!(outcome.department, "emergency");
        let entry = clinic.reception.get_queue_entry(entry.id).await.unwrap();
        assert_eq!(entry.priority, QueuePriority::Emergency);
        assert_eq!(entry.department, "opd");

        let inbox = clinic.hub.list_for_user(on_call.id, false, 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::Alert);
        assert_eq!(clinic.hub.unread_count(opd_doctor.id).await.unwrap(), opd_before);
    }

    #[tokio::test]
    async fn level_three_stays_in_original_department() {
        let clinic = Clinic::new();
        let opd_doctor = clinic.staff(StaffRole::Doctor, Some("opd")).await;
        let (patient, entry) = clinic.queued_patient("opd").await;
        let before = clinic.hub.unread_count(opd_doctor.id).await.unwrap();
        let record = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), 3))
            .await
            .unwrap();
        let outcome = clinic.triage.complete_triage(&clinic.nurse, record.id).await.unwrap();
        assert_eq!(outcome.priority, QueuePriority::Urgent);
        assert_eq!(outcome.department, "opd");
        assert_eq!(clinic.hub.unread_count(opd_doctor.id).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn completion_requires_queue_link_and_happens_once() {
        let clinic = Clinic::new();
        let (patient, entry) = clinic.queued_patient("opd").await;

        let unlinked = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, None, 2))
            .await
            .unwrap();
        assert!(matches!(
            clinic.triage.complete_triage(&clinic.nurse, unlinked.id).await,
            Err(HimsError::Validation(_))
        ));

        let linked = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), 5))
            .await
            .unwrap();
        clinic.triage.complete_triage(&clinic.nurse, linked.id).await.unwrap();
        assert!(matches!(
            clinic.triage.complete_triage(&clinic.nurse, linked.id).await,
            Err(HimsError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn invalid_level_is_rejected() {
        let clinic = Clinic::new();
        let (patient, entry) = clinic.queued_patient("opd").await;
        for level in [0, 6] {
            assert!(matches!(
                clinic
                    .triage
                    .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), level))
                    .await,
                Err(HimsError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn notes_are_listed_in_order() {
        let clinic = Clinic::new();
        let (patient, entry) = clinic.queued_patient("opd").await;
        let record = clinic
            .triage
            .record_triage(&clinic.nurse, request(patient.id, Some(entry.id), 4))
            .await
            .unwrap();
        clinic.triage.add_triage_note(&clinic.nurse, record.id, "Pain 6/10").await.unwrap();
        clinic.triage.add_triage_note(&clinic.nurse, record.id, "Given water").await.unwrap();
        assert!(clinic.triage.add_triage_note(&clinic.nurse, record.id, "").await.is_err());

        let detail = clinic.triage.get_triage(record.id).await.unwrap();
        let notes: Vec<&str> = detail.notes_log.iter().map(|n| n.note.as_str()).collect();
        assert_eq!(notes, vec!["Pain 6/10", "Given water"]);
        assert_eq!(clinic.triage.list_triage(Some(patient.id)).await.unwrap().len(), 1);
    }
}
