//! Doctor consultations and the orders raised from them

use std::sync::Arc;

use auth_identity::{Principal, StaffRole};
use chrono::{DateTime, Utc};
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::require_text;
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink};
use reception_service::{Appointment, AppointmentStatus, Patient, QueueEntry, QueueStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::laboratory::LabTest;

pub const PHARMACY_DEPARTMENT: &str = "pharmacy";
pub const LABORATORY_DEPARTMENT: &str = "laboratory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub queue_entry_id: Option<Uuid>,
    pub chief_complaint: String,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub review_of_systems: Value,
    pub physical_examination: Value,
    pub assessment: Option<String>,
    pub diagnosis: Option<String>,
    pub plan: Option<String>,
    pub follow_up: Option<String>,
    pub status: ConsultationStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Consultation, "consultation");

impl Consultation {
    fn ensure_in_progress(&self) -> Result<()> {
        if self.status != ConsultationStatus::InProgress {
            return Err(HimsError::invalid_state("Consultation has already been completed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConsultation {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub queue_entry_id: Option<Uuid>,
    pub chief_complaint: String,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConsultation {
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub review_of_systems: Option<Value>,
    pub physical_examination: Option<Value>,
    pub assessment: Option<String>,
    pub diagnosis: Option<String>,
    pub plan: Option<String>,
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationNote {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub note: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(ConsultationNote, "consultation_note");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Dispensed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    /// Catalogue entry, when the doctor picked one
    pub medication_id: Option<Uuid>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub prescribed_by: Uuid,
    pub prescribed_at: DateTime<Utc>,
    pub status: PrescriptionStatus,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Prescription, "prescription");

impl Prescription {
    pub fn mark_dispensed(&mut self) -> Result<()> {
        if self.status != PrescriptionStatus::Pending {
            return Err(HimsError::invalid_state("Prescription is not pending"));
        }
        let now = Utc::now();
        self.status = PrescriptionStatus::Dispensed;
        self.dispensed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub medication_id: Option<Uuid>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabRequestStatus {
    Pending,
    SampleCollected,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabRequest {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub lab_test_id: Option<Uuid>,
    pub test_name: String,
    pub test_type: String,
    pub instructions: Option<String>,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub status: LabRequestStatus,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(LabRequest, "lab_request");

impl LabRequest {
    pub fn transition(&mut self, to: LabRequestStatus) -> Result<()> {
        use LabRequestStatus::*;
        let allowed = matches!(
            (self.status, to),
            (Pending, SampleCollected) | (Pending, Cancelled) | (SampleCollected, Completed)
        );
        if !allowed {
            return Err(HimsError::invalid_state(format!(
                "Cannot move lab request from {:?} to {:?}",
                self.status, to
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLabRequest {
    pub lab_test_id: Option<Uuid>,
    pub test_name: Option<String>,
    pub test_type: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<ConsultationStatus>,
}

/// A consultation with everything ordered during it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationDetail {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub notes: Vec<ConsultationNote>,
    pub prescriptions: Vec<Prescription>,
    pub lab_requests: Vec<LabRequest>,
}

fn values<T>(records: Vec<Versioned<T>>) -> Vec<T> {
    records.into_iter().map(Versioned::into_inner).collect()
}

fn filter_of(pairs: &[(&str, Option<Value>)]) -> Value {
    let map: serde_json::Map<String, Value> = pairs
        .iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect();
    Value::Object(map)
}

fn set_text(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let value = value.trim().to_string();
        *target = if value.is_empty() { None } else { Some(value) };
    }
}

pub struct ConsultationService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl ConsultationService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    /// Open a consultation, pulling the patient out of the waiting queue
    pub async fn start_consultation(
        &self,
        principal: &Principal,
        request: StartConsultation,
    ) -> Result<Consultation> {
        if !principal.has_any_role(&[StaffRole::Doctor]) {
            return Err(HimsError::forbidden("Only doctors can start consultations"));
        }
        require_text("Chief complaint", &request.chief_complaint)?;

        let db = &self.db;
        let request = &request;
        let consultation = db
            .transact("start_consultation", move || async move {
                let patient = db.require::<Patient>(request.patient_id).await?;
                patient.ensure_active()?;
                let mut changes = ChangeSet::new();

                let mut queue_entry_id = request.queue_entry_id;
                let mut appointment_id = request.appointment_id;
                if let Some(entry_id) = queue_entry_id {
                    let mut entry = db.require::<QueueEntry>(entry_id).await?;
                    if entry.patient_id != patient.id {
                        return Err(HimsError::validation(
                            "Queue entry belongs to a different patient",
                        ));
                    }
                    entry.begin_service()?;
                    appointment_id = appointment_id.or(entry.appointment_id);
                    changes.update(&entry)?;
                }
                if let Some(id) = appointment_id {
                    let mut appointment = db.require::<Appointment>(id).await?;
                    if appointment.patient_id != patient.id {
                        return Err(HimsError::validation(
                            "Appointment belongs to a different patient",
                        ));
                    }
                    queue_entry_id = queue_entry_id.or(appointment.queue_entry_id);
                    if appointment.status == AppointmentStatus::CheckedIn {
                        appointment.transition(AppointmentStatus::InProgress)?;
                        changes.update(&appointment)?;
                    }
                }

                let now = Utc::now();
                let consultation = Consultation {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    doctor_id: principal.user_id,
                    appointment_id,
                    queue_entry_id,
                    chief_complaint: request.chief_complaint.trim().to_string(),
                    history_of_present_illness: request.history_of_present_illness.clone(),
                    past_medical_history: request.past_medical_history.clone(),
                    current_medications: request.current_medications.clone(),
                    allergies: request.allergies.clone().or_else(|| patient.allergies.clone()),
                    review_of_systems: json!({}),
                    physical_examination: json!({}),
                    assessment: None,
                    diagnosis: None,
                    plan: None,
                    follow_up: None,
                    status: ConsultationStatus::InProgress,
                    started_at: now,
                    completed_at: None,
                    updated_at: now,
                };
                changes.insert(&consultation)?;
                db.commit(changes).await?;
                Ok(consultation)
            })
            .await?;

        info!(
            consultation_id = %consultation.id,
            patient_id = %consultation.patient_id,
            "Consultation started"
        );
        Ok(consultation)
    }

    pub async fn get_consultation(&self, id: Uuid) -> Result<ConsultationDetail> {
        let consultation = self.db.require::<Consultation>(id).await?.into_inner();
        let by_consultation = json!({ "consultation_id": id });

        let mut notes = values(self.db.find::<ConsultationNote>(by_consultation.clone()).await?);
        notes.sort_by_key(|note| note.created_at);
        let mut prescriptions =
            values(self.db.find::<Prescription>(by_consultation.clone()).await?);
        prescriptions.sort_by_key(|p| p.prescribed_at);
        let mut lab_requests = values(self.db.find::<LabRequest>(by_consultation).await?);
        lab_requests.sort_by_key(|r| r.requested_at);

        Ok(ConsultationDetail {
            consultation,
            notes,
            prescriptions,
            lab_requests,
        })
    }

    pub async fn list_consultations(
        &self,
        filter: &ConsultationFilter,
    ) -> Result<Vec<Consultation>> {
        let query = filter_of(&[
            ("patient_id", filter.patient_id.map(|id| json!(id))),
            ("doctor_id", filter.doctor_id.map(|id| json!(id))),
            ("status", filter.status.map(|s| json!(s))),
        ]);
        let mut consultations = values(self.db.find::<Consultation>(query).await?);
        consultations.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(consultations)
    }

    pub async fn update_consultation(
        &self,
        id: Uuid,
        changes: UpdateConsultation,
    ) -> Result<Consultation> {
        let db = &self.db;
        let changes = &changes;
        db.transact("update_consultation", move || async move {
            let mut consultation = db.require::<Consultation>(id).await?;
            consultation.ensure_in_progress()?;
            let changes = changes.clone();
            set_text(
                &mut consultation.history_of_present_illness,
                changes.history_of_present_illness,
            );
            set_text(&mut consultation.past_medical_history, changes.past_medical_history);
            set_text(&mut consultation.current_medications, changes.current_medications);
            set_text(&mut consultation.allergies, changes.allergies);
            set_text(&mut consultation.assessment, changes.assessment);
            set_text(&mut consultation.diagnosis, changes.diagnosis);
            set_text(&mut consultation.plan, changes.plan);
            set_text(&mut consultation.follow_up, changes.follow_up);
            if let Some(review) = changes.review_of_systems {
                consultation.review_of_systems = review;
            }
            if let Some(exam) = changes.physical_examination {
                consultation.physical_examination = exam;
            }
            consultation.updated_at = Utc::now();
            db.update(&consultation).await?;
            Ok(consultation.into_inner())
        })
        .await
    }

    /// Close the consultation along with its queue entry and appointment
    pub async fn complete_consultation(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Consultation> {
        let db = &self.db;
        let consultation = db
            .transact("complete_consultation", move || async move {
                let mut consultation = db.require::<Consultation>(id).await?;
                consultation.ensure_in_progress()?;
                if consultation.doctor_id != principal.user_id && !principal.is_admin() {
                    return Err(HimsError::forbidden(
                        "Only the attending doctor can complete this consultation",
                    ));
                }
                let mut changes = ChangeSet::new();

                if let Some(entry_id) = consultation.queue_entry_id {
                    let mut entry = db.require::<QueueEntry>(entry_id).await?;
                    if entry.status == QueueStatus::InProgress {
                        entry.finish()?;
                        changes.update(&entry)?;
                    }
                }
                if let Some(appointment_id) = consultation.appointment_id {
                    let mut appointment = db.require::<Appointment>(appointment_id).await?;
                    if matches!(
                        appointment.status,
                        AppointmentStatus::CheckedIn | AppointmentStatus::InProgress
                    ) {
                        appointment.transition(AppointmentStatus::Completed)?;
                        changes.update(&appointment)?;
                    }
                }

                let now = Utc::now();
                consultation.status = ConsultationStatus::Completed;
                consultation.completed_at = Some(now);
                consultation.updated_at = now;
                changes.update(&consultation)?;
                db.commit(changes).await?;
                Ok(consultation.into_inner())
            })
            .await?;
        info!(consultation_id = %consultation.id, "Consultation completed");
        Ok(consultation)
    }

    pub async fn add_note(
        &self,
        principal: &Principal,
        consultation_id: Uuid,
        note: &str,
    ) -> Result<ConsultationNote> {
        require_text("Note", note)?;
        self.db.require::<Consultation>(consultation_id).await?;
        let note = ConsultationNote {
            id: Uuid::new_v4(),
            consultation_id,
            note: note.trim().to_string(),
            created_by: principal.user_id,
            created_at: Utc::now(),
        };
        self.db.insert(&note).await?;
        Ok(note)
    }

    pub async fn prescribe(
        &self,
        principal: &Principal,
        consultation_id: Uuid,
        request: NewPrescription,
    ) -> Result<Prescription> {
        require_text("Medication name", &request.medication_name)?;
        require_text("Dosage", &request.dosage)?;
        require_text("Frequency", &request.frequency)?;
        require_text("Duration", &request.duration)?;

        let consultation = self.db.require::<Consultation>(consultation_id).await?;
        consultation.ensure_in_progress()?;

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            consultation_id,
            patient_id: consultation.patient_id,
            medication_id: request.medication_id,
            medication_name: request.medication_name.trim().to_string(),
            dosage: request.dosage,
            frequency: request.frequency,
            duration: request.duration,
            instructions: request.instructions,
            prescribed_by: principal.user_id,
            prescribed_at: now,
            status: PrescriptionStatus::Pending,
            dispensed_at: None,
            updated_at: now,
        };
        self.db.insert(&prescription).await?;

        self.notifier
            .dispatch(
                Notice::to_department(
                    PHARMACY_DEPARTMENT,
                    "New prescription",
                    format!("{} {} prescribed", prescription.medication_name, prescription.dosage),
                )
                .from_sender(principal.user_id)
                .with_data(json!({
                    "prescription_id": prescription.id,
                    "patient_id": prescription.patient_id,
                })),
            )
            .await;
        Ok(prescription)
    }

    pub async fn get_prescription(&self, id: Uuid) -> Result<Prescription> {
        Ok(self.db.require::<Prescription>(id).await?.into_inner())
    }

    pub async fn list_prescriptions(
        &self,
        patient_id: Option<Uuid>,
        status: Option<PrescriptionStatus>,
    ) -> Result<Vec<Prescription>> {
        let query = filter_of(&[
            ("patient_id", patient_id.map(|id| json!(id))),
            ("status", status.map(|s| json!(s))),
        ]);
        let mut prescriptions = values(self.db.find::<Prescription>(query).await?);
        prescriptions.sort_by_key(|p| p.prescribed_at);
        Ok(prescriptions)
    }

    pub async fn cancel_prescription(&self, id: Uuid) -> Result<Prescription> {
        let db = &self.db;
        db.transact("cancel_prescription", move || async move {
            let mut prescription = db.require::<Prescription>(id).await?;
            if prescription.status != PrescriptionStatus::Pending {
                return Err(HimsError::invalid_state("Only pending prescriptions can be cancelled"));
            }
            prescription.status = PrescriptionStatus::Cancelled;
            prescription.updated_at = Utc::now();
            db.update(&prescription).await?;
            Ok(prescription.into_inner())
        })
        .await
    }

    pub async fn request_lab(
        &self,
        principal: &Principal,
        consultation_id: Uuid,
        request: NewLabRequest,
    ) -> Result<LabRequest> {
        let consultation = self.db.require::<Consultation>(consultation_id).await?;
        consultation.ensure_in_progress()?;

        let (test_name, test_type) = match request.lab_test_id {
            Some(test_id) => {
                let test = self.db.require::<LabTest>(test_id).await?;
                if !test.is_active {
                    return Err(HimsError::invalid_state("Lab test is no longer offered"));
                }
                (
                    request.test_name.unwrap_or_else(|| test.name.clone()),
                    request.test_type.unwrap_or_else(|| test.category.clone()),
                )
            }
            None => {
                let name = request.test_name.unwrap_or_default();
                require_text("Test name", &name)?;
                (name, request.test_type.unwrap_or_else(|| "general".to_string()))
            }
        };

        let now = Utc::now();
        let lab_request = LabRequest {
            id: Uuid::new_v4(),
            consultation_id,
            patient_id: consultation.patient_id,
            lab_test_id: request.lab_test_id,
            test_name,
            test_type,
            instructions: request.instructions,
            requested_by: principal.user_id,
            requested_at: now,
            status: LabRequestStatus::Pending,
            updated_at: now,
        };
        self.db.insert(&lab_request).await?;

        self.notifier
            .dispatch(
                Notice::to_department(
                    LABORATORY_DEPARTMENT,
                    "New lab request",
                    format!("{} requested", lab_request.test_name),
                )
                .from_sender(principal.user_id)
                .with_data(json!({
                    "lab_request_id": lab_request.id,
                    "patient_id": lab_request.patient_id,
                })),
            )
            .await;
        Ok(lab_request)
    }

    pub async fn get_lab_request(&self, id: Uuid) -> Result<LabRequest> {
        Ok(self.db.require::<LabRequest>(id).await?.into_inner())
    }

    pub async fn list_lab_requests(
        &self,
        patient_id: Option<Uuid>,
        status: Option<LabRequestStatus>,
    ) -> Result<Vec<LabRequest>> {
        let query = filter_of(&[
            ("patient_id", patient_id.map(|id| json!(id))),
            ("status", status.map(|s| json!(s))),
        ]);
        let mut requests = values(self.db.find::<LabRequest>(query).await?);
        requests.sort_by_key(|r| r.requested_at);
        Ok(requests)
    }

    pub async fn cancel_lab_request(&self, id: Uuid) -> Result<LabRequest> {
        let db = &self.db;
        db.transact("cancel_lab_request", move || async move {
            let mut request = db.require::<LabRequest>(id).await?;
            request.transition(LabRequestStatus::Cancelled)?;
            db.update(&request).await?;
            Ok(request.into_inner())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Clinic;

    fn start(patient_id: Uuid, queue_entry_id: Option<Uuid>) -> StartConsultation {
        StartConsultation {
            patient_id,
            appointment_id: None,
            queue_entry_id,
            chief_complaint: "Headache for three days".into(),
            history_of_present_illness: None,
            past_medical_history: None,
            current_medications: None,
            allergies: None,
        }
    }

    fn amoxicillin() -> NewPrescription {
        NewPrescription {
            medication_id: None,
            medication_name: "Amoxicillin".into(),
            dosage: "500mg".into(),
            frequency: "3x daily".into(),
            duration: "7 days".into(),
            instructions: None,
        }
    }

    #[tokio::test]
    async fn consultation_moves_queue_entry_through_service() {
        let clinic = Clinic::new();
        let (patient, entry) = clinic.queued_patient("opd").await;

        let consultation = clinic
            .consultations
            .start_consultation(&clinic.doctor, start(patient.id, Some(entry.id)))
            .await
            .unwrap();
        let serving = clinic.reception.get_queue_entry(entry.id).await.unwrap();
        assert_eq!(serving.status, QueueStatus::InProgress);

        clinic
            .consultations
            .complete_consultation(&clinic.doctor, consultation.id)
            .await
            .unwrap();
        let served = clinic.reception.get_queue_entry(entry.id).await.unwrap();
        assert_eq!(served.status, QueueStatus::Completed);
        assert!(matches!(
            clinic.consultations.prescribe(&clinic.doctor, consultation.id, amoxicillin()).await,
            Err(HimsError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn only_doctors_start_consultations() {
        let clinic = Clinic::new();
        let (patient, _) = clinic.queued_patient("opd").await;
        assert!(matches!(
            clinic.consultations.start_consultation(&clinic.nurse, start(patient.id, None)).await,
            Err(HimsError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn prescriptions_alert_pharmacy() {
        let clinic = Clinic::new();
        let pharmacist = clinic.staff(StaffRole::Pharmacist, Some("pharmacy")).await;
        let (patient, _) = clinic.queued_patient("opd").await;
        let consultation = clinic
            .consultations
            .start_consultation(&clinic.doctor, start(patient.id, None))
            .await
            .unwrap();

        let prescription = clinic
            .consultations
            .prescribe(&clinic.doctor, consultation.id, amoxicillin())
            .await
            .unwrap();
        assert_eq!(prescription.status, PrescriptionStatus::Pending);
        assert_eq!(prescription.patient_id, patient.id);
        assert_eq!(clinic.hub.unread_count(pharmacist.id).await.unwrap(), 1);

        let mut invalid = amoxicillin();
        invalid.dosage = " ".into();
        assert!(clinic
            .consultations
            .prescribe(&clinic.doctor, consultation.id, invalid)
            .await
            .is_err());

        let detail = clinic.consultations.get_consultation(consultation.id).await.unwrap();
        assert_eq!(detail.prescriptions.len(), 1);
    }

    #[tokio::test]
    async fn lab_request_takes_name_from_catalogue() {
        let clinic = Clinic::new();
        let lab_tech = clinic.staff(StaffRole::LabTechnician, Some("laboratory")).await;
        let test = clinic.catalogue_test("FBC").await;
        let (patient, _) = clinic.queued_patient("opd").await;
        let consultation = clinic
            .consultations
            .start_consultation(&clinic.doctor, start(patient.id, None))
            .await
            .unwrap();

        let request = clinic
            .consultations
            .request_lab(
                &clinic.doctor,
                consultation.id,
                NewLabRequest {
                    lab_test_id: Some(test.id),
                    test_name: None,
                    test_type: None,
                    instructions: Some("Fasting".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(request.test_name, test.name);
        assert_eq!(request.status, LabRequestStatus::Pending);
        assert_eq!(clinic.hub.unread_count(lab_tech.id).await.unwrap(), 1);

        let cancelled = clinic.consultations.cancel_lab_request(request.id).await.unwrap();
        assert_eq!(cancelled.status, LabRequestStatus::Cancelled);
        assert!(clinic.consultations.cancel_lab_request(request.id).await.is_err());
    }

    #[tokio::test]
    async fn update_and_notes() {
        let clinic = Clinic::new();
        let (patient, _) = clinic.queued_patient("opd").await;
        let consultation = clinic
            .consultations
            .start_consultation(&clinic.doctor, start(patient.id, None))
            .await
            .unwrap();

        let updated = clinic
            .consultations
            .update_consultation(
                consultation.id,
                UpdateConsultation {
                    diagnosis: Some("Tension headache".into()),
                    physical_examination: Some(json!({ "neuro": "normal" })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.diagnosis.as_deref(), Some("Tension headache"));
        assert_eq!(updated.physical_examination["neuro"], "normal");

        clinic
            .consultations
            .add_note(&clinic.doctor, consultation.id, "Advised rest")
            .await
            .unwrap();
        let detail = clinic.consultations.get_consultation(consultation.id).await.unwrap();
        assert_eq!(detail.notes.len(), 1);

        let mine = clinic
            .consultations
            .list_consultations(&ConsultationFilter {
                doctor_id: Some(clinic.doctor.user_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
