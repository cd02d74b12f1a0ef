use std::sync::Arc;

use auth_identity::{Principal, StaffMember, StaffRole};
use chrono::Utc;
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::require_text;
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink};
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::models::*;

/// Front desk: registration, appointments and the department queue
pub struct ReceptionService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl ReceptionService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn register_patient(
        &self,
        principal: &Principal,
        request: RegisterPatient,
    ) -> Result<Patient> {
        require_text("First name", &request.first_name)?;
        require_text("Last name", &request.last_name)?;
        require_text("Phone number", &request.phone_number)?;
        let now = Utc::now();
        if request.date_of_birth > now.date_naive() {
            return Err(HimsError::validation("Date of birth cannot be in the future"));
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            patient_number: self.db.unique_reference::<Patient>("PAT", "patient_number").await?,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            blood_type: request.blood_type,
            phone_number: request.phone_number.trim().to_string(),
            email: request.email,
            address: request.address,
            city: request.city,
            emergency_contact_name: request.emergency_contact_name,
            emergency_contact_phone: request.emergency_contact_phone,
            allergies: request.allergies,
            chronic_conditions: request.chronic_conditions,
            registration_date: now,
            last_visit_date: None,
            is_active: true,
            active_stay_id: None,
            registered_by: principal.user_id,
            updated_at: now,
        };
        self.db.insert(&patient).await?;
        info!(patient_id = %patient.id, "Patient registered");
        Ok(patient)
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<Patient> {
        Ok(self.db.require::<Patient>(id).await?.into_inner())
    }

    pub async fn update_patient(&self, id: Uuid, changes: UpdatePatient) -> Result<Patient> {
        let db = &self.db;
        let changes = &changes;
        db.transact("update_patient", move || async move {
            let mut patient = db.require::<Patient>(id).await?;
            if let Some(first_name) = &changes.first_name {
                require_text("First name", first_name)?;
                patient.first_name = first_name.trim().to_string();
            }
            if let Some(last_name) = &changes.last_name {
                require_text("Last name", last_name)?;
                patient.last_name = last_name.trim().to_string();
            }
            if let Some(phone) = &changes.phone_number {
                require_text("Phone number", phone)?;
                patient.phone_number = phone.trim().to_string();
            }
            let optional = [
                (&changes.blood_type, &mut patient.value.blood_type),
                (&changes.email, &mut patient.value.email),
                (&changes.address, &mut patient.value.address),
                (&changes.city, &mut patient.value.city),
                (&changes.emergency_contact_name, &mut patient.value.emergency_contact_name),
                (&changes.emergency_contact_phone, &mut patient.value.emergency_contact_phone),
                (&changes.allergies, &mut patient.value.allergies),
                (&changes.chronic_conditions, &mut patient.value.chronic_conditions),
            ];
            for (update, field) in optional {
                if let Some(value) = update {
                    *field = Some(value.clone());
                }
            }
            patient.updated_at = Utc::now();
            db.update(&patient).await?;
            Ok(patient.into_inner())
        })
        .await
    }

    /// Patients are never deleted; they are marked inactive
    pub async fn deactivate_patient(&self, id: Uuid) -> Result<Patient> {
        let db = &self.db;
        db.transact("deactivate_patient", move || async move {
            let mut patient = db.require::<Patient>(id).await?;
            patient.is_active = false;
            patient.updated_at = Utc::now();
            db.update(&patient).await?;
            Ok(patient.into_inner())
        })
        .await
    }

    pub async fn list_patients(&self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        let mut query = Map::new();
        if let Some(gender) = filter.gender {
            query.insert("gender".into(), json!(gender));
        }
        if let Some(blood_type) = &filter.blood_type {
            query.insert("blood_type".into(), json!(blood_type));
        }
        if let Some(active) = filter.is_active {
            query.insert("is_active".into(), json!(active));
        }
        let mut patients = values(self.db.find::<Patient>(Value::Object(query)).await?);
        patients.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        Ok(patients)
    }

    /// Case-insensitive match on name, patient number or phone
    pub async fn search_patients(&self, query: &str) -> Result<Vec<Patient>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HimsError::validation("Search query is required"));
        }
        let mut patients: Vec<Patient> = values(self.db.all::<Patient>().await?)
            .into_iter()
            .filter(|patient| patient.matches(query))
            .collect();
        patients.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(patients)
    }

    pub async fn schedule_appointment(
        &self,
        principal: &Principal,
        request: ScheduleAppointment,
    ) -> Result<Appointment> {
        require_text("Reason", &request.reason)?;
        let patient = self.db.require::<Patient>(request.patient_id).await?;
        patient.ensure_active()?;
        let doctor = self.db.require::<StaffMember>(request.doctor_id).await?;
        if doctor.role != StaffRole::Doctor || !doctor.is_active {
            return Err(HimsError::validation("Selected staff member is not an active doctor"));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            reason: request.reason,
            notes: request.notes,
            status: AppointmentStatus::Scheduled,
            queue_entry_id: None,
            created_by: principal.user_id,
            created_at: now,
            updated_at: now,
        };
        self.db.insert(&appointment).await?;

        self.notifier
            .dispatch(
                Notice::to_user(
                    doctor.id,
                    "New appointment",
                    format!(
                        "{} booked for {} at {}",
                        patient.full_name(),
                        appointment.scheduled_date,
                        appointment.scheduled_time.format("%H:%M")
                    ),
                )
                .from_sender(principal.user_id)
                .with_data(json!({ "appointment_id": appointment.id })),
            )
            .await;
        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        Ok(self.db.require::<Appointment>(id).await?.into_inner())
    }

    pub async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut query = Map::new();
        if let Some(date) = filter.date {
            query.insert("scheduled_date".into(), json!(date));
        }
        if let Some(status) = filter.status {
            query.insert("status".into(), json!(status));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query.insert("doctor_id".into(), json!(doctor_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query.insert("patient_id".into(), json!(patient_id));
        }
        let mut appointments = values(self.db.find::<Appointment>(Value::Object(query)).await?);
        appointments.sort_by(|a, b| {
            (a.scheduled_date, a.scheduled_time).cmp(&(b.scheduled_date, b.scheduled_time))
        });
        Ok(appointments)
    }

    pub async fn todays_appointments(&self) -> Result<Vec<Appointment>> {
        self.list_appointments(&AppointmentFilter {
            date: Some(Utc::now().date_naive()),
            ..Default::default()
        })
        .await
    }

    /// Check a scheduled appointment in and queue the patient in the
    /// doctor's department
    pub async fn check_in(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> Result<QueueEntry> {
        let db = &self.db;
        let (entry, patient) = db
            .transact("check_in", move || async move {
                let mut appointment = db.require::<Appointment>(appointment_id).await?;
                if appointment.status != AppointmentStatus::Scheduled {
                    return Err(HimsError::invalid_state(
                        "Only scheduled appointments can be checked in",
                    ));
                }
                let mut patient = db.require::<Patient>(appointment.patient_id).await?;
                patient.ensure_active()?;
                let doctor = db.require::<StaffMember>(appointment.doctor_id).await?;
                let department = doctor.department.clone().unwrap_or_default();

                let entry = QueueEntry::new(
                    patient.id,
                    Some(appointment.id),
                    &department,
                    QueuePriority::Normal,
                    principal.user_id,
                );
                appointment.transition(AppointmentStatus::CheckedIn)?;
                appointment.queue_entry_id = Some(entry.id);
                patient.last_visit_date = Some(Utc::now().date_naive());
                patient.updated_at = Utc::now();

                let mut changes = ChangeSet::new();
                changes.insert(&entry)?;
                changes.update(&appointment)?;
                changes.update(&patient)?;
                db.commit(changes).await?;
                Ok((entry, patient.into_inner()))
            })
            .await?;

        self.announce_arrival(principal, &entry, &patient).await;
        Ok(entry)
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<Appointment> {
        let db = &self.db;
        db.transact("cancel_appointment", move || async move {
            let mut appointment = db.require::<Appointment>(appointment_id).await?;
            if appointment.status != AppointmentStatus::Scheduled {
                return Err(HimsError::invalid_state(
                    "Only scheduled appointments can be cancelled",
                ));
            }
            appointment.transition(AppointmentStatus::Cancelled)?;
            db.update(&appointment).await?;
            Ok(appointment.into_inner())
        })
        .await
    }

    /// Walk-in arrival
    pub async fn enqueue(&self, principal: &Principal, request: Enqueue) -> Result<QueueEntry> {
        let patient = self.db.require::<Patient>(request.patient_id).await?;
        patient.ensure_active()?;
        let open = self
            .db
            .find::<QueueEntry>(json!({ "patient_id": patient.id }))
            .await?
            .into_iter()
            .any(|entry| entry.is_open());
        if open {
            return Err(HimsError::invalid_state("Patient is already in the queue"));
        }

        let entry = QueueEntry::new(
            patient.id,
            None,
            &request.department,
            request.priority.unwrap_or(QueuePriority::Normal),
            principal.user_id,
        );
        let mut patient = patient;
        patient.last_visit_date = Some(Utc::now().date_naive());
        patient.updated_at = Utc::now();
        let mut changes = ChangeSet::new();
        changes.insert(&entry)?;
        changes.update(&patient)?;
        self.db.commit(changes).await?;

        self.announce_arrival(principal, &entry, &patient).await;
        Ok(entry)
    }

    pub async fn get_queue_entry(&self, id: Uuid) -> Result<QueueEntry> {
        Ok(self.db.require::<QueueEntry>(id).await?.into_inner())
    }

    /// Waiting patients in service order
    pub async fn current_queue(&self, department: Option<&str>) -> Result<Vec<QueueEntry>> {
        let filter = match department {
            Some(department) => json!({
                "status": QueueStatus::Waiting,
                "department": normalize_department(department),
            }),
            None => json!({ "status": QueueStatus::Waiting }),
        };
        let mut queue = values(self.db.find::<QueueEntry>(filter).await?);
        queue.sort_by(service_order);
        Ok(queue)
    }

    pub async fn update_priority(
        &self,
        entry_id: Uuid,
        priority: QueuePriority,
    ) -> Result<QueueEntry> {
        self.mutate_entry("update_priority", entry_id, move |entry| entry.reprioritize(priority))
            .await
    }

    pub async fn start_service(&self, entry_id: Uuid) -> Result<QueueEntry> {
        self.mutate_entry("start_service", entry_id, QueueEntry::begin_service)
            .await
    }

    pub async fn complete_service(&self, entry_id: Uuid) -> Result<QueueEntry> {
        self.mutate_entry("complete_service", entry_id, QueueEntry::finish)
            .await
    }

    async fn mutate_entry<F>(
        &self,
        operation: &'static str,
        entry_id: Uuid,
        apply: F,
    ) -> Result<QueueEntry>
    where
        F: Fn(&mut QueueEntry) -> Result<()>,
    {
        let db = &self.db;
        let apply = &apply;
        db.transact(operation, move || async move {
            let mut entry = db.require::<QueueEntry>(entry_id).await?;
            apply(&mut entry)?;
            db.update(&entry).await?;
            Ok(entry.into_inner())
        })
        .await
    }

    async fn announce_arrival(&self, principal: &Principal, entry: &QueueEntry, patient: &Patient) {
        self.notifier
            .dispatch(
                Notice::to_department(
                    entry.department.clone(),
                    "Patient checked in",
                    format!("{} is waiting in {}", patient.full_name(), entry.department),
                )
                .from_sender(principal.user_id)
                .with_data(json!({ "queue_entry_id": entry.id, "patient_id": patient.id })),
            )
            .await;
    }
}

fn values<T>(records: Vec<Versioned<T>>) -> Vec<T> {
    records.into_iter().map(Versioned::into_inner).collect()
}
