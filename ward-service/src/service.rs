use std::sync::Arc;

use auth_identity::{Principal, StaffMember, StaffRole};
use chrono::Utc;
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::{require_positive, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink};
use reception_service::Patient;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::models::*;

pub const BILLING_DEPARTMENT: &str = "billing";

fn values<T>(records: Vec<Versioned<T>>) -> Vec<T> {
    records.into_iter().map(Versioned::into_inner).collect()
}

pub struct WardService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl WardService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn create_ward(&self, request: NewWard) -> Result<Ward> {
        require_text("Ward name", &request.name)?;
        require_positive("Capacity", request.capacity)?;
        let name = request.name.trim().to_string();
        if self.db.find_one::<Ward>(json!({ "name": name })).await?.is_some() {
            return Err(HimsError::conflict(format!("Ward {} already exists", name)));
        }
        let ward = Ward {
            id: Uuid::new_v4(),
            name,
            ward_type: request.ward_type.trim().to_lowercase(),
            capacity: request.capacity,
            head_nurse_id: request.head_nurse_id,
            description: request.description,
            is_active: true,
            created_at: Utc::now(),
        };
        self.db.insert(&ward).await?;
        Ok(ward)
    }

    pub async fn get_ward(&self, id: Uuid) -> Result<Ward> {
        Ok(self.db.require::<Ward>(id).await?.into_inner())
    }

    pub async fn list_wards(&self) -> Result<Vec<Ward>> {
        let mut wards = values(self.db.find::<Ward>(json!({ "is_active": true })).await?);
        wards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wards)
    }

    /// Add a bed, refusing to go beyond the ward's capacity
    pub async fn add_bed(&self, ward_id: Uuid, request: NewBed) -> Result<BedView> {
        require_text("Bed number", &request.bed_number)?;
        let db = &self.db;
        let request = &request;
        let bed = db
            .transact("add_bed", move || async move {
                let ward = db.require::<Ward>(ward_id).await?;
                let beds = db.find::<Bed>(json!({ "ward_id": ward_id })).await?;
                let bed_number = request.bed_number.trim().to_uppercase();
                if beds.iter().any(|bed| bed.bed_number == bed_number) {
                    return Err(HimsError::conflict(format!(
                        "Bed {} already exists in {}",
                        bed_number, ward.name
                    )));
                }
                if beds.len() >= ward.capacity as usize {
                    return Err(HimsError::invalid_state(format!(
                        "{} is at its capacity of {} beds",
                        ward.name, ward.capacity
                    )));
                }
                let now = Utc::now();
                let bed = Bed {
                    id: Uuid::new_v4(),
                    ward_id,
                    bed_number,
                    bed_type: request.bed_type.trim().to_lowercase(),
                    condition: BedCondition::Available,
                    occupied_by: None,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                // The ward version serializes concurrent additions
                let mut changes = ChangeSet::new();
                changes.insert(&bed)?;
                changes.update(&ward)?;
                db.commit(changes).await?;
                Ok(bed)
            })
            .await?;
        Ok(bed.into())
    }

    pub async fn get_bed(&self, id: Uuid) -> Result<BedView> {
        Ok(self.db.require::<Bed>(id).await?.into_inner().into())
    }

    pub async fn list_beds(
        &self,
        ward_id: Uuid,
        status: Option<BedStatus>,
    ) -> Result<Vec<BedView>> {
        self.db.require::<Ward>(ward_id).await?;
        let found = self.db.find::<Bed>(json!({ "ward_id": ward_id })).await?;
        let mut beds: Vec<BedView> = values(found)
            .into_iter()
            .map(BedView::from)
            .filter(|view| status.map_or(true, |status| view.status == status))
            .collect();
        beds.sort_by(|a, b| a.bed.bed_number.cmp(&b.bed.bed_number));
        Ok(beds)
    }

    /// Set a bed's condition; occupancy only follows admissions and discharges
    pub async fn change_bed_status(&self, bed_id: Uuid, status: BedStatus) -> Result<BedView> {
        let db = &self.db;
        let bed = db
            .transact("change_bed_status", move || async move {
                let mut bed = db.require::<Bed>(bed_id).await?;
                let active_stay = match bed.occupied_by {
                    Some(stay_id) => db
                        .get::<WardStay>(stay_id)
                        .await?
                        .filter(|stay| stay.is_active),
                    None => None,
                };
                let condition = match status {
                    BedStatus::Occupied => {
                        return match active_stay {
                            Some(_) => Ok(bed.into_inner()),
                            None => Err(HimsError::invalid_state(
                                "Cannot mark a bed occupied without an active ward stay",
                            )),
                        };
                    }
                    BedStatus::Available => BedCondition::Available,
                    BedStatus::Maintenance => BedCondition::Maintenance,
                    BedStatus::Reserved => BedCondition::Reserved,
                };
                if active_stay.is_some() {
                    return Err(HimsError::invalid_state(
                        "Bed is occupied by an active ward stay; discharge the patient first",
                    ));
                }
                bed.occupied_by = None;
                bed.condition = condition;
                bed.updated_at = Utc::now();
                db.update(&bed).await?;
                Ok(bed.into_inner())
            })
            .await?;
        Ok(bed.into())
    }

    pub async fn ward_occupancy(&self, ward_id: Uuid) -> Result<WardOccupancy> {
        let ward = self.db.require::<Ward>(ward_id).await?;
        let beds = values(
            self.db
                .find::<Bed>(json!({ "ward_id": ward_id, "is_active": true }))
                .await?,
        );
        Ok(WardOccupancy::tally(&ward, &beds))
    }

    /// Put a patient in an available bed; the stay, the bed and the patient
    /// are written together
    pub async fn admit(&self, principal: &Principal, request: Admission) -> Result<WardStay> {
        require_text("Admission diagnosis", &request.diagnosis)?;
        let db = &self.db;
        let request = &request;
        let stay = db
            .transact("admit", move || async move {
                let mut patient = db.require::<Patient>(request.patient_id).await?;
                patient.ensure_active()?;
                if patient.active_stay_id.is_some() {
                    return Err(HimsError::invalid_state(
                        "Patient already has an active ward stay",
                    ));
                }
                let attending = db.require::<StaffMember>(request.attending_doctor_id).await?;
                if attending.role != StaffRole::Doctor || !attending.is_active {
                    return Err(HimsError::validation(
                        "Attending doctor must be an active doctor",
                    ));
                }

                let mut bed = db.require::<Bed>(request.bed_id).await?;
                if !bed.is_admittable() {
                    return Err(HimsError::invalid_state("Selected bed is not available"));
                }
                let ward = db.require::<Ward>(bed.ward_id).await?;
                if !ward.is_active {
                    return Err(HimsError::invalid_state(format!("{} is closed", ward.name)));
                }
                let occupied = db
                    .find::<Bed>(json!({ "ward_id": ward.id }))
                    .await?
                    .iter()
                    .filter(|bed| bed.occupied_by.is_some())
                    .count();
                if occupied >= ward.capacity as usize {
                    return Err(HimsError::invalid_state(format!("{} is full", ward.name)));
                }
                let now = Utc::now();
                let stay = WardStay {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    ward_id: ward.id,
                    bed_id: bed.id,
                    admitting_doctor_id: request
                        .admitting_doctor_id
                        .unwrap_or(principal.user_id),
                    attending_doctor_id: attending.id,
                    admission_date: now,
                    admission_diagnosis: request.diagnosis.trim().to_string(),
                    admission_notes: request.notes.clone(),
                    is_active: true,
                    discharge_date: None,
                    discharged_by: None,
                    discharge_diagnosis: None,
                    discharge_instructions: None,
                    updated_at: now,
                };
                bed.occupied_by = Some(stay.id);
                bed.updated_at = now;
                patient.active_stay_id = Some(stay.id);
                patient.updated_at = now;

                let mut changes = ChangeSet::new();
                changes.insert(&stay)?;
                changes.update(&bed)?;
                changes.update(&patient)?;
                db.commit(changes).await?;
                Ok(stay)
            })
            .await?;

        info!(stay_id = %stay.id, bed_id = %stay.bed_id, "Patient admitted");
        Ok(stay)
    }

    /// Close the stay, free the bed and tell billing
    pub async fn discharge(
        &self,
        principal: &Principal,
        stay_id: Uuid,
        request: Discharge,
    ) -> Result<WardStay> {
        let db = &self.db;
        let request = &request;
        let stay = db
            .transact("discharge", move || async move {
                let mut stay = db.require::<WardStay>(stay_id).await?;
                stay.ensure_active()?;
                require_text("Discharge diagnosis", &request.diagnosis)?;
                let mut bed = db.require::<Bed>(stay.bed_id).await?;
                let mut patient = db.require::<Patient>(stay.patient_id).await?;

                let now = Utc::now();
                stay.is_active = false;
                stay.discharge_date = Some(now);
                stay.discharged_by = Some(principal.user_id);
                stay.discharge_diagnosis = Some(request.diagnosis.trim().to_string());
                stay.discharge_instructions = request.instructions.clone();
                stay.updated_at = now;

                let mut changes = ChangeSet::new();
                changes.update(&stay)?;
                if bed.occupied_by == Some(stay.id) {
                    bed.occupied_by = None;
                    bed.updated_at = now;
                    changes.update(&bed)?;
                }
                if patient.active_stay_id == Some(stay.id) {
                    patient.active_stay_id = None;
                    patient.updated_at = now;
                    changes.update(&patient)?;
                }
                db.commit(changes).await?;
                Ok(stay.into_inner())
            })
            .await?;

        info!(stay_id = %stay.id, "Patient discharged");
        self.notifier
            .dispatch(
                Notice::to_department(
                    BILLING_DEPARTMENT,
                    "Patient discharged",
                    format!(
                        "Ward stay closed after {} day(s); prepare the final invoice",
                        stay.length_of_stay_days()
                    ),
                )
                .from_sender(principal.user_id)
                .with_data(json!({
                    "ward_stay_id": stay.id,
                    "patient_id": stay.patient_id,
                })),
            )
            .await;
        Ok(stay)
    }

    pub async fn get_stay(&self, id: Uuid) -> Result<WardStay> {
        Ok(self.db.require::<WardStay>(id).await?.into_inner())
    }

    pub async fn list_stays(&self, filter: &StayFilter) -> Result<Vec<WardStay>> {
        let mut query = serde_json::Map::new();
        if let Some(ward_id) = filter.ward_id {
            query.insert("ward_id".into(), json!(ward_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query.insert("patient_id".into(), json!(patient_id));
        }
        if let Some(active) = filter.is_active {
            query.insert("is_active".into(), json!(active));
        }
        let mut stays = values(self.db.find::<WardStay>(Value::Object(query)).await?);
        stays.sort_by(|a, b| b.admission_date.cmp(&a.admission_date));
        Ok(stays)
    }

    async fn active_stay(&self, stay_id: Uuid) -> Result<Versioned<WardStay>> {
        let stay = self.db.require::<WardStay>(stay_id).await?;
        stay.ensure_active()?;
        Ok(stay)
    }

    pub async fn record_vitals(
        &self,
        principal: &Principal,
        stay_id: Uuid,
        request: NewVitals,
    ) -> Result<VitalSign> {
        request.validate()?;
        let stay = self.active_stay(stay_id).await?;
        let vitals = VitalSign {
            id: Uuid::new_v4(),
            ward_stay_id: stay.id,
            patient_id: stay.patient_id,
            temperature: request.temperature,
            pulse_rate: request.pulse_rate,
            respiratory_rate: request.respiratory_rate,
            blood_pressure_systolic: request.blood_pressure_systolic,
            blood_pressure_diastolic: request.blood_pressure_diastolic,
            oxygen_saturation: request.oxygen_saturation,
            pain_level: request.pain_level,
            notes: request.notes,
            recorded_by: principal.user_id,
            recorded_at: Utc::now(),
        };
        self.db.insert(&vitals).await?;
        Ok(vitals)
    }

    pub async fn vitals_history(&self, stay_id: Uuid) -> Result<Vec<VitalSign>> {
        self.db.require::<WardStay>(stay_id).await?;
        let mut history = values(
            self.db
                .find::<VitalSign>(json!({ "ward_stay_id": stay_id }))
                .await?,
        );
        history.sort_by_key(|v| v.recorded_at);
        Ok(history)
    }

    pub async fn latest_vitals(&self, stay_id: Uuid) -> Result<Option<VitalSign>> {
        Ok(self.vitals_history(stay_id).await?.pop())
    }

    pub async fn create_task(
        &self,
        principal: &Principal,
        stay_id: Uuid,
        request: NewTask,
    ) -> Result<NursingTask> {
        require_text("Task title", &request.title)?;
        let stay = self.active_stay(stay_id).await?;
        if let Some(assignee) = request.assigned_to {
            self.db.require::<StaffMember>(assignee).await?;
        }
        let task = NursingTask {
            id: Uuid::new_v4(),
            ward_stay_id: stay.id,
            patient_id: stay.patient_id,
            title: request.title.trim().to_string(),
            description: request.description,
            scheduled_time: request.scheduled_time,
            assigned_to: request.assigned_to,
            status: TaskStatus::Scheduled,
            created_by: principal.user_id,
            created_at: Utc::now(),
            completed_by: None,
            completed_at: None,
            completion_notes: None,
        };
        self.db.insert(&task).await?;
        Ok(task)
    }

    pub async fn start_task(&self, task_id: Uuid) -> Result<NursingTask> {
        let db = &self.db;
        db.transact("start_task", move || async move {
            let mut task = db.require::<NursingTask>(task_id).await?;
            if task.status != TaskStatus::Scheduled {
                return Err(HimsError::invalid_state("Only scheduled tasks can be started"));
            }
            task.status = TaskStatus::InProgress;
            db.update(&task).await?;
            Ok(task.into_inner())
        })
        .await
    }

    pub async fn complete_task(
        &self,
        principal: &Principal,
        task_id: Uuid,
        notes: Option<String>,
    ) -> Result<NursingTask> {
        let db = &self.db;
        let notes = &notes;
        db.transact("complete_task", move || async move {
            let mut task = db.require::<NursingTask>(task_id).await?;
            if !task.status.is_open() {
                return Err(HimsError::invalid_state("Task is already closed"));
            }
            task.status = TaskStatus::Completed;
            task.completed_by = Some(principal.user_id);
            task.completed_at = Some(Utc::now());
            task.completion_notes = notes.clone();
            db.update(&task).await?;
            Ok(task.into_inner())
        })
        .await
    }

    pub async fn cancel_task(&self, task_id: Uuid) -> Result<NursingTask> {
        let db = &self.db;
        db.transact("cancel_task", move || async move {
            let mut task = db.require::<NursingTask>(task_id).await?;
            if !task.status.is_open() {
                return Err(HimsError::invalid_state("Task is already closed"));
            }
            task.status = TaskStatus::Cancelled;
            db.update(&task).await?;
            Ok(task.into_inner())
        })
        .await
    }

    pub async fn tasks_for_stay(&self, stay_id: Uuid) -> Result<Vec<NursingTask>> {
        let mut tasks = values(
            self.db
                .find::<NursingTask>(json!({ "ward_stay_id": stay_id }))
                .await?,
        );
        tasks.sort_by_key(|task| task.scheduled_time);
        Ok(tasks)
    }

    /// Open tasks assigned to the caller, soonest first
    pub async fn upcoming_tasks(&self, principal: &Principal) -> Result<Vec<NursingTask>> {
        let mut tasks: Vec<NursingTask> = values(
            self.db
                .find::<NursingTask>(json!({ "assigned_to": principal.user_id }))
                .await?,
        )
        .into_iter()
        .filter(|task| task.status.is_open())
        .collect();
        tasks.sort_by_key(|task| task.scheduled_time);
        Ok(tasks)
    }
}
