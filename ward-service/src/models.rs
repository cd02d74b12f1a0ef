use chrono::{DateTime, Utc};
use error_common::reporting::percentage;
use error_common::validation::require_range;
use error_common::{HimsError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ward {
    pub id: Uuid,
    pub name: String,
    pub ward_type: String,
    /// Maximum number of beds
    pub capacity: u32,
    pub head_nurse_id: Option<Uuid>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(Ward, "ward");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWard {
    pub name: String,
    pub ward_type: String,
    pub capacity: u32,
    pub head_nurse_id: Option<Uuid>,
    pub description: Option<String>,
}

/// Stored state of a bed when nobody is in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedCondition {
    Available,
    Maintenance,
    Reserved,
}

/// Reported state of a bed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

impl From<BedCondition> for BedStatus {
    fn from(condition: BedCondition) -> Self {
        match condition {
            BedCondition::Available => Self::Available,
            BedCondition::Maintenance => Self::Maintenance,
            BedCondition::Reserved => Self::Reserved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub ward_id: Uuid,
    pub bed_number: String,
    pub bed_type: String,
    pub condition: BedCondition,
    /// Active ward stay holding the bed
    pub occupied_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Bed, "bed");

impl Bed {
    /// Occupancy is read from the stay link, never stored separately
    pub fn status(&self) -> BedStatus {
        if self.occupied_by.is_some() {
            BedStatus::Occupied
        } else {
            self.condition.into()
        }
    }

    pub fn is_admittable(&self) -> bool {
        self.is_active && self.status() == BedStatus::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBed {
    pub bed_number: String,
    #[serde(default = "default_bed_type")]
    pub bed_type: String,
}

fn default_bed_type() -> String {
    "standard".to_string()
}

/// A bed as the API reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedView {
    #[serde(flatten)]
    pub bed: Bed,
    pub status: BedStatus,
}

impl From<Bed> for BedView {
    fn from(bed: Bed) -> Self {
        let status = bed.status();
        Self { bed, status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardStay {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ward_id: Uuid,
    pub bed_id: Uuid,
    pub admitting_doctor_id: Uuid,
    pub attending_doctor_id: Uuid,
    pub admission_date: DateTime<Utc>,
    pub admission_diagnosis: String,
    pub admission_notes: Option<String>,
    pub is_active: bool,
    pub discharge_date: Option<DateTime<Utc>>,
    pub discharged_by: Option<Uuid>,
    pub discharge_diagnosis: Option<String>,
    pub discharge_instructions: Option<String>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(WardStay, "ward_stay");

impl WardStay {
    pub fn ensure_active(&self) -> Result<()> {
        if !self.is_active {
            return Err(HimsError::invalid_state("Patient is already discharged"));
        }
        Ok(())
    }

    /// Whole days since admission, counting the admission day
    pub fn length_of_stay_days(&self) -> i64 {
        let end = self.discharge_date.unwrap_or_else(Utc::now);
        (end - self.admission_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub patient_id: Uuid,
    pub bed_id: Uuid,
    /// Defaults to the admitting staff member
    pub admitting_doctor_id: Option<Uuid>,
    pub attending_doctor_id: Uuid,
    pub diagnosis: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discharge {
    pub diagnosis: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StayFilter {
    pub ward_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSign {
    pub id: Uuid,
    pub ward_stay_id: Uuid,
    pub patient_id: Uuid,
    /// Degrees Celsius
    pub temperature: Decimal,
    pub pulse_rate: u16,
    pub respiratory_rate: u16,
    pub blood_pressure_systolic: u16,
    pub blood_pressure_diastolic: u16,
    pub oxygen_saturation: u8,
    /// 0 (none) to 10 (worst)
    pub pain_level: u8,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}
database_layer::entity!(VitalSign, "vital_sign");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVitals {
    pub temperature: Decimal,
    pub pulse_rate: u16,
    pub respiratory_rate: u16,
    pub blood_pressure_systolic: u16,
    pub blood_pressure_diastolic: u16,
    pub oxygen_saturation: u8,
    #[serde(default)]
    pub pain_level: u8,
    pub notes: Option<String>,
}

impl NewVitals {
    pub fn validate(&self) -> Result<()> {
        require_range("Temperature", self.temperature, Decimal::from(25), Decimal::from(45))?;
        require_range("Pulse rate", self.pulse_rate, 20, 250)?;
        require_range("Respiratory rate", self.respiratory_rate, 4, 80)?;
        require_range("Systolic pressure", self.blood_pressure_systolic, 50, 260)?;
        require_range("Diastolic pressure", self.blood_pressure_diastolic, 20, 180)?;
        require_range("Oxygen saturation", self.oxygen_saturation, 50, 100)?;
        require_range("Pain level", self.pain_level, 0, 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NursingTask {
    pub id: Uuid,
    pub ward_stay_id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub assigned_to: Option<Uuid>,
    pub status: TaskStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
}
database_layer::entity!(NursingTask, "nursing_task");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardOccupancy {
    pub ward_id: Uuid,
    pub ward_name: String,
    pub capacity: u32,
    pub total_beds: usize,
    pub occupied: usize,
    pub available: usize,
    pub maintenance: usize,
    pub reserved: usize,
    /// Percentage of beds occupied, two decimal places
    pub occupancy_rate: Decimal,
}

impl WardOccupancy {
    pub fn tally(ward: &Ward, beds: &[Bed]) -> Self {
        let count = |status: BedStatus| beds.iter().filter(|bed| bed.status() == status).count();
        let occupied = count(BedStatus::Occupied);
        Self {
            ward_id: ward.id,
            ward_name: ward.name.clone(),
            capacity: ward.capacity,
            total_beds: beds.len(),
            occupied,
            available: count(BedStatus::Available),
            maintenance: count(BedStatus::Maintenance),
            reserved: count(BedStatus::Reserved),
            occupancy_rate: percentage(occupied, beds.len()),
        }
    }
}
