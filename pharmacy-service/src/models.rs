use chrono::{DateTime, NaiveDate, Utc};
use error_common::{HimsError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    /// Tablet, syrup, injection...
    pub form: String,
    pub strength: String,
    pub unit_price: Decimal,
    pub stock_level: u32,
    pub reorder_level: u32,
    pub expiry_date: Option<NaiveDate>,
    pub is_controlled: bool,
    pub requires_prescription: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Medication, "medication");

impl Medication {
    pub fn needs_reorder(&self) -> bool {
        self.stock_level <= self.reorder_level
    }

    /// Apply a signed stock movement, refusing to go below zero
    pub fn apply_movement(&mut self, delta: i64) -> Result<u32> {
        let next = i64::from(self.stock_level)
            .checked_add(delta)
            .ok_or_else(|| HimsError::validation("Stock movement is out of range"))?;
        if next < 0 {
            return Err(HimsError::invalid_state(format!(
                "Insufficient stock for {}: {} available",
                self.name, self.stock_level
            )));
        }
        self.stock_level = u32::try_from(next)
            .map_err(|_| HimsError::validation("Stock level is out of range"))?;
        self.updated_at = Utc::now();
        Ok(self.stock_level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub form: String,
    pub strength: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub stock_level: u32,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: u32,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_controlled: bool,
    #[serde(default = "default_true")]
    pub requires_prescription: bool,
}

fn default_reorder_level() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedication {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub reorder_level: Option<u32>,
    pub expiry_date: Option<NaiveDate>,
    pub is_controlled: Option<bool>,
    pub requires_prescription: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationFilter {
    pub search: Option<String>,
    pub form: Option<String>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Received,
    Dispensed,
    Returned,
    Expired,
    Adjusted,
}

/// One stock movement; quantity is signed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationTransaction {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub balance_after: u32,
    pub batch_number: Option<String>,
    pub reference: Option<String>,
    pub dispense_id: Option<Uuid>,
    pub performed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(MedicationTransaction, "medication_transaction");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub quantity: u32,
    pub batch_number: Option<String>,
    pub reference: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStock {
    pub transaction_type: TransactionType,
    /// Signed change; returns are positive, expiry and write-offs negative
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispenseStatus {
    Pending,
    Prepared,
    Dispensed,
    Cancelled,
}

impl DispenseStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Prepared)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationDispense {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub patient_id: Uuid,
    pub medication_id: Uuid,
    pub quantity: u32,
    pub instructions: Option<String>,
    pub status: DispenseStatus,
    pub created_by: Uuid,
    pub prepared_by: Option<Uuid>,
    pub prepared_at: Option<DateTime<Utc>>,
    pub dispensed_by: Option<Uuid>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(MedicationDispense, "medication_dispense");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDispense {
    pub prescription_id: Uuid,
    /// Falls back to the catalogue entry on the prescription
    pub medication_id: Option<Uuid>,
    pub quantity: u32,
    pub instructions: Option<String>,
}
