use std::sync::Arc;

use auth_identity::Principal;
use chrono::{Duration, NaiveDate, Utc};
use clinical_service::{Prescription, PrescriptionStatus};
use database_layer::{ChangeSet, Database, Versioned};
use error_common::reporting::Period;
use error_common::validation::{require_amount, require_positive, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink, NotificationType};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::*;

/// Widest window accepted by [`PharmacyService::expiring_soon`]
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

fn values<T>(records: Vec<Versioned<T>>) -> Vec<T> {
    records.into_iter().map(Versioned::into_inner).collect()
}

fn transaction(
    medication: &Medication,
    transaction_type: TransactionType,
    quantity: i64,
    performed_by: Uuid,
) -> MedicationTransaction {
    MedicationTransaction {
        id: Uuid::new_v4(),
        medication_id: medication.id,
        transaction_type,
        quantity,
        balance_after: medication.stock_level,
        batch_number: None,
        reference: None,
        dispense_id: None,
        performed_by,
        notes: None,
        created_at: Utc::now(),
    }
}

pub struct PharmacyService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl PharmacyService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn create_medication(
        &self,
        principal: &Principal,
        request: NewMedication,
    ) -> Result<Medication> {
        require_text("Medication name", &request.name)?;
        require_text("Form", &request.form)?;
        require_text("Strength", &request.strength)?;
        require_amount("Unit price", request.unit_price)?;

        let now = Utc::now();
        let medication = Medication {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            generic_name: request.generic_name,
            brand_name: request.brand_name,
            form: request.form.trim().to_lowercase(),
            strength: request.strength.trim().to_string(),
            unit_price: request.unit_price.round_dp(2),
            stock_level: request.stock_level,
            reorder_level: request.reorder_level,
            expiry_date: request.expiry_date,
            is_controlled: request.is_controlled,
            requires_prescription: request.requires_prescription,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut changes = ChangeSet::new();
        changes.insert(&medication)?;
        if medication.stock_level > 0 {
            let mut opening = transaction(
                &medication,
                TransactionType::Received,
                i64::from(medication.stock_level),
                principal.user_id,
            );
            opening.notes = Some("Opening stock".into());
            changes.insert(&opening)?;
        }
        self.db.commit(changes).await?;
        info!(medication_id = %medication.id, name = %medication.name, "Medication added");
        Ok(medication)
    }

    pub async fn get_medication(&self, id: Uuid) -> Result<Medication> {
        Ok(self.db.require::<Medication>(id).await?.into_inner())
    }

    pub async fn update_medication(
        &self,
        id: Uuid,
        changes: UpdateMedication,
    ) -> Result<Medication> {
        if let Some(price) = changes.unit_price {
            require_amount("Unit price", price)?;
        }
        let db = &self.db;
        let changes = &changes;
        db.transact("update_medication", move || async move {
            let mut medication = db.require::<Medication>(id).await?;
            let changes = changes.clone();
            if let Some(name) = changes.name {
                require_text("Medication name", &name)?;
                medication.name = name.trim().to_string();
            }
            if changes.generic_name.is_some() {
                medication.generic_name = changes.generic_name;
            }
            if changes.brand_name.is_some() {
                medication.brand_name = changes.brand_name;
            }
            if let Some(price) = changes.unit_price {
                medication.unit_price = price.round_dp(2);
            }
            if let Some(level) = changes.reorder_level {
                medication.reorder_level = level;
            }
            if changes.expiry_date.is_some() {
                medication.expiry_date = changes.expiry_date;
            }
            if let Some(flag) = changes.is_controlled {
                medication.is_controlled = flag;
            }
            if let Some(flag) = changes.requires_prescription {
                medication.requires_prescription = flag;
            }
            if let Some(flag) = changes.is_active {
                medication.is_active = flag;
            }
            medication.updated_at = Utc::now();
            db.update(&medication).await?;
            Ok(medication.into_inner())
        })
        .await
    }

    pub async fn list_medications(&self, filter: &MedicationFilter) -> Result<Vec<Medication>> {
        let mut query = serde_json::Map::new();
        if filter.active_only.unwrap_or(true) {
            query.insert("is_active".into(), json!(true));
        }
        if let Some(form) = &filter.form {
            query.insert("form".into(), json!(form.trim().to_lowercase()));
        }
        let needle = filter.search.as_deref().map(|s| s.trim().to_lowercase());
        let mut medications: Vec<Medication> =
            values(self.db.find::<Medication>(query.into()).await?)
                .into_iter()
                .filter(|med| match &needle {
                    Some(needle) if !needle.is_empty() => [
                        Some(&med.name),
                        med.generic_name.as_ref(),
                        med.brand_name.as_ref(),
                    ]
                    .into_iter()
                    .flatten()
                    .any(|name| name.to_lowercase().contains(needle.as_str())),
                    _ => true,
                })
                .collect();
        medications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(medications)
    }

    /// Active medications at or below their reorder level, emptiest first
    pub async fn low_stock(&self) -> Result<Vec<Medication>> {
        let active = self
            .db
            .find::<Medication>(json!({ "is_active": true }))
            .await?;
        let mut medications: Vec<Medication> = values(active)
            .into_iter()
            .filter(Medication::needs_reorder)
            .collect();
        medications.sort_by_key(|med| med.stock_level);
        Ok(medications)
    }

    /// Active medications whose expiry date falls within `days` of today,
    /// already expired stock included, soonest first
    pub async fn expiring_soon(&self, days: i64) -> Result<Vec<Medication>> {
        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
            return Err(HimsError::validation(format!(
                "Days must be between 0 and {}",
                MAX_EXPIRY_WINDOW_DAYS
            )));
        }
        let threshold = Utc::now().date_naive() + Duration::days(days);
        let mut medications: Vec<(NaiveDate, Medication)> =
            values(self.db.find::<Medication>(json!({ "is_active": true })).await?)
                .into_iter()
                .filter_map(|med| med.expiry_date.map(|expiry| (expiry, med)))
                .filter(|(expiry, _)| *expiry <= threshold)
                .collect();
        medications.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
        Ok(medications.into_iter().map(|(_, med)| med).collect())
    }

    pub async fn receive_stock(
        &self,
        principal: &Principal,
        medication_id: Uuid,
        request: ReceiveStock,
    ) -> Result<MedicationTransaction> {
        require_positive("Quantity", request.quantity)?;
        let db = &self.db;
        let request = &request;
        let entry = db
            .transact("receive_stock", move || async move {
                let mut medication = db.require::<Medication>(medication_id).await?;
                let quantity = i64::from(request.quantity);
                medication.apply_movement(quantity)?;
                if request.expiry_date.is_some() {
                    medication.expiry_date = request.expiry_date;
                }
                let mut entry = transaction(
                    &medication,
                    TransactionType::Received,
                    quantity,
                    principal.user_id,
                );
                entry.batch_number = request.batch_number.clone();
                entry.reference = request.reference.clone();
                entry.notes = request.notes.clone();

                let mut changes = ChangeSet::new();
                changes.update(&medication)?;
                changes.insert(&entry)?;
                db.commit(changes).await?;
                Ok(entry)
            })
            .await?;
        info!(medication_id = %medication_id, quantity = request.quantity, "Stock received");
        Ok(entry)
    }

    /// Returns, expiries and manual corrections
    pub async fn adjust_stock(
        &self,
        principal: &Principal,
        medication_id: Uuid,
        request: AdjustStock,
    ) -> Result<MedicationTransaction> {
        if request.quantity == 0 {
            return Err(HimsError::validation("Quantity cannot be zero"));
        }
        let magnitude = request
            .quantity
            .checked_abs()
            .ok_or_else(|| HimsError::validation("Quantity is out of range"))?;
        let quantity = match request.transaction_type {
            TransactionType::Returned => magnitude,
            TransactionType::Expired => -magnitude,
            TransactionType::Adjusted => request.quantity,
            TransactionType::Received | TransactionType::Dispensed => {
                return Err(HimsError::validation(
                    "Use stock receipt or dispensing for this movement",
                ))
            }
        };
        let db = &self.db;
        let request = &request;
        db.transact("adjust_stock", move || async move {
            let mut medication = db.require::<Medication>(medication_id).await?;
            medication.apply_movement(quantity)?;
            let mut entry = transaction(
                &medication,
                request.transaction_type,
                quantity,
                principal.user_id,
            );
            entry.notes = request.notes.clone();

            let mut changes = ChangeSet::new();
            changes.update(&medication)?;
            changes.insert(&entry)?;
            db.commit(changes).await?;
            Ok(entry)
        })
        .await
    }

    pub async fn stock_history(&self, medication_id: Uuid) -> Result<Vec<MedicationTransaction>> {
        self.db.require::<Medication>(medication_id).await?;
        let mut history = values(
            self.db
                .find::<MedicationTransaction>(json!({ "medication_id": medication_id }))
                .await?,
        );
        history.sort_by_key(|entry| entry.created_at);
        Ok(history)
    }

    /// Prescriptions still waiting for the pharmacy
    pub async fn pending_prescriptions(&self) -> Result<Vec<Prescription>> {
        let mut prescriptions = values(
            self.db
                .find::<Prescription>(json!({ "status": PrescriptionStatus::Pending }))
                .await?,
        );
        prescriptions.sort_by_key(|p| p.prescribed_at);
        Ok(prescriptions)
    }

    pub async fn create_dispense(
        &self,
        principal: &Principal,
        request: CreateDispense,
    ) -> Result<MedicationDispense> {
        require_positive("Quantity", request.quantity)?;
        let db = &self.db;
        let request = &request;
        let dispense = db
            .transact("create_dispense", move || async move {
                let prescription = db.require::<Prescription>(request.prescription_id).await?;
                if prescription.status != PrescriptionStatus::Pending {
                    return Err(HimsError::invalid_state("Prescription is not pending"));
                }
                let open = db
                    .find::<MedicationDispense>(json!({ "prescription_id": prescription.id }))
                    .await?
                    .into_iter()
                    .any(|d| d.status.is_open());
                if open {
                    return Err(HimsError::conflict("Prescription already has an open dispense"));
                }
                let medication_id = request
                    .medication_id
                    .or(prescription.medication_id)
                    .ok_or_else(|| HimsError::validation("Medication is required"))?;
                let medication = db.require::<Medication>(medication_id).await?;
                if !medication.is_active {
                    return Err(HimsError::invalid_state("Medication is no longer stocked"));
                }

                let now = Utc::now();
                let dispense = MedicationDispense {
                    id: Uuid::new_v4(),
                    prescription_id: prescription.id,
                    patient_id: prescription.patient_id,
                    medication_id,
                    quantity: request.quantity,
                    instructions: request
                        .instructions
                        .clone()
                        .or_else(|| prescription.instructions.clone()),
                    status: DispenseStatus::Pending,
                    created_by: principal.user_id,
                    prepared_by: None,
                    prepared_at: None,
                    dispensed_by: None,
                    dispensed_at: None,
                    created_at: now,
                    updated_at: now,
                };
                // Bumps the prescription version so a concurrent create loses
                let mut changes = ChangeSet::new();
                changes.insert(&dispense)?;
                changes.update(&prescription)?;
                db.commit(changes).await?;
                Ok(dispense)
            })
            .await?;
        info!(dispense_id = %dispense.id, "Dispense created");
        Ok(dispense)
    }

    pub async fn get_dispense(&self, id: Uuid) -> Result<MedicationDispense> {
        Ok(self.db.require::<MedicationDispense>(id).await?.into_inner())
    }

    pub async fn list_dispenses(
        &self,
        status: Option<DispenseStatus>,
    ) -> Result<Vec<MedicationDispense>> {
        let filter = match status {
            Some(status) => json!({ "status": status }),
            None => json!({}),
        };
        let mut dispenses = values(self.db.find::<MedicationDispense>(filter).await?);
        dispenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(dispenses)
    }

    pub async fn prepare_dispense(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<MedicationDispense> {
        let db = &self.db;
        db.transact("prepare_dispense", move || async move {
            let mut dispense = db.require::<MedicationDispense>(id).await?;
            if dispense.status != DispenseStatus::Pending {
                return Err(HimsError::invalid_state("Only pending dispenses can be prepared"));
            }
            let medication = db.require::<Medication>(dispense.medication_id).await?;
            if medication.stock_level < dispense.quantity {
                return Err(HimsError::invalid_state("Insufficient stock"));
            }
            let now = Utc::now();
            dispense.status = DispenseStatus::Prepared;
            dispense.prepared_by = Some(principal.user_id);
            dispense.prepared_at = Some(now);
            dispense.updated_at = now;
            db.update(&dispense).await?;
            Ok(dispense.into_inner())
        })
        .await
    }

    /// Hand the medication over: stock, ledger, prescription and dispense
    /// move together
    pub async fn complete_dispense(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<MedicationDispense> {
        let db = &self.db;
        let (dispense, prescription, medication) = db
            .transact("complete_dispense", move || async move {
                let mut dispense = db.require::<MedicationDispense>(id).await?;
                if dispense.status != DispenseStatus::Prepared {
                    return Err(HimsError::invalid_state(
                        "Only prepared dispenses can be completed",
                    ));
                }
                let mut medication = db.require::<Medication>(dispense.medication_id).await?;
                if medication.stock_level < dispense.quantity {
                    return Err(HimsError::invalid_state("Insufficient stock"));
                }
                let mut prescription = db.require::<Prescription>(dispense.prescription_id).await?;
                prescription.mark_dispensed()?;

                let quantity = -i64::from(dispense.quantity);
                medication.apply_movement(quantity)?;
                let mut entry = transaction(
                    &medication,
                    TransactionType::Dispensed,
                    quantity,
                    principal.user_id,
                );
                entry.dispense_id = Some(dispense.id);
                entry.reference = Some(prescription.id.to_string());

                let now = Utc::now();
                dispense.status = DispenseStatus::Dispensed;
                dispense.dispensed_by = Some(principal.user_id);
                dispense.dispensed_at = Some(now);
                dispense.updated_at = now;

                let mut changes = ChangeSet::new();
                changes.update(&dispense)?;
                changes.update(&medication)?;
                changes.update(&prescription)?;
                changes.insert(&entry)?;
                db.commit(changes).await?;
                Ok((dispense.into_inner(), prescription.into_inner(), medication.into_inner()))
            })
            .await?;

        info!(
            dispense_id = %dispense.id,
            stock_level = medication.stock_level,
            "Medication dispensed"
        );
        if medication.needs_reorder() {
            warn!(
                medication_id = %medication.id,
                stock_level = medication.stock_level,
                "Medication at reorder level"
            );
        }
        self.notifier
            .dispatch(
                Notice::to_user(
                    prescription.prescribed_by,
                    "Prescription dispensed",
                    format!(
                        "{} {} has been dispensed",
                        prescription.medication_name, prescription.dosage
                    ),
                )
                .from_sender(principal.user_id)
                .kind(NotificationType::Success)
                .with_data(json!({
                    "prescription_id": prescription.id,
                    "dispense_id": dispense.id,
                    "patient_id": dispense.patient_id,
                })),
            )
            .await;
        Ok(dispense)
    }

    pub async fn cancel_dispense(&self, id: Uuid) -> Result<MedicationDispense> {
        let db = &self.db;
        db.transact("cancel_dispense", move || async move {
            let mut dispense = db.require::<MedicationDispense>(id).await?;
            if !dispense.status.is_open() {
                return Err(HimsError::invalid_state("Dispense is already closed"));
            }
            dispense.status = DispenseStatus::Cancelled;
            dispense.updated_at = Utc::now();
            db.update(&dispense).await?;
            Ok(dispense.into_inner())
        })
        .await
    }
}

/// Dispenses completed within the period
pub async fn dispensed_count(db: &Database, period: Period) -> Result<usize> {
    let dispenses = db
        .find::<MedicationDispense>(json!({ "status": DispenseStatus::Dispensed }))
        .await?;
    Ok(dispenses
        .iter()
        .filter(|dispense| {
            dispense
                .dispensed_at
                .is_some_and(|at| period.contains(at.date_naive()))
        })
        .count())
}
