//! Laboratory catalogue, specimen handling and results

use std::collections::BTreeMap;
use std::sync::Arc;

use auth_identity::Principal;
use chrono::{DateTime, Utc};
use database_layer::{ChangeSet, Database, Versioned};
use error_common::reporting::Period;
use error_common::validation::{require_amount, require_positive, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink, NotificationType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::consultation::{LabRequest, LabRequestStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: Uuid,
    pub name: String,
    /// Unique short code, stored upper case
    pub test_code: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sample_type: String,
    pub turnaround_hours: u32,
    pub requirements: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
database_layer::entity!(LabTest, "lab_test");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLabTest {
    pub name: String,
    pub test_code: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sample_type: String,
    pub turnaround_hours: u32,
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Collected,
    Received,
    Processing,
    Analyzed,
    Disposed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: Uuid,
    pub sample_number: String,
    pub lab_request_id: Uuid,
    pub patient_id: Uuid,
    pub sample_type: String,
    pub status: SampleStatus,
    pub collected_by: Uuid,
    pub collected_at: DateTime<Utc>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(Sample, "lab_sample");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectSample {
    pub sample_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabResultStatus {
    Pending,
    Processing,
    Completed,
    Verified,
    Delivered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResult {
    pub id: Uuid,
    pub lab_request_id: Uuid,
    pub patient_id: Uuid,
    pub technician_id: Uuid,
    pub results: Value,
    pub reference_ranges: Value,
    pub interpretation: Option<String>,
    pub notes: Option<String>,
    pub status: LabResultStatus,
    pub recorded_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(LabResult, "lab_result");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    pub results: Value,
    #[serde(default)]
    pub reference_ranges: Value,
    pub interpretation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteResult {
    pub results: Option<Value>,
    pub interpretation: Option<String>,
}

pub struct LaboratoryService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl LaboratoryService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    pub async fn create_lab_test(&self, request: NewLabTest) -> Result<LabTest> {
        require_text("Test name", &request.name)?;
        require_text("Test code", &request.test_code)?;
        require_text("Sample type", &request.sample_type)?;
        require_amount("Price", request.price)?;
        require_positive("Turnaround hours", request.turnaround_hours)?;

        let test_code = request.test_code.trim().to_uppercase();
        if self
            .db
            .find_one::<LabTest>(json!({ "test_code": test_code }))
            .await?
            .is_some()
        {
            return Err(HimsError::conflict(format!("Lab test code {} already exists", test_code)));
        }

        let test = LabTest {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            test_code,
            category: request.category.trim().to_lowercase(),
            description: request.description,
            price: request.price.round_dp(2),
            sample_type: request.sample_type.trim().to_lowercase(),
            turnaround_hours: request.turnaround_hours,
            requirements: request.requirements,
            is_active: true,
            created_at: Utc::now(),
        };
        self.db.insert(&test).await?;
        Ok(test)
    }

    pub async fn get_lab_test(&self, id: Uuid) -> Result<LabTest> {
        Ok(self.db.require::<LabTest>(id).await?.into_inner())
    }

    pub async fn list_lab_tests(&self, active_only: bool) -> Result<Vec<LabTest>> {
        let filter = if active_only { json!({ "is_active": true }) } else { json!({}) };
        let mut tests: Vec<LabTest> = self
            .db
            .find::<LabTest>(filter)
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        tests.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tests)
    }

    pub async fn set_lab_test_active(&self, id: Uuid, active: bool) -> Result<LabTest> {
        let db = &self.db;
        db.transact("set_lab_test_active", move || async move {
            let mut test = db.require::<LabTest>(id).await?;
            test.is_active = active;
            db.update(&test).await?;
            Ok(test.into_inner())
        })
        .await
    }

    /// Take the specimen for a pending request
    pub async fn collect_sample(
        &self,
        principal: &Principal,
        lab_request_id: Uuid,
        request: CollectSample,
    ) -> Result<Sample> {
        let sample_number = self.db.unique_reference::<Sample>("SMP", "sample_number").await?;
        let db = &self.db;
        let request = &request;
        let sample_number = &sample_number;
        let sample = db
            .transact("collect_sample", move || async move {
                let mut lab_request = db.require::<LabRequest>(lab_request_id).await?;
                if lab_request.status != LabRequestStatus::Pending {
                    return Err(HimsError::invalid_state(
                        "Samples can only be collected for pending lab requests",
                    ));
                }
                let sample_type = match (&request.sample_type, lab_request.lab_test_id) {
                    (Some(sample_type), _) if !sample_type.trim().is_empty() => {
                        sample_type.trim().to_lowercase()
                    }
                    (_, Some(test_id)) => db.require::<LabTest>(test_id).await?.sample_type.clone(),
                    _ => return Err(HimsError::validation("Sample type is required")),
                };

                let now = Utc::now();
                let sample = Sample {
                    id: Uuid::new_v4(),
                    sample_number: sample_number.clone(),
                    lab_request_id,
                    patient_id: lab_request.patient_id,
                    sample_type,
                    status: SampleStatus::Collected,
                    collected_by: principal.user_id,
                    collected_at: now,
                    received_by: None,
                    received_at: None,
                    notes: request.notes.clone(),
                    updated_at: now,
                };
                lab_request.transition(LabRequestStatus::SampleCollected)?;

                let mut changes = ChangeSet::new();
                changes.insert(&sample)?;
                changes.update(&lab_request)?;
                db.commit(changes).await?;
                Ok(sample)
            })
            .await?;
        info!(sample_number = %sample.sample_number, "Sample collected");
        Ok(sample)
    }

    pub async fn receive_sample(&self, principal: &Principal, sample_id: Uuid) -> Result<Sample> {
        let db = &self.db;
        db.transact("receive_sample", move || async move {
            let mut sample = db.require::<Sample>(sample_id).await?;
            if sample.status != SampleStatus::Collected {
                return Err(HimsError::invalid_state("Sample has already been received"));
            }
            let now = Utc::now();
            sample.status = SampleStatus::Received;
            sample.received_by = Some(principal.user_id);
            sample.received_at = Some(now);
            sample.updated_at = now;
            db.update(&sample).await?;
            Ok(sample.into_inner())
        })
        .await
    }

    /// Move a received sample forward through processing, analysis and disposal
    pub async fn update_sample_status(
        &self,
        sample_id: Uuid,
        status: SampleStatus,
    ) -> Result<Sample> {
        let db = &self.db;
        db.transact("update_sample_status", move || async move {
            let mut sample = db.require::<Sample>(sample_id).await?;
            if sample.status < SampleStatus::Received || status <= sample.status {
                return Err(HimsError::invalid_state(format!(
                    "Cannot move sample from {:?} to {:?}",
                    sample.status, status
                )));
            }
            sample.status = status;
            sample.updated_at = Utc::now();
            db.update(&sample).await?;
            Ok(sample.into_inner())
        })
        .await
    }

    pub async fn get_sample(&self, id: Uuid) -> Result<Sample> {
        Ok(self.db.require::<Sample>(id).await?.into_inner())
    }

    pub async fn samples_for_request(&self, lab_request_id: Uuid) -> Result<Vec<Sample>> {
        Ok(self
            .db
            .find::<Sample>(json!({ "lab_request_id": lab_request_id }))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect())
    }

    pub async fn record_result(
        &self,
        principal: &Principal,
        lab_request_id: Uuid,
        request: RecordResult,
    ) -> Result<LabResult> {
        if !request.results.is_object() {
            return Err(HimsError::validation("Results must be a JSON object"));
        }
        let db = &self.db;
        let request = &request;
        db.transact("record_result", move || async move {
            let mut lab_request = db.require::<LabRequest>(lab_request_id).await?;
            if lab_request.status != LabRequestStatus::SampleCollected {
                return Err(HimsError::invalid_state(
                    "A sample must be collected before results are recorded",
                ));
            }
            if db
                .find_one::<LabResult>(json!({ "lab_request_id": lab_request_id }))
                .await?
                .is_some()
            {
                return Err(HimsError::conflict(
                    "A result has already been recorded for this lab request",
                ));
            }

            let now = Utc::now();
            let result = LabResult {
                id: Uuid::new_v4(),
                lab_request_id,
                patient_id: lab_request.patient_id,
                technician_id: principal.user_id,
                results: request.results.clone(),
                reference_ranges: request.reference_ranges.clone(),
                interpretation: request.interpretation.clone(),
                notes: request.notes.clone(),
                status: LabResultStatus::Pending,
                recorded_at: now,
                completed_at: None,
                verified_by: None,
                verified_at: None,
                delivered_at: None,
                updated_at: now,
            };
            // Writing the request makes a concurrent second result conflict
            lab_request.updated_at = now;
            let mut changes = ChangeSet::new();
            changes.insert(&result)?;
            changes.update(&lab_request)?;
            db.commit(changes).await?;
            Ok(result)
        })
        .await
    }

    pub async fn start_processing(&self, result_id: Uuid) -> Result<LabResult> {
        let db = &self.db;
        db.transact("start_processing", move || async move {
            let mut result = db.require::<LabResult>(result_id).await?;
            if result.status != LabResultStatus::Pending {
                return Err(HimsError::invalid_state("Result is not pending"));
            }
            result.status = LabResultStatus::Processing;
            result.updated_at = Utc::now();
            db.update(&result).await?;
            Ok(result.into_inner())
        })
        .await
    }

    /// Finalize the findings and close the lab request
    pub async fn complete_result(
        &self,
        result_id: Uuid,
        request: CompleteResult,
    ) -> Result<LabResult> {
        let db = &self.db;
        let request = &request;
        db.transact("complete_result", move || async move {
            let mut result = db.require::<LabResult>(result_id).await?;
            if !matches!(result.status, LabResultStatus::Pending | LabResultStatus::Processing) {
                return Err(HimsError::invalid_state("Result has already been completed"));
            }
            let mut lab_request = db.require::<LabRequest>(result.lab_request_id).await?;
            lab_request.transition(LabRequestStatus::Completed)?;

            if let Some(results) = &request.results {
                if !results.is_object() {
                    return Err(HimsError::validation("Results must be a JSON object"));
                }
                result.results = results.clone();
            }
            if let Some(interpretation) = &request.interpretation {
                result.interpretation = Some(interpretation.clone());
            }
            let now = Utc::now();
            result.status = LabResultStatus::Completed;
            result.completed_at = Some(now);
            result.updated_at = now;

            let mut changes = ChangeSet::new();
            changes.update(&result)?;
            changes.update(&lab_request)?;
            db.commit(changes).await?;
            Ok(result.into_inner())
        })
        .await
    }

    /// Sign off a completed result and tell the requesting doctor
    pub async fn verify_result(&self, principal: &Principal, result_id: Uuid) -> Result<LabResult> {
        let db = &self.db;
        let result = db
            .transact("verify_result", move || async move {
                let mut result = db.require::<LabResult>(result_id).await?;
                if result.status != LabResultStatus::Completed {
                    return Err(HimsError::invalid_state("Only completed results can be verified"));
                }
                let now = Utc::now();
                result.status = LabResultStatus::Verified;
                result.verified_by = Some(principal.user_id);
                result.verified_at = Some(now);
                result.updated_at = now;
                db.update(&result).await?;
                Ok(result.into_inner())
            })
            .await?;

        let lab_request = self.db.require::<LabRequest>(result.lab_request_id).await?;
        self.notifier
            .dispatch(
                Notice::to_user(
                    lab_request.requested_by,
                    "Lab results ready",
                    format!("{} results have been verified", lab_request.test_name),
                )
                .from_sender(principal.user_id)
                .kind(NotificationType::Success)
                .with_data(json!({
                    "lab_result_id": result.id,
                    "lab_request_id": lab_request.id,
                    "patient_id": result.patient_id,
                })),
            )
            .await;
        Ok(result)
    }

    pub async fn deliver_result(&self, result_id: Uuid) -> Result<LabResult> {
        let db = &self.db;
        db.transact("deliver_result", move || async move {
            let mut result = db.require::<LabResult>(result_id).await?;
            if result.status != LabResultStatus::Verified {
                return Err(HimsError::invalid_state("Only verified results can be delivered"));
            }
            let now = Utc::now();
            result.status = LabResultStatus::Delivered;
            result.delivered_at = Some(now);
            result.updated_at = now;
            db.update(&result).await?;
            Ok(result.into_inner())
        })
        .await
    }

    pub async fn get_result(&self, id: Uuid) -> Result<LabResult> {
        Ok(self.db.require::<LabResult>(id).await?.into_inner())
    }

    pub async fn list_results(
        &self,
        patient_id: Option<Uuid>,
        status: Option<LabResultStatus>,
    ) -> Result<Vec<LabResult>> {
        let mut filter = serde_json::Map::new();
        if let Some(patient_id) = patient_id {
            filter.insert("patient_id".into(), json!(patient_id));
        }
        if let Some(status) = status {
            filter.insert("status".into(), json!(status));
        }
        let mut results: Vec<LabResult> = self
            .db
            .find::<LabResult>(Value::Object(filter))
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        results.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(results)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabStatusCount {
    pub status: LabResultStatus,
    pub count: usize,
}

/// Results recorded in the period, counted by their current status
pub async fn lab_results_by_status(db: &Database, period: Period) -> Result<Vec<LabStatusCount>> {
    let mut counts: BTreeMap<LabResultStatus, usize> = BTreeMap::new();
    for result in db.all::<LabResult>().await? {
        if period.contains(result.recorded_at.date_naive()) {
            *counts.entry(result.status).or_default() += 1;
        }
    }
    Ok(counts
        .into_iter()
        .map(|(status, count)| LabStatusCount { status, count })
        .collect())
}
