use chrono::{DateTime, Utc};
use error_common::{HimsError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Submitted,
    InReview,
    Approved,
    PartiallyApproved,
    Rejected,
}

impl ClaimStatus {
    pub fn awaiting_decision(self) -> bool {
        matches!(self, Self::Submitted | Self::InReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ClaimStatus,
    pub at: DateTime<Utc>,
    pub by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceClaim {
    pub id: Uuid,
    pub claim_number: String,
    pub invoice_id: Uuid,
    pub patient_id: Uuid,
    pub provider_name: String,
    pub policy_number: String,
    pub member_id: Option<String>,
    pub amount_claimed: Decimal,
    pub amount_approved: Option<Decimal>,
    pub status: ClaimStatus,
    pub rejection_reason: Option<String>,
    /// Insurance payment created on approval, if any
    pub payment_id: Option<Uuid>,
    pub notes: Option<String>,
    pub status_history: Vec<StatusChange>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
database_layer::entity!(InsuranceClaim, "insurance_claim");

impl InsuranceClaim {
    /// Move to `to` if the current status allows it, recording who did it
    pub fn transition(&mut self, to: ClaimStatus, by: Uuid) -> Result<()> {
        use ClaimStatus::*;
        let allowed = match to {
            Submitted => self.status == Pending,
            InReview => self.status == Submitted,
            Approved | PartiallyApproved | Rejected => self.status.awaiting_decision(),
            Pending => false,
        };
        if !allowed {
            return Err(HimsError::invalid_state(format!(
                "Cannot move claim {} from {:?} to {:?}",
                self.claim_number, self.status, to
            )));
        }
        let now = Utc::now();
        self.status = to;
        self.status_history.push(StatusChange { status: to, at: now, by });
        match to {
            Submitted => self.submitted_at = Some(now),
            Approved | PartiallyApproved | Rejected => self.decided_at = Some(now),
            _ => {}
        }
        self.updated_at = now;
        Ok(())
    }

    /// Full approval when the insurer covers at least what was claimed
    pub fn decision_for(&self, approved: Decimal) -> ClaimStatus {
        if approved >= self.amount_claimed {
            ClaimStatus::Approved
        } else {
            ClaimStatus::PartiallyApproved
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub invoice_id: Uuid,
    pub provider_name: String,
    pub policy_number: String,
    pub member_id: Option<String>,
    pub amount_claimed: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveClaim {
    pub amount_approved: Decimal,
    /// Credit the approved amount to the invoice as an insurance payment
    #[serde(default)]
    pub apply_payment: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectClaim {
    pub reason: String,
}
