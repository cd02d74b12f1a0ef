use std::sync::Arc;

use auth_identity::Principal;
use billing_service::{
    payment_notice, stage_payment, Invoice, InvoiceStatus, Payment, PaymentMethod, RecordPayment,
};
use chrono::Utc;
use database_layer::{ChangeSet, Database, Versioned};
use error_common::validation::{require_positive, require_text};
use error_common::{HimsError, Result};
use events_bus::{Notice, NotificationSink, NotificationType};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::*;

pub struct InsuranceService {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
}

impl InsuranceService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    /// Open the claim for an invoice; an invoice carries at most one claim
    pub async fn create_claim(
        &self,
        principal: &Principal,
        request: NewClaim,
    ) -> Result<InsuranceClaim> {
        require_text("Insurance provider", &request.provider_name)?;
        require_text("Policy number", &request.policy_number)?;
        require_positive("Amount claimed", request.amount_claimed)?;

        let claim_number = self
            .db
            .unique_reference::<InsuranceClaim>("CLM", "claim_number")
            .await?;
        let db = &self.db;
        let request = &request;
        let claim_number = &claim_number;
        let claim = db
            .transact("create_claim", move || async move {
                let invoice = db.require::<Invoice>(request.invoice_id).await?;
                if matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled) {
                    return Err(HimsError::invalid_state(
                        "Claims can only be raised on finalized invoices",
                    ));
                }
                if request.amount_claimed > invoice.total_amount {
                    return Err(HimsError::validation("Amount claimed exceeds the invoice total"));
                }
                if db
                    .find_one::<InsuranceClaim>(json!({ "invoice_id": invoice.id }))
                    .await?
                    .is_some()
                {
                    return Err(HimsError::conflict(format!(
                        "Invoice {} already has an insurance claim",
                        invoice.invoice_number
                    )));
                }

                let now = Utc::now();
                let claim = InsuranceClaim {
                    id: Uuid::new_v4(),
                    claim_number: claim_number.clone(),
                    invoice_id: invoice.id,
                    patient_id: invoice.patient_id,
                    provider_name: request.provider_name.trim().to_string(),
                    policy_number: request.policy_number.trim().to_string(),
                    member_id: request.member_id.clone(),
                    amount_claimed: request.amount_claimed.round_dp(2),
                    amount_approved: None,
                    status: ClaimStatus::Pending,
                    rejection_reason: None,
                    payment_id: None,
                    notes: request.notes.clone(),
                    status_history: vec![StatusChange {
                        status: ClaimStatus::Pending,
                        at: now,
                        by: principal.user_id,
                    }],
                    created_by: principal.user_id,
                    created_at: now,
                    submitted_at: None,
                    decided_at: None,
                    updated_at: now,
                };
                // Writing the invoice back serializes racing claims on it
                let mut changes = ChangeSet::new();
                changes.insert(&claim)?;
                changes.update(&invoice)?;
                db.commit(changes).await?;
                Ok(claim)
            })
            .await?;
        info!(claim_number = %claim.claim_number, "Insurance claim created");
        Ok(claim)
    }

    pub async fn get_claim(&self, id: Uuid) -> Result<InsuranceClaim> {
        Ok(self.db.require::<InsuranceClaim>(id).await?.into_inner())
    }

    pub async fn claim_for_invoice(&self, invoice_id: Uuid) -> Result<Option<InsuranceClaim>> {
        Ok(self
            .db
            .find_one::<InsuranceClaim>(json!({ "invoice_id": invoice_id }))
            .await?
            .map(Versioned::into_inner))
    }

    pub async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<InsuranceClaim>> {
        let filter = match status {
            Some(status) => json!({ "status": status }),
            None => json!({}),
        };
        let mut claims: Vec<InsuranceClaim> = self
            .db
            .find::<InsuranceClaim>(filter)
            .await?
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(claims)
    }

    pub async fn submit_claim(&self, principal: &Principal, id: Uuid) -> Result<InsuranceClaim> {
        self.move_claim("submit_claim", principal, id, ClaimStatus::Submitted).await
    }

    pub async fn begin_review(&self, principal: &Principal, id: Uuid) -> Result<InsuranceClaim> {
        self.move_claim("begin_review", principal, id, ClaimStatus::InReview).await
    }

    async fn move_claim(
        &self,
        operation: &'static str,
        principal: &Principal,
        id: Uuid,
        to: ClaimStatus,
    ) -> Result<InsuranceClaim> {
        let db = &self.db;
        db.transact(operation, move || async move {
            let mut claim = db.require::<InsuranceClaim>(id).await?;
            claim.transition(to, principal.user_id)?;
            db.update(&claim).await?;
            Ok(claim.into_inner())
        })
        .await
    }

    /// Record the insurer's decision. With `apply_payment` the approved
    /// amount is credited to the invoice in the same commit.
    pub async fn process_approval(
        &self,
        principal: &Principal,
        id: Uuid,
        request: ApproveClaim,
    ) -> Result<(InsuranceClaim, Option<Payment>)> {
        require_positive("Approved amount", request.amount_approved)?;
        let db = &self.db;
        let request = &request;
        let (claim, credited) = db
            .transact("process_approval", move || async move {
                let mut claim = db.require::<InsuranceClaim>(id).await?;
                let approved = request.amount_approved.round_dp(2);
                if approved > claim.amount_claimed {
                    return Err(HimsError::validation("Approved amount exceeds the amount claimed"));
                }
                let decision = claim.decision_for(approved);
                claim.transition(decision, principal.user_id)?;
                claim.amount_approved = Some(approved);
                if request.notes.is_some() {
                    claim.notes = request.notes.clone();
                }

                let mut changes = ChangeSet::new();
                let mut credited = None;
                if request.apply_payment {
                    let mut invoice = db.require::<Invoice>(claim.invoice_id).await?;
                    let payment = stage_payment(
                        &mut invoice,
                        &RecordPayment {
                            amount: approved,
                            payment_method: PaymentMethod::Insurance,
                            reference: Some(claim.claim_number.clone()),
                            notes: Some(format!("{} claim approval", claim.provider_name)),
                        },
                        principal.user_id,
                        &mut changes,
                    )?;
                    claim.payment_id = Some(payment.id);
                    credited = Some((invoice.into_inner(), payment));
                }
                changes.update(&claim)?;
                db.commit(changes).await?;
                Ok((claim.into_inner(), credited))
            })
            .await?;

        info!(claim_number = %claim.claim_number, status = ?claim.status, "Claim decided");
        self.notify_decision(principal, &claim).await;
        let payment = match credited {
            Some((invoice, payment)) => {
                self.notifier
                    .dispatch(payment_notice(&invoice, &payment, principal.user_id))
                    .await;
                Some(payment)
            }
            None => None,
        };
        Ok((claim, payment))
    }

    pub async fn reject_claim(
        &self,
        principal: &Principal,
        id: Uuid,
        request: RejectClaim,
    ) -> Result<InsuranceClaim> {
        require_text("Rejection reason", &request.reason)?;
        let db = &self.db;
        let request = &request;
        let claim = db
            .transact("reject_claim", move || async move {
                let mut claim = db.require::<InsuranceClaim>(id).await?;
                claim.transition(ClaimStatus::Rejected, principal.user_id)?;
                claim.rejection_reason = Some(request.reason.trim().to_string());
                db.update(&claim).await?;
                Ok(claim.into_inner())
            })
            .await?;
        self.notify_decision(principal, &claim).await;
        Ok(claim)
    }

    async fn notify_decision(&self, principal: &Principal, claim: &InsuranceClaim) {
        let (kind, message) = match claim.status {
            ClaimStatus::Rejected => (
                NotificationType::Alert,
                format!(
                    "{} rejected: {}",
                    claim.claim_number,
                    claim.rejection_reason.as_deref().unwrap_or("no reason given")
                ),
            ),
            _ => (
                NotificationType::Success,
                format!(
                    "{} {:?} for {}",
                    claim.claim_number,
                    claim.status,
                    claim.amount_approved.unwrap_or_default()
                ),
            ),
        };
        self.notifier
            .dispatch(
                Notice::to_user(claim.created_by, "Insurance claim decided", message)
                    .from_sender(principal.user_id)
                    .kind(kind)
                    .with_data(json!({ "claim_id": claim.id, "status": claim.status })),
            )
            .await;
    }
}
