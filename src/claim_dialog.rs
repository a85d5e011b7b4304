//! Claim dialog state machine
//!
//! EDITING → VERIFYING → REVIEWING → SUBMITTED, with REVIEWING → EDITING on back.
//! Verification failures still land in REVIEWING, with a zero-score view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::models::{FoundItem, ItemStatus, Notification};
use crate::workflow::{ClaimVerification, ClaimVerificationRequest, WorkflowOrchestrator};
use crate::Result;

pub const MIN_PROOF_LEN: usize = 10;
pub const FAILED_VERIFICATION_REASON: &str = "An error occurred during verification.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClaimForm {
    pub lost_item_id: String,
    pub proof: String,
    /// Kept on the form only; not part of the verification request
    pub proof_photo: Option<String>,
}

impl ClaimForm {
    pub fn validate(&self) -> Result<()> {
        if self.lost_item_id.trim().is_empty() {
            return Err(OrchestrationError::ValidationError(
                "Please select your lost item.".to_string(),
            ));
        }
        if self.proof.trim().chars().count() < MIN_PROOF_LEN {
            return Err(OrchestrationError::ValidationError(format!(
                "Please provide more details (at least {} characters).",
                MIN_PROOF_LEN
            )));
        }
        Ok(())
    }
}

/// What the user sees after verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewView {
    pub match_score: f64,
    pub percentage: u8,
    pub is_good_match: bool,
    pub reason: String,
    pub audit_id: Option<Uuid>,
    /// Error kind when verification failed and this is the placeholder view
    pub failure: Option<String>,
}

impl ReviewView {
    fn from_verification(verification: &ClaimVerification) -> Self {
        Self {
            match_score: verification.result.match_score,
            percentage: verification.percentage,
            is_good_match: verification.is_good_match,
            reason: verification.result.reason.clone(),
            audit_id: Some(verification.audit_id),
            failure: None,
        }
    }

    fn placeholder(error: &OrchestrationError) -> Self {
        Self {
            match_score: 0.0,
            percentage: 0,
            is_good_match: false,
            reason: FAILED_VERIFICATION_REASON.to_string(),
            audit_id: None,
            failure: Some(error.kind().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimReceipt {
    pub receipt_id: Uuid,
    pub found_item_id: String,
    pub lost_item_id: String,
    pub title: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    Editing,
    Verifying,
    Reviewing(ReviewView),
    Submitted(ClaimReceipt),
}

impl DialogState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogState::Editing => "editing",
            DialogState::Verifying => "verifying",
            DialogState::Reviewing(_) => "reviewing",
            DialogState::Submitted(_) => "submitted",
        }
    }
}

pub struct ClaimDialog {
    found_item: FoundItem,
    form: ClaimForm,
    state: DialogState,
    notifications: Vec<Notification>,
}

impl ClaimDialog {
    /// Open a dialog for a found item; already claimed items cannot be claimed
    pub fn open(found_item: FoundItem) -> Result<Self> {
        if found_item.status == ItemStatus::Claimed {
            return Err(OrchestrationError::InvalidTransition(format!(
                "found item '{}' has already been claimed",
                found_item.id
            )));
        }

        Ok(Self {
            found_item,
            form: ClaimForm::default(),
            state: DialogState::Editing,
            notifications: Vec::new(),
        })
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn form(&self) -> &ClaimForm {
        &self.form
    }

    pub fn found_item(&self) -> &FoundItem {
        &self.found_item
    }

    /// Replace the form contents while editing
    pub fn edit(&mut self, form: ClaimForm) -> Result<()> {
        self.expect_state("edit", |s| matches!(s, DialogState::Editing))?;
        self.form = form;
        Ok(())
    }

    /// EDITING → VERIFYING; returns the request to run
    pub fn submit(&mut self) -> Result<ClaimVerificationRequest> {
        self.expect_state("submit", |s| matches!(s, DialogState::Editing))?;
        self.form.validate()?;

        self.state = DialogState::Verifying;
        Ok(ClaimVerificationRequest {
            found_item_id: self.found_item.id.clone(),
            lost_item_id: self.form.lost_item_id.clone(),
            proof_description: self.form.proof.clone(),
        })
    }

    /// VERIFYING → REVIEWING, with either the real result or the placeholder
    pub fn complete(&mut self, outcome: Result<ClaimVerification>) -> Result<&ReviewView> {
        self.expect_state("complete", |s| matches!(s, DialogState::Verifying))?;

        let view = match outcome {
            Ok(verification) => ReviewView::from_verification(&verification),
            Err(e) => {
                warn!(
                    found_item_id = %self.found_item.id,
                    kind = e.kind(),
                    error = %e,
                    "Claim verification failed"
                );
                self.notifications.push(Notification::error(
                    "AI Error",
                    "Could not perform AI verification.",
                ));
                ReviewView::placeholder(&e)
            }
        };

        self.state = DialogState::Reviewing(view);
        self.review().ok_or_else(|| {
            OrchestrationError::InvalidTransition("review view missing after completion".to_string())
        })
    }

    pub fn review(&self) -> Option<&ReviewView> {
        match &self.state {
            DialogState::Reviewing(view) => Some(view),
            _ => None,
        }
    }

    /// Submit and verify in one step
    pub async fn verify(&mut self, orchestrator: &WorkflowOrchestrator) -> Result<&ReviewView> {
        let request = self.submit()?;
        let outcome = orchestrator.verify_claim(&request).await;
        self.complete(outcome)
    }

    /// REVIEWING → EDITING; the form is kept
    pub fn back(&mut self) -> Result<()> {
        self.expect_state("back", |s| matches!(s, DialogState::Reviewing(_)))?;
        self.state = DialogState::Editing;
        Ok(())
    }

    /// REVIEWING → SUBMITTED. Nothing is persisted.
    pub fn confirm(&mut self) -> Result<ClaimReceipt> {
        self.expect_state("confirm", |s| matches!(s, DialogState::Reviewing(_)))?;

        let receipt = ClaimReceipt {
            receipt_id: Uuid::new_v4(),
            found_item_id: self.found_item.id.clone(),
            lost_item_id: self.form.lost_item_id.clone(),
            title: "Claim Submitted!".to_string(),
            message: "Your claim has been submitted for review by an administrator.".to_string(),
            submitted_at: Utc::now(),
        };

        info!(
            receipt_id = %receipt.receipt_id,
            found_item_id = %receipt.found_item_id,
            "Claim submitted"
        );
        self.notifications
            .push(Notification::info(&receipt.title, &receipt.message));
        self.state = DialogState::Submitted(receipt.clone());
        Ok(receipt)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn expect_state(&self, action: &str, allowed: impl Fn(&DialogState) -> bool) -> Result<()> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(OrchestrationError::InvalidTransition(format!(
                "cannot {} while {}",
                action,
                self.state.name()
            )))
        }
    }
}
