//! Claim-level operations built on the repository
//!
//! These compose the flow calls the way the claim dialog and the admin
//! review page need them: look items up, resolve photos, call the flow,
//! keep an audit trail.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{digest_media, AuditOutcome, AuditedInputs, VerificationRecord};
use crate::models::{Claim, ClaimStatus, FraudCheckResult, VerificationResult};
use crate::repository::{ClaimFilter, ItemRepository};
use crate::workflow::WorkflowOrchestrator;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerificationRequest {
    pub found_item_id: String,
    pub lost_item_id: String,
    pub proof_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub audit_id: Uuid,
    pub found_item_id: String,
    pub lost_item_id: String,
    pub result: VerificationResult,
    pub percentage: u8,
    pub is_good_match: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReview {
    pub found_item_id: String,
    pub claim_id: Option<String>,
    pub claim_details: String,
    pub user_behavior: String,
    pub result: FraudCheckResult,
    pub percentage: u8,
}

impl WorkflowOrchestrator {
    /// Verify a claim against the found item it targets.
    /// Both item images must resolve; there is no placeholder fallback.
    pub async fn verify_claim(&self, request: &ClaimVerificationRequest) -> Result<ClaimVerification> {
        let start = Instant::now();

        let found = self.repository.found_item(&request.found_item_id)?;
        let lost = self.repository.lost_item(&request.lost_item_id)?;

        let lost_description = format!(
            "{}. My proof is: {}",
            lost.item.description, request.proof_description
        );

        let (found_photo, lost_photo) = tokio::join!(
            self.images.resolve(&found.image_url),
            self.images.resolve(&lost.item.image_url),
        );

        let found_photo = found_photo.map(|m| m.to_data_uri());
        let lost_photo = lost_photo.map(|m| m.to_data_uri());

        let inputs = AuditedInputs {
            found_item_id: found.id.clone(),
            lost_item_id: lost.item.id.clone(),
            lost_item_description: lost_description.clone(),
            found_item_description: found.description.clone(),
            lost_photo_digest: lost_photo.as_deref().ok().map(digest_media),
            found_photo_digest: found_photo.as_deref().ok().map(digest_media),
        };

        let outcome = match (lost_photo, found_photo) {
            (Ok(lost_photo), Ok(found_photo)) => {
                self.verify_item_match(&lost_description, &found.description, &lost_photo, &found_photo)
                    .await
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    found_item_id = %found.id,
                    lost_item_id = %lost.item.id,
                    error = %e,
                    "Item image unavailable; verification not attempted"
                );
                Err(e)
            }
        };

        let audit_outcome = match &outcome {
            Ok(result) => AuditOutcome::Verified {
                match_score: result.match_score,
                is_good_match: result.is_good_match(),
            },
            Err(e) => AuditOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        };

        let audit_id = self
            .audit_log
            .record(VerificationRecord::new(
                inputs,
                audit_outcome,
                start.elapsed().as_millis() as u64,
            ))
            .await?;

        let result = outcome?;
        info!(%audit_id, found_item_id = %found.id, "Claim verification recorded");

        Ok(ClaimVerification {
            audit_id,
            found_item_id: found.id,
            lost_item_id: lost.item.id,
            percentage: result.percentage(),
            is_good_match: result.is_good_match(),
            result,
        })
    }

    /// Fraud check for the claim attached to a found item (admin review)
    pub async fn review_found_item(&self, found_item_id: &str) -> Result<FraudReview> {
        let item = self.repository.found_item(found_item_id)?;
        let related = self.repository.claims_for_found_item(found_item_id).into_iter().next();

        let proof = related
            .as_ref()
            .and_then(|c| c.proof.as_deref())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("No proof description");

        let claim_details = format!(
            "Claim for item \"{}\" (ID: {}). Claimer provided description: \"{}\"",
            item.name, item.id, proof
        );

        let user_behavior = match &related {
            Some(claim) => describe_claimant_behavior(self.repository(), claim),
            None => "No claimant on record for this item.".to_string(),
        };

        let result = self.detect_suspicious_claims(&claim_details, &user_behavior).await?;

        Ok(FraudReview {
            found_item_id: item.id,
            claim_id: related.map(|c| c.id),
            claim_details,
            user_behavior,
            percentage: result.percentage(),
            result,
        })
    }
}

/// Summarise a claimant's history from the repository
pub fn describe_claimant_behavior(repository: &dyn ItemRepository, claim: &Claim) -> String {
    let claims = repository.list_claims(&ClaimFilter {
        user_id: Some(claim.user_id.clone()),
        ..ClaimFilter::default()
    });

    let count = |status: ClaimStatus| claims.iter().filter(|c| c.status == status).count();
    let since = Utc::now() - Duration::hours(24);
    let recent = claims.iter().filter(|c| c.claim_date >= since).count();
    let lost_reports = repository.lost_items_for_user(&claim.user_id).len();

    let mut summary = format!(
        "User {} has filed {} claim(s) ({} pending, {} approved, {} rejected), {} in the last 24 hours. \
         User has reported {} lost item(s).",
        claim.user_name,
        claims.len(),
        count(ClaimStatus::Pending),
        count(ClaimStatus::Approved),
        count(ClaimStatus::Rejected),
        recent,
        lost_reports,
    );

    match repository.find_user(&claim.user_id) {
        Some(user) => summary.push_str(&format!(" Account created {}.", user.joined)),
        None => summary.push_str(" No account record found for this user."),
    }

    summary
}
