//! Verification audit log
//!
//! Every claim verification attempt is recorded, successful or not, with a
//! fingerprint of exactly what was sent. A record shows whether real photos
//! were compared, so "verified against a photo" is never confused with
//! "verification could not run".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Result;

/// What went into a verification attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditedInputs {
    pub found_item_id: String,
    pub lost_item_id: String,
    pub lost_item_description: String,
    pub found_item_description: String,
    /// SHA-256 of the lost item photo data URI, `None` if it could not be resolved
    pub lost_photo_digest: Option<String>,
    pub found_photo_digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    Verified { match_score: f64, is_good_match: bool },
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub audit_id: Uuid,
    pub inputs: AuditedInputs,
    pub inputs_hash: String,
    pub outcome: AuditOutcome,
    pub created_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl VerificationRecord {
    pub fn new(inputs: AuditedInputs, outcome: AuditOutcome, execution_time_ms: u64) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            inputs_hash: compute_inputs_hash(&inputs),
            inputs,
            outcome,
            created_at: Utc::now(),
            execution_time_ms,
        }
    }

    /// Both photos were real, resolved images
    pub fn compared_photos(&self) -> bool {
        self.inputs.lost_photo_digest.is_some() && self.inputs.found_photo_digest.is_some()
    }
}

/// Audit trail storage
pub struct VerificationAuditLog {
    records: Arc<RwLock<HashMap<Uuid, VerificationRecord>>>,
}

impl VerificationAuditLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a verification record
    pub async fn record(&self, record: VerificationRecord) -> Result<Uuid> {
        let audit_id = record.audit_id;
        let mut records = self.records.write().await;
        records.insert(audit_id, record);
        Ok(audit_id)
    }

    /// Retrieve a record by audit ID
    pub async fn get(&self, audit_id: Uuid) -> Result<Option<VerificationRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&audit_id).cloned())
    }

    /// All attempts for a found item (sorted by created_at)
    pub async fn list_for_found_item(&self, found_item_id: &str) -> Result<Vec<VerificationRecord>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .values()
            .filter(|record| record.inputs.found_item_id == found_item_id)
            .cloned()
            .collect();

        items.sort_by_key(|record| record.created_at);

        Ok(items)
    }

    /// Verify a record's integrity via hash
    pub async fn verify_integrity(&self, audit_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        if let Some(record) = records.get(&audit_id) {
            Ok(compute_inputs_hash(&record.inputs) == record.inputs_hash)
        } else {
            Ok(false)
        }
    }
}

impl Default for VerificationAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of a media data URI, hex encoded
pub fn digest_media(data_uri: &str) -> String {
    hex::encode(Sha256::digest(data_uri.as_bytes()))
}

/// Compute SHA256 hash of the audited inputs
/// Uses zero-copy streaming serialization into hasher
pub fn compute_inputs_hash(inputs: &AuditedInputs) -> String {
    let mut hasher = Sha256::new();

    // Stream JSON directly into hasher (no intermediate String)
    if serde_json::to_writer(&mut HashWriter(&mut hasher), inputs).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
