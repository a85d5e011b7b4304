//! Core data models for the lost & found service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
    Claimed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    Student,
    Staff,
    Admin,
}

/// Categories offered by the report and browse forms
pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Accessories",
    "Clothing",
    "Documents",
    "Keys",
    "Other",
];

//
// ================= Items =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub case_id: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub location: String,
    /// When the item was found (or lost)
    pub date: DateTime<Utc>,
    pub image_url: String,
    pub image_hint: String,
    pub status: ItemStatus,
}

/// An item as reported by a finder
pub type FoundItem = Item;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LostItem {
    #[serde(flatten)]
    pub item: Item,
    pub user_id: String,
}

//
// ================= Claims & Users =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    pub id: String,
    pub lost_item_id: String,
    pub found_item_id: String,
    pub user_id: String,
    pub user_name: String,
    pub claim_date: DateTime<Utc>,
    pub status: ClaimStatus,
    pub proof: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub joined: NaiveDate,
}

//
// ================= Flow I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoFillRequest {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_data_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoFillResult {
    pub item_category: String,
    pub item_color: String,
    pub item_location: String,
    pub additional_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckRequest {
    pub claim_details: String,
    pub user_behavior: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckResult {
    pub is_suspicious: bool,
    pub fraud_score: f64,
    pub reason: String,
}

impl FraudCheckResult {
    pub fn percentage(&self) -> u8 {
        to_percentage(self.fraud_score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub lost_item_description: String,
    pub found_item_description: String,
    pub lost_item_photo_data_uri: String,
    pub found_item_photo_data_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub match_score: f64,
    pub reason: String,
}

/// Scores strictly above this count as a likely match
pub const GOOD_MATCH_THRESHOLD: f64 = 0.6;

impl VerificationResult {
    pub fn is_good_match(&self) -> bool {
        self.match_score > GOOD_MATCH_THRESHOLD
    }

    pub fn percentage(&self) -> u8 {
        to_percentage(self.match_score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSuggestionsRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchSuggestionsResult {
    pub suggestions: Vec<String>,
}

fn to_percentage(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

//
// ================= Presentation =================
//

/// Toast-style message handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notification {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: false,
        }
    }

    pub fn error(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: true,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "Pending",
            ItemStatus::Approved => "Approved",
            ItemStatus::Rejected => "Rejected",
            ItemStatus::Claimed => "Claimed",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Rejected => "Rejected",
        };
        write!(f, "{}", s)
    }
}
