//! Lost-item report draft and its form rules

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::models::{AutoFillResult, Item, ItemStatus, LostItem, CATEGORIES};
use crate::repository::generate_case_id;
use crate::workflow::WorkflowOrchestrator;
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LostItemReportDraft {
    pub description: String,
    pub category: String,
    pub color: String,
    pub location: String,
    /// Data URI of an attached photo
    pub photo: Option<String>,
}

impl LostItemReportDraft {
    /// All rule violations, in form order
    pub fn violations(&self) -> Vec<&'static str> {
        let mut violations = Vec::new();

        if self.description.trim().chars().count() < 10 {
            violations.push("Description must be at least 10 characters.");
        }
        if !CATEGORIES.contains(&self.category.as_str()) {
            violations.push("Please select a category.");
        }
        if self.color.trim().is_empty() {
            violations.push("Color is required.");
        }
        if self.location.trim().chars().count() < 2 {
            violations.push("Location is required.");
        }

        violations
    }

    pub fn validate(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(OrchestrationError::ValidationError(violations.join(" ")))
        }
    }

    /// Copy suggested fields onto the draft. The category is mapped onto
    /// the form's categories; the description is only filled in when the
    /// user has not written one.
    pub fn apply_auto_fill(&mut self, result: &AutoFillResult) {
        self.category = form_category(&result.item_category).to_string();
        self.color = result.item_color.clone();
        self.location = result.item_location.clone();

        if !result.additional_details.is_empty() && self.description.is_empty() {
            self.description = result.additional_details.clone();
        }
    }

    /// Ask the model for suggestions and apply them
    pub async fn auto_fill(&mut self, orchestrator: &WorkflowOrchestrator) -> Result<AutoFillResult> {
        let result = orchestrator
            .auto_fill_form_details(&self.description, self.photo.as_deref())
            .await?;
        self.apply_auto_fill(&result);
        Ok(result)
    }

    /// Turn a valid draft into a pending lost-item report
    pub fn submit(&self, user_id: &str) -> Result<LostItem> {
        self.validate()?;

        let name = self
            .description
            .split(['.', ','])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let report = LostItem {
            item: Item {
                id: Uuid::new_v4().to_string(),
                case_id: generate_case_id(),
                category: self.category.clone(),
                name,
                description: self.description.clone(),
                color: self.color.clone(),
                location: self.location.clone(),
                date: Utc::now(),
                image_url: self.photo.clone().unwrap_or_default(),
                image_hint: format!("{} {}", self.color, self.category).to_lowercase(),
                status: ItemStatus::Pending,
            },
            user_id: user_id.to_string(),
        };

        info!(case_id = %report.item.case_id, user_id, "Lost item report created");
        Ok(report)
    }
}

/// Case-insensitive match against the form categories, "Other" when none fits
pub fn form_category(suggested: &str) -> &'static str {
    let suggested = suggested.trim();
    CATEGORIES
        .iter()
        .copied()
        .find(|category| category.eq_ignore_ascii_case(suggested))
        .unwrap_or("Other")
}
