//! Browsing found items and a user's claim history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ClaimStatus, FoundItem};
use crate::repository::{ClaimFilter, ItemRepository};

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoundItemQuery {
    #[serde(default, rename = "q")]
    pub term: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl FoundItemQuery {
    fn matches(&self, item: &FoundItem) -> bool {
        let term_ok = match self.term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&item.name, &item.description, &item.category, &item.location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        };

        let category_ok = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) | Some("") => true,
            Some(category) => item.category == category,
        };

        term_ok && category_ok
    }
}

/// Filter and sort the found item catalogue
pub fn browse(repository: &dyn ItemRepository, query: &FoundItemQuery) -> Vec<FoundItem> {
    let mut items: Vec<FoundItem> = repository
        .list_found_items()
        .into_iter()
        .filter(|item| query.matches(item))
        .collect();

    match query.sort {
        SortOrder::Newest => items.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOrder::Oldest => items.sort_by(|a, b| a.date.cmp(&b.date)),
    }

    items
}

/// One row of a user's claim history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimSummary {
    pub claim_id: String,
    /// `None` when the item no longer exists
    pub found_item_name: Option<String>,
    pub lost_item_name: Option<String>,
    pub claim_date: DateTime<Utc>,
    pub status: ClaimStatus,
}

pub fn claim_history(repository: &dyn ItemRepository, user_id: &str) -> Vec<ClaimSummary> {
    let mut claims = repository.list_claims(&ClaimFilter {
        user_id: Some(user_id.to_string()),
        ..ClaimFilter::default()
    });
    claims.sort_by(|a, b| b.claim_date.cmp(&a.claim_date));

    claims
        .into_iter()
        .map(|claim| ClaimSummary {
            found_item_name: repository.find_found_item(&claim.found_item_id).map(|i| i.name),
            lost_item_name: repository.find_lost_item(&claim.lost_item_id).map(|i| i.item.name),
            claim_id: claim.id,
            claim_date: claim.claim_date,
            status: claim.status,
        })
        .collect()
}
