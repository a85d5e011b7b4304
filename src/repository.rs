//! Read-only data access for items, claims and users
//!
//! The workflow depends on this trait rather than on global collections.
//! Currently backed by in-memory demo data; can be replaced with a database.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::models::{Claim, ClaimStatus, FoundItem, Item, ItemStatus, LostItem, User, UserRole};
use crate::Result;

/// Narrowing options for `list_claims`
#[derive(Debug, Clone, Default)]
pub struct ClaimFilter {
    pub user_id: Option<String>,
    pub found_item_id: Option<String>,
    pub status: Option<ClaimStatus>,
}

impl ClaimFilter {
    pub fn matches(&self, claim: &Claim) -> bool {
        self.user_id.as_deref().map_or(true, |u| claim.user_id == u)
            && self.found_item_id.as_deref().map_or(true, |f| claim.found_item_id == f)
            && self.status.map_or(true, |s| claim.status == s)
    }
}

/// Trait for synchronous reads (no writes observed in scope)
pub trait ItemRepository: Send + Sync {
    fn find_found_item(&self, id: &str) -> Option<FoundItem>;
    fn find_lost_item(&self, id: &str) -> Option<LostItem>;
    fn find_user(&self, id: &str) -> Option<User>;
    fn list_found_items(&self) -> Vec<FoundItem>;
    fn lost_items_for_user(&self, user_id: &str) -> Vec<LostItem>;
    fn list_claims(&self, filter: &ClaimFilter) -> Vec<Claim>;

    fn claims_for_found_item(&self, found_item_id: &str) -> Vec<Claim> {
        self.list_claims(&ClaimFilter {
            found_item_id: Some(found_item_id.to_string()),
            ..ClaimFilter::default()
        })
    }

    fn found_item(&self, id: &str) -> Result<FoundItem> {
        self.find_found_item(id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("found item '{}'", id)))
    }

    fn lost_item(&self, id: &str) -> Result<LostItem> {
        self.find_lost_item(id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("lost item '{}'", id)))
    }
}

/// In-memory repository for development
pub struct InMemoryRepository {
    found_items: Vec<FoundItem>,
    lost_items: Vec<LostItem>,
    claims: Vec<Claim>,
    users: Vec<User>,
}

impl InMemoryRepository {
    /// Build a repository; every claim must reference existing items
    pub fn new(
        found_items: Vec<FoundItem>,
        lost_items: Vec<LostItem>,
        claims: Vec<Claim>,
        users: Vec<User>,
    ) -> Result<Self> {
        for claim in &claims {
            if !found_items.iter().any(|i| i.id == claim.found_item_id) {
                return Err(OrchestrationError::NotFound(format!(
                    "claim '{}' references unknown found item '{}'",
                    claim.id, claim.found_item_id
                )));
            }
            if !lost_items.iter().any(|i| i.item.id == claim.lost_item_id) {
                return Err(OrchestrationError::NotFound(format!(
                    "claim '{}' references unknown lost item '{}'",
                    claim.id, claim.lost_item_id
                )));
            }
        }

        Ok(Self {
            found_items,
            lost_items,
            claims,
            users,
        })
    }

    /// Demo data set, dated relative to now
    pub fn demo() -> Self {
        let found_items = FOUND_SEED
            .iter()
            .enumerate()
            .map(|(index, (description, hint, image_url))| {
                let name = description.split(',').next().unwrap_or_default().trim();
                Item {
                    id: (index + 1).to_string(),
                    case_id: generate_case_id(),
                    category: category_for_hint(hint).to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    color: capitalize(hint.split(' ').next().unwrap_or_default()),
                    location: LOCATIONS[index % LOCATIONS.len()].to_string(),
                    date: Utc::now() - Duration::days(index as i64),
                    image_url: image_url.to_string(),
                    image_hint: hint.to_string(),
                    status: ItemStatus::Approved,
                }
            })
            .collect();

        let lost_items = vec![
            LostItem {
                item: Item {
                    id: "l1".into(),
                    case_id: generate_case_id(),
                    category: "Electronics".into(),
                    name: "iPhone 13 Pro".into(),
                    description: "My black iPhone 13 Pro, has a small crack on the top right corner. It was in a clear case.".into(),
                    color: "Black".into(),
                    location: "Library, 2nd Floor".into(),
                    date: Utc::now() - Duration::days(2),
                    image_url: "https://picsum.photos/seed/11/400/300".into(),
                    image_hint: "black iphone".into(),
                    status: ItemStatus::Approved,
                },
                user_id: "u1".into(),
            },
            LostItem {
                item: Item {
                    id: "l2".into(),
                    case_id: generate_case_id(),
                    category: "Accessories".into(),
                    name: "Brown Leather Wallet".into(),
                    description: "My wallet with my ID and credit cards. It is a bit old and has a scratch on the front.".into(),
                    color: "Brown".into(),
                    location: "Cafeteria".into(),
                    date: Utc::now() - Duration::days(5),
                    image_url: "https://picsum.photos/seed/12/400/300".into(),
                    image_hint: "leather wallet".into(),
                    status: ItemStatus::Approved,
                },
                user_id: "u1".into(),
            },
        ];

        let claims = vec![
            Claim {
                id: "c1".into(),
                lost_item_id: "l2".into(),
                found_item_id: "2".into(),
                user_id: "u1".into(),
                user_name: "Alex Doe".into(),
                claim_date: Utc::now() - Duration::days(1),
                status: ClaimStatus::Approved,
                proof: Some("Has my initials A.D. inside.".into()),
            },
            Claim {
                id: "c2".into(),
                lost_item_id: "l1".into(),
                found_item_id: "1".into(),
                user_id: "u1".into(),
                user_name: "Alex Doe".into(),
                claim_date: Utc::now(),
                status: ClaimStatus::Pending,
                proof: Some("I can unlock it with my Face ID.".into()),
            },
        ];

        let users = vec![
            demo_user("u1", "Alex Doe", "alex.doe@example.com", UserRole::Student, (2023, 9, 1)),
            demo_user("u2", "Brenda Smith", "brenda.smith@example.com", UserRole::Staff, (2022, 8, 15)),
            demo_user("u3", "Charlie Brown", "charlie.brown@example.com", UserRole::Student, (2024, 1, 20)),
            demo_user("u4", "Diana Prince", "diana.prince@example.com", UserRole::Admin, (2021, 5, 10)),
        ];

        Self {
            found_items,
            lost_items,
            claims,
            users,
        }
    }
}

impl ItemRepository for InMemoryRepository {
    fn find_found_item(&self, id: &str) -> Option<FoundItem> {
        self.found_items.iter().find(|i| i.id == id).cloned()
    }

    fn find_lost_item(&self, id: &str) -> Option<LostItem> {
        self.lost_items.iter().find(|i| i.item.id == id).cloned()
    }

    fn find_user(&self, id: &str) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    fn list_found_items(&self) -> Vec<FoundItem> {
        self.found_items.clone()
    }

    fn lost_items_for_user(&self, user_id: &str) -> Vec<LostItem> {
        self.lost_items
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect()
    }

    fn list_claims(&self, filter: &ClaimFilter) -> Vec<Claim> {
        self.claims.iter().filter(|c| filter.matches(c)).cloned().collect()
    }
}

const LOCATIONS: &[&str] = &["Library", "Student Center", "Cafeteria", "Gymnasium", "Lecture Hall A"];

/// (description, image hint, image url)
const FOUND_SEED: &[(&str, &str, &str)] = &[
    (
        "Black iPhone 13, cracked top corner, in a clear case",
        "black phone",
        "https://picsum.photos/seed/1/400/300",
    ),
    (
        "Brown leather wallet, worn edges with initials inside",
        "brown wallet",
        "https://picsum.photos/seed/2/400/300",
    ),
    (
        "Set of three keys, on a red carabiner",
        "silver keys",
        "https://picsum.photos/seed/3/400/300",
    ),
    (
        "Blue backpack, with a water bottle in the side pocket",
        "blue backpack",
        "https://picsum.photos/seed/4/400/300",
    ),
    (
        "White over-ear headphones, left cushion slightly torn",
        "white headphones",
        "https://picsum.photos/seed/5/400/300",
    ),
    (
        "Grey laptop, university sticker on the lid",
        "grey laptop",
        "https://picsum.photos/seed/6/400/300",
    ),
    (
        "Green scarf, knitted wool",
        "green scarf",
        "https://picsum.photos/seed/7/400/300",
    ),
];

fn category_for_hint(hint: &str) -> &'static str {
    if ["phone", "laptop", "headphones"].iter().any(|k| hint.contains(k)) {
        "Electronics"
    } else if ["wallet", "backpack"].iter().any(|k| hint.contains(k)) {
        "Accessories"
    } else if hint.contains("keys") {
        "Keys"
    } else {
        "Other"
    }
}

/// `FNM-` followed by nine upper-case alphanumerics
pub fn generate_case_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("FNM-{}", simple[..9].to_uppercase())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn demo_user(id: &str, name: &str, email: &str, role: UserRole, joined: (i32, u32, u32)) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        joined: NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap_or_default(),
    }
}
