//! Interactive sessions: the search suggestion box and the fraud review panel
//!
//! Both follow the same rule: every new request takes the next sequence
//! number, in-flight work is dropped as soon as a newer number exists, and
//! only the latest request may publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::OrchestrationError;
use crate::models::Notification;
use crate::workflow::{FraudReview, WorkflowOrchestrator};
use crate::Result;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Issues sequence numbers and lets in-flight work notice it has been overtaken
struct Sequencer {
    latest: watch::Sender<u64>,
}

impl Sequencer {
    fn new() -> Self {
        let (latest, _) = watch::channel(0);
        Self { latest }
    }

    /// Take the next sequence number, with a receiver already positioned on it
    fn issue(&self) -> (u64, watch::Receiver<u64>) {
        let mut seq = 0;
        self.latest.send_modify(|latest| {
            *latest += 1;
            seq = *latest;
        });
        (seq, self.latest.subscribe())
    }

    fn latest(&self) -> u64 {
        *self.latest.borrow()
    }

    /// Resolves with the newer sequence number once `seq` is no longer the latest
    async fn overtaken(rx: &mut watch::Receiver<u64>, seq: u64) -> u64 {
        loop {
            let latest = *rx.borrow_and_update();
            if latest != seq {
                return latest;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

//
// ================= Search suggestions =================
//

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionUpdate {
    /// Query too short; list emptied without calling the model
    Cleared,
    Updated(Vec<String>),
    /// A newer query took over; carries its sequence number
    Superseded(u64),
    /// Call failed; list emptied. Carries the error kind.
    Failed(String),
}

#[derive(Debug, Default)]
struct Published {
    seq: u64,
    suggestions: Vec<String>,
}

pub struct SuggestionSession {
    orchestrator: Arc<WorkflowOrchestrator>,
    sequencer: Sequencer,
    published: Mutex<Published>,
    debounce: Duration,
    min_query_len: usize,
}

impl SuggestionSession {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>, debounce: Duration, min_query_len: usize) -> Self {
        Self {
            orchestrator,
            sequencer: Sequencer::new(),
            published: Mutex::new(Published::default()),
            debounce,
            min_query_len,
        }
    }

    /// The suggestions currently shown
    pub async fn suggestions(&self) -> Vec<String> {
        self.published.lock().await.suggestions.clone()
    }

    /// Handle one edit of the search box
    pub async fn query_changed(&self, query: &str) -> SuggestionUpdate {
        let (seq, mut rx) = self.sequencer.issue();

        if query.trim().chars().count() < self.min_query_len {
            self.publish(seq, Vec::new()).await;
            return SuggestionUpdate::Cleared;
        }

        let debounce = self.debounce;
        let fetch = async {
            tokio::time::sleep(debounce).await;
            self.orchestrator.get_smart_search_suggestions(query).await
        };

        let outcome = tokio::select! {
            outcome = fetch => outcome,
            newer = Sequencer::overtaken(&mut rx, seq) => {
                debug!(seq, newer, "Suggestion request superseded");
                return SuggestionUpdate::Superseded(newer);
            }
        };

        match outcome {
            Ok(result) => {
                if self.publish(seq, result.suggestions.clone()).await {
                    SuggestionUpdate::Updated(result.suggestions)
                } else {
                    SuggestionUpdate::Superseded(self.sequencer.latest())
                }
            }
            Err(e) => {
                warn!(seq, kind = e.kind(), error = %e, "Search suggestions failed");
                if self.publish(seq, Vec::new()).await {
                    SuggestionUpdate::Failed(e.kind().to_string())
                } else {
                    SuggestionUpdate::Superseded(self.sequencer.latest())
                }
            }
        }
    }

    async fn publish(&self, seq: u64, suggestions: Vec<String>) -> bool {
        let mut published = self.published.lock().await;
        if seq != self.sequencer.latest() || seq < published.seq {
            return false;
        }
        published.seq = seq;
        published.suggestions = suggestions;
        true
    }
}

//
// ================= Fraud review panel =================
//

#[derive(Debug, Default)]
struct PanelState {
    latest: Option<FraudReview>,
    notifications: Vec<Notification>,
}

/// Admin panel holding the latest fraud-check dialog
pub struct FraudReviewPanel {
    orchestrator: Arc<WorkflowOrchestrator>,
    sequencer: Sequencer,
    /// Sequence number of the review being shown as loading, 0 when idle
    in_flight: AtomicU64,
    state: Mutex<PanelState>,
}

/// Clears the loading marker when its review ends, including when the
/// review future is dropped before completing
struct LoadingGuard<'a> {
    in_flight: &'a AtomicU64,
    seq: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        // A newer review owns the marker once it has moved on
        let _ = self
            .in_flight
            .compare_exchange(self.seq, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl FraudReviewPanel {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>) -> Self {
        Self {
            orchestrator,
            sequencer: Sequencer::new(),
            in_flight: AtomicU64::new(0),
            state: Mutex::new(PanelState::default()),
        }
    }

    pub async fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) != 0
    }

    pub async fn latest_review(&self) -> Option<FraudReview> {
        self.state.lock().await.latest.clone()
    }

    pub async fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state.lock().await.notifications)
    }

    /// Run a fraud check for a found item and show it, unless a newer check started
    pub async fn review(&self, found_item_id: &str) -> Result<FraudReview> {
        let (seq, mut rx) = self.sequencer.issue();
        self.in_flight.fetch_max(seq, Ordering::AcqRel);
        let loading = LoadingGuard {
            in_flight: &self.in_flight,
            seq,
        };

        let outcome = tokio::select! {
            outcome = self.orchestrator.review_found_item(found_item_id) => outcome,
            newer = Sequencer::overtaken(&mut rx, seq) => {
                debug!(seq, newer, found_item_id, "Fraud review superseded");
                return Err(OrchestrationError::Superseded(newer));
            }
        };

        let mut state = self.state.lock().await;
        let latest = self.sequencer.latest();
        if seq != latest {
            return Err(OrchestrationError::Superseded(latest));
        }

        drop(loading);
        match outcome {
            Ok(review) => {
                state.latest = Some(review.clone());
                Ok(review)
            }
            Err(e) => {
                warn!(found_item_id, kind = e.kind(), error = %e, "Fraud review failed");
                state
                    .notifications
                    .push(Notification::error("Error", "Could not perform fraud check."));
                Err(e)
            }
        }
    }
}
