use lost_found_orchestrator::{
    claim_dialog::{ClaimDialog, ClaimForm},
    config::AppConfig,
    flows::FlowInvoker,
    inference::StubCapability,
    media::{MediaRef, StaticImageResolver},
    report::LostItemReportDraft,
    repository::{InMemoryRepository, ItemRepository},
    session::{FraudReviewPanel, SuggestionSession},
    workflow::WorkflowOrchestrator,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 1x1 PNG used for every demo item image
const DEMO_PHOTO: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    info!("Lost & Found Orchestrator offline demo starting");

    let config = AppConfig::from_env()?;
    let repository = Arc::new(InMemoryRepository::demo());

    // Offline: every known item image resolves to the bundled photo
    let photo = MediaRef::parse(DEMO_PHOTO)?;
    let mut images = StaticImageResolver::new();
    for item in repository.list_found_items() {
        images = images.with_image(&item.image_url, photo.clone());
    }
    for lost in repository.lost_items_for_user("u1") {
        images = images.with_image(&lost.item.image_url, photo.clone());
    }

    let invoker = FlowInvoker::new(Arc::new(StubCapability::demo())).with_timeout(config.inference_timeout);
    let orchestrator = Arc::new(WorkflowOrchestrator::new(invoker, repository.clone(), Arc::new(images)));

    // Report a lost item with auto-fill
    let mut draft = LostItemReportDraft {
        description: "Black leather wallet, lost after lunch".to_string(),
        photo: Some(DEMO_PHOTO.to_string()),
        ..Default::default()
    };
    draft.auto_fill(&orchestrator).await?;
    let report = draft.submit("u1")?;
    println!("\n=== LOST ITEM REPORT ===");
    println!("Case ID: {}", report.item.case_id);
    println!("Category: {} | Color: {} | Location: {}", report.item.category, report.item.color, report.item.location);

    // Search box
    let suggestions = SuggestionSession::new(
        orchestrator.clone(),
        config.suggestion_debounce,
        config.suggestion_min_query_len,
    );
    suggestions.query_changed("wa").await;
    suggestions.query_changed("wallet").await;
    println!("\n=== SEARCH SUGGESTIONS ===");
    for suggestion in suggestions.suggestions().await {
        println!("  - {}", suggestion);
    }

    // Claim the found wallet
    let mut dialog = ClaimDialog::open(repository.found_item("2")?)?;
    dialog.edit(ClaimForm {
        lost_item_id: "l2".to_string(),
        proof: "Has my initials A.D. inside.".to_string(),
        proof_photo: None,
    })?;
    let view = dialog.verify(&orchestrator).await?.clone();
    println!("\n=== CLAIM VERIFICATION ===");
    println!("Match: {}% ({})", view.percentage, if view.is_good_match { "likely match" } else { "unlikely match" });
    println!("Reason: {}", view.reason);
    let receipt = dialog.confirm()?;
    println!("{} Receipt {}", receipt.title, receipt.receipt_id);

    // Admin fraud review
    let panel = FraudReviewPanel::new(orchestrator.clone());
    let review = panel.review("1").await?;
    println!("\n=== FRAUD REVIEW ===");
    println!("Claim: {}", review.claim_details);
    println!("Behavior: {}", review.user_behavior);
    println!(
        "Suspicious: {} (score {}%) - {}",
        review.result.is_suspicious, review.percentage, review.result.reason
    );

    let attempts = orchestrator.audit_log().list_for_found_item("2").await?;
    println!("\nAudit records for item 2: {}", attempts.len());

    Ok(())
}
