//! REST API server for the lost & found orchestrator
//!
//! Exposes the four flows plus the claim and admin workflows over HTTP.
//! Failures reach the client as a generic message per use case; the error
//! kind goes to the operator log.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::catalog::{self, FoundItemQuery};
use crate::claim_dialog::{ClaimDialog, ClaimForm};
use crate::error::OrchestrationError;
use crate::models::{AutoFillRequest, FraudCheckRequest, SearchSuggestionsRequest, VerificationRequest};
use crate::workflow::{ClaimVerificationRequest, WorkflowOrchestrator};

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Map an orchestration error to a response. Validation and lookup errors
/// are shown as-is; everything else becomes the generic message.
fn failure(operation: &str, error: OrchestrationError, generic: &str) -> ApiResult {
    warn!(operation, kind = error.kind(), error = %error, "Request failed");

    let (status, message) = match &error {
        OrchestrationError::ValidationError(message) => (StatusCode::BAD_REQUEST, message.clone()),
        OrchestrationError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
        OrchestrationError::InvalidTransition(message) => (StatusCode::CONFLICT, message.clone()),
        OrchestrationError::InferenceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, generic.to_string()),
        OrchestrationError::TimedOut(_) => (StatusCode::GATEWAY_TIMEOUT, generic.to_string()),
        OrchestrationError::ResponseMalformed(_) | OrchestrationError::ImageUnavailable { .. } => {
            (StatusCode::BAD_GATEWAY, generic.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, generic.to_string()),
    };

    (status, Json(ApiResponse::error(message)))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<WorkflowOrchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Flow Endpoints
/// =============================

async fn auto_fill(State(state): State<ApiState>, Json(req): Json<AutoFillRequest>) -> ApiResult {
    info!(has_photo = req.photo_data_uri.is_some(), "Auto-fill requested");

    match state
        .orchestrator
        .auto_fill_form_details(&req.description, req.photo_data_uri.as_deref())
        .await
    {
        Ok(result) => ok(result),
        Err(e) => failure("auto_fill", e, "Could not auto-fill the form."),
    }
}

async fn fraud_check(State(state): State<ApiState>, Json(req): Json<FraudCheckRequest>) -> ApiResult {
    match state
        .orchestrator
        .detect_suspicious_claims(&req.claim_details, &req.user_behavior)
        .await
    {
        Ok(result) => ok(result),
        Err(e) => failure("fraud_check", e, "Could not perform fraud check."),
    }
}

async fn verify_match(State(state): State<ApiState>, Json(req): Json<VerificationRequest>) -> ApiResult {
    match state
        .orchestrator
        .verify_item_match(
            &req.lost_item_description,
            &req.found_item_description,
            &req.lost_item_photo_data_uri,
            &req.found_item_photo_data_uri,
        )
        .await
    {
        Ok(result) => ok(serde_json::json!({
            "matchScore": result.match_score,
            "reason": result.reason,
            "percentage": result.percentage(),
            "isGoodMatch": result.is_good_match(),
        })),
        Err(e) => failure("verify_match", e, "Could not perform AI verification."),
    }
}

async fn search_suggestions(
    State(state): State<ApiState>,
    Json(req): Json<SearchSuggestionsRequest>,
) -> ApiResult {
    match state.orchestrator.get_smart_search_suggestions(&req.query).await {
        Ok(result) => ok(result),
        Err(e) => failure("search_suggestions", e, "Could not load search suggestions."),
    }
}

/// =============================
/// Catalogue & Claim Endpoints
/// =============================

async fn list_found_items(State(state): State<ApiState>, Query(query): Query<FoundItemQuery>) -> ApiResult {
    ok(catalog::browse(state.orchestrator.repository(), &query))
}

async fn get_found_item(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    match state.orchestrator.repository().found_item(&id) {
        Ok(item) => ok(item),
        Err(e) => failure("get_found_item", e, "Could not load the item."),
    }
}

/// Apply the claim form rules through the dialog before anything is sent
fn claim_submission(
    orchestrator: &WorkflowOrchestrator,
    req: ClaimVerificationRequest,
) -> crate::Result<ClaimVerificationRequest> {
    let found_item = orchestrator.repository().found_item(&req.found_item_id)?;
    let mut dialog = ClaimDialog::open(found_item)?;
    dialog.edit(ClaimForm {
        lost_item_id: req.lost_item_id,
        proof: req.proof_description,
        proof_photo: None,
    })?;
    dialog.submit()
}

async fn verify_claim(State(state): State<ApiState>, Json(req): Json<ClaimVerificationRequest>) -> ApiResult {
    info!(
        found_item_id = %req.found_item_id,
        lost_item_id = %req.lost_item_id,
        "Claim verification requested"
    );

    let request = match claim_submission(&state.orchestrator, req) {
        Ok(request) => request,
        Err(e) => return failure("verify_claim", e, "Could not perform AI verification."),
    };

    match state.orchestrator.verify_claim(&request).await {
        Ok(verification) => ok(verification),
        Err(e) => failure("verify_claim", e, "Could not perform AI verification."),
    }
}

async fn review_found_item(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    match state.orchestrator.review_found_item(&id).await {
        Ok(review) => ok(review),
        Err(e) => failure("review_found_item", e, "Could not perform fraud check."),
    }
}

async fn user_claims(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    ok(catalog::claim_history(state.orchestrator.repository(), &id))
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<WorkflowOrchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/flows/auto-fill", post(auto_fill))
        .route("/api/flows/fraud-check", post(fraud_check))
        .route("/api/flows/verify-match", post(verify_match))
        .route("/api/flows/search-suggestions", post(search_suggestions))
        .route("/api/items/found", get(list_found_items))
        .route("/api/items/found/:id", get(get_found_item))
        .route("/api/claims/verify", post(verify_claim))
        .route("/api/admin/items/:id/fraud-check", post(review_found_item))
        .route("/api/users/:id/claims", get(user_claims))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<WorkflowOrchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{StubCapability, StubReply};
    use crate::workflow::tests::orchestrator_with;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router(stub: StubCapability) -> Router {
        create_router(Arc::new(orchestrator_with(Arc::new(stub))))
    }

    fn claim_body(found_item_id: &str, proof: &str) -> Value {
        json!({
            "found_item_id": found_item_id,
            "lost_item_id": "l2",
            "proof_description": proof
        })
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(StubCapability::demo())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auto_fill_endpoint() {
        let (status, body) = send(
            router(StubCapability::demo()),
            "POST",
            "/api/flows/auto-fill",
            Some(json!({ "description": "A black leather wallet with a scratch" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["itemCategory"], "Accessories");
    }

    #[tokio::test]
    async fn test_fraud_check_failure_is_generic() {
        let stub = StubCapability::new().with_reply(
            "FraudCheckResult",
            StubReply::Unavailable("connection reset by peer".into()),
        );
        let (status, body) = send(
            router(stub),
            "POST",
            "/api/flows/fraud-check",
            Some(json!({ "claimDetails": "Claim for item", "userBehavior": "Normal" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("Could not perform fraud check."));
    }

    #[tokio::test]
    async fn test_verify_match_reports_percentage() {
        let stub = StubCapability::new().with_reply(
            "VerificationResult",
            StubReply::Value(json!({ "matchScore": 0.95, "reason": "Same item" })),
        );
        let pixel = "data:image/png;base64,iVBORw0KGgo=";
        let (status, body) = send(
            router(stub),
            "POST",
            "/api/flows/verify-match",
            Some(json!({
                "lostItemDescription": "Black phone",
                "foundItemDescription": "Black phone",
                "lostItemPhotoDataUri": pixel,
                "foundItemPhotoDataUri": pixel
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["percentage"], 95);
        assert_eq!(data["isGoodMatch"], true);
    }

    #[tokio::test]
    async fn test_verify_match_rejects_plain_url_photo() {
        let (status, body) = send(
            router(StubCapability::demo()),
            "POST",
            "/api/flows/verify-match",
            Some(json!({
                "lostItemDescription": "Black phone",
                "foundItemDescription": "Black phone",
                "lostItemPhotoDataUri": "https://example.com/a.jpg",
                "foundItemPhotoDataUri": "https://example.com/b.jpg"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_browse_and_lookup() {
        let router = router(StubCapability::demo());

        let (status, body) = send(router.clone(), "GET", "/api/items/found?q=keys&category=All", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().as_array().unwrap().len(), 1);

        let (status, _) = send(router.clone(), "GET", "/api/items/found/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(router, "GET", "/api/users/u1/claims", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_claim_verify_and_admin_review() {
        let router = router(StubCapability::demo());

        let (status, body) = send(
            router.clone(),
            "POST",
            "/api/claims/verify",
            Some(json!({
                "found_item_id": "2",
                "lost_item_id": "l2",
                "proof_description": "Has my initials A.D. inside."
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["percentage"], 82);

        let (status, body) = send(router, "POST", "/api/admin/items/1/fraud-check", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["claim_id"], "c2");
    }

    #[tokio::test]
    async fn test_claim_verify_applies_form_rules() {
        let stub = Arc::new(StubCapability::demo());
        let router = create_router(Arc::new(orchestrator_with(stub.clone())));

        let (status, body) = send(router.clone(), "POST", "/api/claims/verify", Some(claim_body("2", ""))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);

        let mut missing_lost = claim_body("2", "Has my initials A.D. inside.");
        missing_lost["lost_item_id"] = json!("");
        let (status, _) = send(router, "POST", "/api/claims/verify", Some(missing_lost)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_claimed_item_cannot_be_claimed_again() {
        use crate::flows::FlowInvoker;
        use crate::models::ItemStatus;
        use crate::repository::{ClaimFilter, InMemoryRepository, ItemRepository};
        use crate::workflow::tests::FixtureImages;

        let demo = InMemoryRepository::demo();
        let mut found = demo.list_found_items();
        found[1].status = ItemStatus::Claimed;
        let repository = InMemoryRepository::new(
            found,
            demo.lost_items_for_user("u1"),
            demo.list_claims(&ClaimFilter::default()),
            vec![],
        )
        .unwrap();

        let stub = Arc::new(StubCapability::demo());
        let orchestrator = WorkflowOrchestrator::new(
            FlowInvoker::new(stub.clone()),
            Arc::new(repository),
            Arc::new(FixtureImages),
        );

        let (status, body) = send(
            create_router(Arc::new(orchestrator)),
            "POST",
            "/api/claims/verify",
            Some(claim_body("2", "Has my initials A.D. inside.")),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.unwrap().contains("already been claimed"));
        assert_eq!(stub.call_count(), 0);
    }
}
