//! Workflow orchestrator
//!
//! One async operation per use case. Each is a single invoker call:
//! no retry, no caching. Errors propagate to the caller untouched.

use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::VerificationAuditLog;
use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::flows::{
    AutoFillFlow, Flow, FlowInvoker, FraudDetectionFlow, MatchVerificationFlow,
    SearchSuggestionsFlow,
};
use crate::gemini::GeminiClient;
use crate::inference::{GeminiCapability, InferenceCapability, StubCapability};
use crate::media::{HttpImageResolver, ImageResolver};
use crate::models::{
    AutoFillRequest, AutoFillResult, FraudCheckRequest, FraudCheckResult,
    SearchSuggestionsRequest, SearchSuggestionsResult, VerificationRequest, VerificationResult,
};
use crate::repository::ItemRepository;
use crate::Result;

pub mod claims;
pub use claims::{ClaimVerification, ClaimVerificationRequest, FraudReview};

/// Main orchestrator exposed to the presentation layer
pub struct WorkflowOrchestrator {
    invoker: FlowInvoker,
    repository: Arc<dyn ItemRepository>,
    images: Arc<dyn ImageResolver>,
    audit_log: VerificationAuditLog,
}

impl WorkflowOrchestrator {
    pub fn new(
        invoker: FlowInvoker,
        repository: Arc<dyn ItemRepository>,
        images: Arc<dyn ImageResolver>,
    ) -> Self {
        Self {
            invoker,
            repository,
            images,
            audit_log: VerificationAuditLog::new(),
        }
    }

    /// Gemini when an API key is configured, the demo stub otherwise
    pub fn from_config(config: &AppConfig, repository: Arc<dyn ItemRepository>) -> Result<Self> {
        let capability: Arc<dyn InferenceCapability> = match &config.gemini_api_key {
            Some(api_key) => {
                let client = GeminiClient::with_endpoint(
                    api_key.clone(),
                    config.gemini_base_url.clone(),
                    config.gemini_model.clone(),
                )?;
                info!(model = %config.gemini_model, "Using Gemini inference");
                Arc::new(GeminiCapability::new(client))
            }
            None => {
                warn!("GEMINI_API_KEY not set; using the offline stub capability");
                Arc::new(StubCapability::demo())
            }
        };

        let invoker = FlowInvoker::new(capability).with_timeout(config.inference_timeout);
        let images = Arc::new(HttpImageResolver::new(config.image_fetch_timeout)?);

        Ok(Self::new(invoker, repository, images))
    }

    pub fn repository(&self) -> &dyn ItemRepository {
        self.repository.as_ref()
    }

    pub fn audit_log(&self) -> &VerificationAuditLog {
        &self.audit_log
    }

    /// Suggest report form fields while a user composes a lost-item report
    pub async fn auto_fill_form_details(
        &self,
        description: &str,
        photo: Option<&str>,
    ) -> Result<AutoFillResult> {
        let photo = photo.map(str::trim).filter(|p| !p.is_empty());

        if description.trim().is_empty() && photo.is_none() {
            return Err(OrchestrationError::ValidationError(
                "Please provide a description or a photo for the AI to work.".to_string(),
            ));
        }

        let request = AutoFillRequest {
            description: description.to_string(),
            photo_data_uri: photo.map(str::to_string),
        };

        self.run::<AutoFillFlow>(&request).await
    }

    /// Score one claim for fraud, on demand by an administrator
    pub async fn detect_suspicious_claims(
        &self,
        claim_details: &str,
        user_behavior: &str,
    ) -> Result<FraudCheckResult> {
        let request = FraudCheckRequest {
            claim_details: claim_details.to_string(),
            user_behavior: user_behavior.to_string(),
        };

        let result = self.run::<FraudDetectionFlow>(&request).await?;
        info!(
            suspicious = result.is_suspicious,
            fraud_score = result.fraud_score,
            "Fraud check completed"
        );
        Ok(result)
    }

    /// Compare a lost and a found item; both photos are mandatory
    pub async fn verify_item_match(
        &self,
        lost_description: &str,
        found_description: &str,
        lost_photo: &str,
        found_photo: &str,
    ) -> Result<VerificationResult> {
        let request = VerificationRequest {
            lost_item_description: lost_description.to_string(),
            found_item_description: found_description.to_string(),
            lost_item_photo_data_uri: lost_photo.to_string(),
            found_item_photo_data_uri: found_photo.to_string(),
        };

        let result = self.run::<MatchVerificationFlow>(&request).await?;
        info!(
            match_score = result.match_score,
            good_match = result.is_good_match(),
            "Match verification completed"
        );
        Ok(result)
    }

    pub async fn get_smart_search_suggestions(&self, query: &str) -> Result<SearchSuggestionsResult> {
        let request = SearchSuggestionsRequest {
            query: query.to_string(),
        };

        self.run::<SearchSuggestionsFlow>(&request).await
    }

    async fn run<F: Flow>(&self, input: &F::Input) -> Result<F::Output> {
        self.invoker.invoke::<F>(input).await.map_err(|e| {
            warn!(flow = F::NAME, kind = e.kind(), error = %e, "Flow failed");
            e
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::{StubCapability, StubReply};
    use crate::media::MediaRef;
    use crate::repository::InMemoryRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// Resolves every reference to a tiny image, except ones containing "missing"
    pub struct FixtureImages;

    #[async_trait]
    impl ImageResolver for FixtureImages {
        async fn resolve(&self, reference: &str) -> Result<MediaRef> {
            if reference.contains("missing") {
                Err(OrchestrationError::image_unavailable(reference, "HTTP 404"))
            } else {
                Ok(MediaRef::from_bytes("image/png", reference.as_bytes()))
            }
        }
    }

    pub fn orchestrator_with(stub: Arc<StubCapability>) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            FlowInvoker::new(stub),
            Arc::new(InMemoryRepository::demo()),
            Arc::new(FixtureImages),
        )
    }

    #[tokio::test]
    async fn test_auto_fill_returns_reply_unmodified() {
        let reply = json!({
            "itemCategory": "Accessories",
            "itemColor": "Black",
            "itemLocation": "Unknown",
            "additionalDetails": "Has a scratch"
        });
        let stub = Arc::new(
            StubCapability::new().with_reply("AutoFillResult", StubReply::Value(reply.clone())),
        );
        let orchestrator = orchestrator_with(stub);

        let result = orchestrator
            .auto_fill_form_details("A black leather wallet with a scratch", None)
            .await
            .unwrap();

        assert_eq!(serde_json::to_value(&result).unwrap(), reply);
        for field in [
            &result.item_category,
            &result.item_color,
            &result.item_location,
            &result.additional_details,
        ] {
            assert!(!field.is_empty());
        }
    }

    #[tokio::test]
    async fn test_auto_fill_needs_description_or_photo() {
        let stub = Arc::new(StubCapability::demo());
        let orchestrator = orchestrator_with(stub.clone());

        let err = orchestrator.auto_fill_form_details("   ", Some("")).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(stub.call_count(), 0);

        assert_ok!(orchestrator.auto_fill_form_details("", Some(PIXEL)).await);
        assert_eq!(stub.prompts_for("AutoFillResult")[0].media().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_items_are_a_good_match() {
        let stub = Arc::new(StubCapability::new().with_reply(
            "VerificationResult",
            StubReply::Value(json!({
                "matchScore": 0.95,
                "reason": "Descriptions and photos match closely"
            })),
        ));
        let orchestrator = orchestrator_with(stub);

        let result = orchestrator
            .verify_item_match("Black phone", "Black phone", PIXEL, PIXEL)
            .await
            .unwrap();

        assert!(result.is_good_match());
        assert_eq!(result.percentage(), 95);
        assert_eq!(result.reason, "Descriptions and photos match closely");
    }

    #[tokio::test]
    async fn test_fraud_check_network_failure_propagates() {
        let stub = Arc::new(StubCapability::new().with_reply(
            "FraudCheckResult",
            StubReply::Unavailable("connection refused".into()),
        ));
        let orchestrator = orchestrator_with(stub);

        let err = assert_err!(
            orchestrator
                .detect_suspicious_claims("Claim for item", "Normal usage")
                .await
        );
        assert!(matches!(err, OrchestrationError::InferenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fraud_result_is_typed() {
        let stub = Arc::new(StubCapability::new().with_reply(
            "FraudCheckResult",
            StubReply::Value(json!({ "isSuspicious": true, "fraudScore": 0.87, "reason": "Three claims in a day" })),
        ));
        let orchestrator = orchestrator_with(stub);

        let result = orchestrator.detect_suspicious_claims("claim", "behaviour").await.unwrap();
        assert!(result.is_suspicious);
        assert!((0.0..=1.0).contains(&result.fraud_score));
        assert_eq!(result.percentage(), 87);
    }

    #[tokio::test]
    async fn test_suggestions_are_stable_for_a_deterministic_capability() {
        let orchestrator = orchestrator_with(Arc::new(StubCapability::demo()));

        let first = orchestrator.get_smart_search_suggestions("wallet").await.unwrap();
        let second = orchestrator.get_smart_search_suggestions("wallet").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.suggestions[0], "wallet in Library");
    }

    #[tokio::test]
    async fn test_from_config_picks_gemini_when_a_key_is_set() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"suggestions\": [\"red umbrella\"]}" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig {
            gemini_api_key: Some("k".into()),
            gemini_base_url: server.uri(),
            ..AppConfig::default()
        };
        let orchestrator =
            WorkflowOrchestrator::from_config(&config, Arc::new(InMemoryRepository::demo())).unwrap();

        let result = orchestrator.get_smart_search_suggestions("umbrella").await.unwrap();
        assert_eq!(result.suggestions, vec!["red umbrella".to_string()]);

        let offline = WorkflowOrchestrator::from_config(&AppConfig::default(), Arc::new(InMemoryRepository::demo()))
            .unwrap();
        assert_ok!(offline.get_smart_search_suggestions("wallet").await);
    }
}
