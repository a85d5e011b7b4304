//! Flows: named request/response contracts backed by one inference call
//!
//! The invoker runs every flow the same way:
//! VALIDATE REQUEST → RENDER PROMPT → INFER (with timeout) → VALIDATE REPLY

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::OrchestrationError;
use crate::inference::InferenceCapability;
use crate::prompts::PromptTemplate;
use crate::schema::ShapeDeclaration;
use crate::Result;

pub mod auto_fill;
pub mod fraud_detection;
pub mod match_verification;
pub mod search_suggestions;

pub use auto_fill::AutoFillFlow;
pub use fraud_detection::FraudDetectionFlow;
pub use match_verification::MatchVerificationFlow;
pub use search_suggestions::SearchSuggestionsFlow;

/// Default ceiling on a single inference call
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// A declarative flow definition
pub trait Flow {
    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned + Send;

    const NAME: &'static str;

    fn input_shape() -> &'static ShapeDeclaration;
    fn output_shape() -> &'static ShapeDeclaration;
    fn template() -> &'static PromptTemplate;
}

/// Runs flows against an inference capability
#[derive(Clone)]
pub struct FlowInvoker {
    capability: Arc<dyn InferenceCapability>,
    timeout: Duration,
}

impl FlowInvoker {
    pub fn new(capability: Arc<dyn InferenceCapability>) -> Self {
        Self {
            capability,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn invoke<F: Flow>(&self, input: &F::Input) -> Result<F::Output> {
        let start = Instant::now();

        let request = serde_json::to_value(input)?;
        F::input_shape()
            .validate(&request)
            .map_err(|v| OrchestrationError::ValidationError(v.to_string()))?;

        let prompt = F::template().render(&request)?;
        debug!(
            flow = F::NAME,
            media_parts = prompt.media().len(),
            "Rendered prompt"
        );

        let reply = tokio::time::timeout(
            self.timeout,
            self.capability.generate(&prompt, F::output_shape()),
        )
        .await
        .map_err(|_| {
            warn!(flow = F::NAME, timeout_secs = self.timeout.as_secs(), "Inference timed out");
            OrchestrationError::TimedOut(self.timeout.as_secs())
        })??;

        let output = F::output_shape().conform(reply).map_err(|v| {
            warn!(flow = F::NAME, violation = %v, "Inference reply rejected");
            OrchestrationError::ResponseMalformed(v.to_string())
        })?;

        info!(
            flow = F::NAME,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Flow completed"
        );

        Ok(output)
    }
}
