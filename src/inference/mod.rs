//! External inference capability
//!
//! The capability receives a rendered prompt plus the declared output shape
//! and returns a raw JSON value. Conformance to the shape is checked by the
//! caller, never assumed.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::prompts::RenderedPrompt;
use crate::schema::ShapeDeclaration;
use crate::Result;

pub mod gemini;
pub use gemini::GeminiCapability;

/// Trait for the opaque model service (LLM controlled)
#[async_trait]
pub trait InferenceCapability: Send + Sync {
    async fn generate(&self, prompt: &RenderedPrompt, output: &ShapeDeclaration) -> Result<Value>;
}

/// Canned behaviour for one output shape
#[derive(Debug, Clone)]
pub enum StubReply {
    Value(Value),
    Unavailable(String),
    Delayed(Duration, Box<StubReply>),
}

type Responder = Arc<dyn Fn(&RenderedPrompt) -> StubReply + Send + Sync>;

/// Deterministic capability for development & testing
/// Keeps the system functional without a model endpoint
#[derive(Default)]
pub struct StubCapability {
    responders: HashMap<String, Responder>,
    calls: Mutex<Vec<(String, RenderedPrompt)>>,
}

impl StubCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same reply for every call producing `shape`
    pub fn with_reply(self, shape: &str, reply: StubReply) -> Self {
        self.with_responder(shape, move |_| reply.clone())
    }

    pub fn with_responder<F>(mut self, shape: &str, responder: F) -> Self
    where
        F: Fn(&RenderedPrompt) -> StubReply + Send + Sync + 'static,
    {
        self.responders.insert(shape.to_string(), Arc::new(responder));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn prompts_for(&self, shape: &str) -> Vec<RenderedPrompt> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|(name, _)| name == shape)
                    .map(|(_, prompt)| prompt.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Plausible replies for all four flows, used by the offline binaries
    pub fn demo() -> Self {
        Self::new()
            .with_reply(
                "AutoFillResult",
                StubReply::Value(json!({
                    "itemCategory": "Accessories",
                    "itemColor": "Black",
                    "itemLocation": "Unknown",
                    "additionalDetails": "Has a scratch"
                })),
            )
            .with_reply(
                "FraudCheckResult",
                StubReply::Value(json!({
                    "isSuspicious": false,
                    "fraudScore": 0.12,
                    "reason": "Proof is specific and the claimant has a short, consistent history."
                })),
            )
            .with_reply(
                "VerificationResult",
                StubReply::Value(json!({
                    "matchScore": 0.82,
                    "reason": "Descriptions agree on colour, material and the scratch on the front."
                })),
            )
            .with_responder("SearchSuggestionsResult", |prompt| {
                let query = prompt
                    .text()
                    .lines()
                    .find_map(|line| line.strip_prefix("Search query: ").map(str::to_string))
                    .unwrap_or_default();
                StubReply::Value(json!({
                    "suggestions": [
                        format!("{} in Library", query),
                        format!("{} in Cafeteria", query),
                        format!("black {}", query),
                    ]
                }))
            })
    }
}

#[async_trait]
impl InferenceCapability for StubCapability {
    async fn generate(&self, prompt: &RenderedPrompt, output: &ShapeDeclaration) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((output.name.to_string(), prompt.clone()));
        }

        let responder = self.responders.get(output.name).cloned().ok_or_else(|| {
            OrchestrationError::InferenceUnavailable(format!("no stub reply for {}", output.name))
        })?;

        let mut reply = responder(prompt);
        loop {
            match reply {
                StubReply::Value(value) => return Ok(value),
                StubReply::Unavailable(message) => {
                    return Err(OrchestrationError::InferenceUnavailable(message))
                }
                StubReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
