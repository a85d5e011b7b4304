//! Gemini-backed inference capability
//!
//! Sends rendered prompts (text + inline media) in JSON response mode,
//! with the output shape attached as the response schema.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OrchestrationError;
use crate::gemini::{Blob, GeminiClient, Part};
use crate::inference::InferenceCapability;
use crate::prompts::{PromptPart, RenderedPrompt};
use crate::schema::ShapeDeclaration;
use crate::Result;

pub struct GeminiCapability {
    client: GeminiClient,
}

impl GeminiCapability {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InferenceCapability for GeminiCapability {
    async fn generate(&self, prompt: &RenderedPrompt, output: &ShapeDeclaration) -> Result<Value> {
        let parts = prompt.parts.iter().map(to_part).collect();
        let system_prompt = build_system_prompt(output);

        let response = self
            .client
            .generate(parts, &system_prompt, Some(output.to_response_schema()))
            .await?;

        parse_json_reply(&response)
    }
}

fn to_part(part: &PromptPart) -> Part {
    match part {
        PromptPart::Text(text) => Part::Text { text: text.clone() },
        PromptPart::Media(media) => Part::InlineData {
            inline_data: Blob {
                mime_type: media.mime_type.clone(),
                data: media.data.clone(),
            },
        },
    }
}

/// Build system prompt listing the fields the reply must carry
fn build_system_prompt(output: &ShapeDeclaration) -> String {
    format!(
        r#"You assist the staff and users of a campus lost & found service.

Rules:
- Return ONLY a valid JSON object
- No explanation text outside the JSON
- Scores are numbers between 0 and 1

Fields:
{}"#,
        output.describe()
    )
}

/// Parse the model's text reply as JSON, tolerating a markdown fence
pub fn parse_json_reply(response: &str) -> Result<Value> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        OrchestrationError::ResponseMalformed(format!(
            "Failed to parse model reply as JSON: {} | raw={}",
            e, response
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaRef;
    use crate::schema::{FieldKind, FieldShape};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_fenced_reply() {
        let value = parse_json_reply("```json\n{\"suggestions\": [\"black wallet\"]}\n```").unwrap();
        assert_eq!(value["suggestions"][0], "black wallet");
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_json_reply("The items look similar.").unwrap_err();
        assert_eq!(err.kind(), "response_malformed");
    }

    #[test]
    fn test_system_prompt_lists_fields() {
        let shape = ShapeDeclaration::new(
            "VerificationResult",
            vec![FieldShape::required("matchScore", FieldKind::UnitInterval, "How well the items match")],
        );
        let prompt = build_system_prompt(&shape);
        assert!(prompt.contains("- matchScore (number in [0, 1]): How well the items match"));
    }

    #[tokio::test]
    async fn test_media_parts_are_sent_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generation_config": { "response_mime_type": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"matchScore\": 0.4}" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            GeminiClient::with_endpoint("k".into(), server.uri(), "gemini-test".into()).unwrap();
        let capability = GeminiCapability::new(client);

        let prompt = RenderedPrompt {
            parts: vec![
                PromptPart::Text("Photo: ".into()),
                PromptPart::Media(MediaRef::from_bytes("image/png", b"png")),
            ],
        };
        let shape = ShapeDeclaration::new(
            "VerificationResult",
            vec![FieldShape::required("matchScore", FieldKind::UnitInterval, "score")],
        );

        let value = capability.generate(&prompt, &shape).await.unwrap();
        assert_eq!(value["matchScore"], 0.4);

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
    }
}
