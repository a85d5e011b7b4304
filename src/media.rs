//! Inline media references and image resolution
//!
//! Photos travel to the inference capability as base64 data URIs.
//! Remote item images are resolved into that form first; a failed
//! resolution is an error, never a blank stand-in.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::OrchestrationError;
use crate::Result;

/// A decoded `data:<mime>;base64,<payload>` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub mime_type: String,
    /// Base64 payload, as it appears in the URI
    pub data: String,
}

impl MediaRef {
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("data:").ok_or_else(|| {
            OrchestrationError::ValidationError("media reference must start with 'data:'".to_string())
        })?;

        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            OrchestrationError::ValidationError("media reference has no payload".to_string())
        })?;

        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            OrchestrationError::ValidationError("media reference must be base64 encoded".to_string())
        })?;

        if !mime_type.contains('/') {
            return Err(OrchestrationError::ValidationError(format!(
                "invalid MIME type '{}'",
                mime_type
            )));
        }

        if payload.is_empty() || STANDARD.decode(payload).is_err() {
            return Err(OrchestrationError::ValidationError(
                "media payload is not valid base64".to_string(),
            ));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Turns an item image reference into an embeddable data URI
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<MediaRef>;
}

/// Fetches remote images over HTTP; data URIs pass straight through
pub struct HttpImageResolver {
    client: Client,
}

impl HttpImageResolver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageResolver for HttpImageResolver {
    async fn resolve(&self, reference: &str) -> Result<MediaRef> {
        if reference.starts_with("data:") {
            return MediaRef::parse(reference)
                .map_err(|e| OrchestrationError::image_unavailable(reference, e.to_string()));
        }

        debug!(reference, "Fetching item image");

        let response = self.client.get(reference).send().await.map_err(|e| {
            warn!(reference, error = %e, "Image fetch failed");
            OrchestrationError::image_unavailable(reference, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestrationError::image_unavailable(
                reference,
                format!("HTTP {}", status),
            ));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_default();

        if !mime_type.starts_with("image/") {
            return Err(OrchestrationError::image_unavailable(
                reference,
                format!("unexpected content type '{}'", mime_type),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OrchestrationError::image_unavailable(reference, e.to_string()))?;

        if bytes.is_empty() {
            return Err(OrchestrationError::image_unavailable(reference, "empty body"));
        }

        Ok(MediaRef::from_bytes(&mime_type, &bytes))
    }
}

/// Resolves from a fixed set of registered images, for offline runs.
/// Unregistered references are unavailable.
#[derive(Debug, Default)]
pub struct StaticImageResolver {
    images: HashMap<String, MediaRef>,
}

impl StaticImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, reference: &str, media: MediaRef) -> Self {
        self.images.insert(reference.to_string(), media);
        self
    }
}

#[async_trait]
impl ImageResolver for StaticImageResolver {
    async fn resolve(&self, reference: &str) -> Result<MediaRef> {
        if reference.starts_with("data:") {
            return MediaRef::parse(reference)
                .map_err(|e| OrchestrationError::image_unavailable(reference, e.to_string()));
        }

        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| OrchestrationError::image_unavailable(reference, "not registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    #[test]
    fn test_parse_data_uri() {
        let media = MediaRef::parse(PIXEL).unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.to_data_uri(), PIXEL);
    }

    #[test]
    fn test_parse_rejects_non_data_references() {
        assert!(MediaRef::parse("https://picsum.photos/seed/1/400/300").is_err());
        assert!(MediaRef::parse("data:image/png,plain").is_err());
        assert!(MediaRef::parse("data:png;base64,AAAA").is_err());
        assert!(MediaRef::parse("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_from_bytes_round_trips_through_uri() {
        let media = MediaRef::from_bytes("image/jpeg", b"\xff\xd8\xff");
        let parsed = MediaRef::parse(&media.to_data_uri()).unwrap();
        assert_eq!(parsed, media);
    }

    #[tokio::test]
    async fn test_resolver_fetches_and_encodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallet.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"\xff\xd8\xff\xe0".to_vec(), "image/jpeg"),
            )
            .mount(&server)
            .await;

        let resolver = HttpImageResolver::new(Duration::from_secs(5)).unwrap();
        let media = resolver
            .resolve(&format!("{}/wallet.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.data, STANDARD.encode(b"\xff\xd8\xff\xe0"));
    }

    #[tokio::test]
    async fn test_resolver_surfaces_missing_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = HttpImageResolver::new(Duration::from_secs(5)).unwrap();
        let err = resolver
            .resolve(&format!("{}/gone.jpg", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "image_unavailable");
    }

    #[tokio::test]
    async fn test_resolver_rejects_non_image_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let resolver = HttpImageResolver::new(Duration::from_secs(5)).unwrap();
        let err = resolver
            .resolve(&format!("{}/page", server.uri()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("text/html"));
    }

    #[tokio::test]
    async fn test_data_uri_passes_through_without_network() {
        let resolver = HttpImageResolver::new(Duration::from_secs(1)).unwrap();
        let media = resolver.resolve(PIXEL).await.unwrap();
        assert_eq!(media.to_data_uri(), PIXEL);
    }

    #[tokio::test]
    async fn test_static_resolver_only_knows_registered_images() {
        let pixel = MediaRef::parse(PIXEL).unwrap();
        let resolver = StaticImageResolver::new().with_image("https://img/1", pixel.clone());

        assert_eq!(resolver.resolve("https://img/1").await.unwrap(), pixel);
        assert_eq!(resolver.resolve(PIXEL).await.unwrap(), pixel);

        let err = resolver.resolve("https://img/2").await.unwrap_err();
        assert_eq!(err.kind(), "image_unavailable");
    }
}
