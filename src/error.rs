//! Error types for the lost & found orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Flow Contract Errors
    // =============================

    /// Request failed its shape check (or violated a form rule)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// External capability unreachable or errored
    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    /// Capability replied, but the reply does not fit the output shape
    #[error("Malformed inference response: {0}")]
    ResponseMalformed(String),

    #[error("Inference timed out after {0}s")]
    TimedOut(u64),

    #[error("Image unavailable for {reference}: {reason}")]
    ImageUnavailable { reference: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // =============================
    // Workflow Errors
    // =============================

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Superseded by request #{0}")]
    Superseded(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl OrchestrationError {
    /// Stable machine-readable kind, used in operator logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::InferenceUnavailable(_) => "inference_unavailable",
            Self::ResponseMalformed(_) => "response_malformed",
            Self::TimedOut(_) => "timed_out",
            Self::ImageUnavailable { .. } => "image_unavailable",
            Self::NotFound(_) => "not_found",
            Self::TemplateError(_) => "template_error",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Superseded(_) => "superseded",
            Self::ConfigError(_) => "config_error",
            Self::SerializationError(_) => "serialization_error",
            Self::HttpError(_) => "http_error",
        }
    }

    pub fn image_unavailable(reference: &str, reason: impl Into<String>) -> Self {
        Self::ImageUnavailable {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}
