//! Runtime configuration read from the environment (`.env` is loaded by the binaries)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::flows::DEFAULT_INFERENCE_TIMEOUT;
use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::session::{DEFAULT_DEBOUNCE, DEFAULT_MIN_QUERY_LEN};
use crate::Result;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// No key means the stub capability is used
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub port: u16,
    pub inference_timeout: Duration,
    pub image_fetch_timeout: Duration,
    pub suggestion_debounce: Duration,
    pub suggestion_min_query_len: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
            image_fetch_timeout: DEFAULT_IMAGE_FETCH_TIMEOUT,
            suggestion_debounce: DEFAULT_DEBOUNCE,
            suggestion_min_query_len: DEFAULT_MIN_QUERY_LEN,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            port: parse(get("PORT").or_else(|| get("API_PORT")), "PORT", defaults.port)?,
            inference_timeout: Duration::from_secs(parse(
                get("INFERENCE_TIMEOUT_SECS"),
                "INFERENCE_TIMEOUT_SECS",
                defaults.inference_timeout.as_secs(),
            )?),
            image_fetch_timeout: Duration::from_secs(parse(
                get("IMAGE_FETCH_TIMEOUT_SECS"),
                "IMAGE_FETCH_TIMEOUT_SECS",
                defaults.image_fetch_timeout.as_secs(),
            )?),
            suggestion_debounce: Duration::from_millis(parse(
                get("SUGGESTION_DEBOUNCE_MS"),
                "SUGGESTION_DEBOUNCE_MS",
                defaults.suggestion_debounce.as_millis() as u64,
            )?),
            suggestion_min_query_len: parse(
                get("SUGGESTION_MIN_QUERY_LEN"),
                "SUGGESTION_MIN_QUERY_LEN",
                defaults.suggestion_min_query_len,
            )?,
        })
    }

    pub fn uses_stub(&self) -> bool {
        self.gemini_api_key.is_none()
    }
}

fn parse<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            OrchestrationError::ConfigError(format!("{} has an invalid value '{}'", key, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.uses_stub());
        assert_eq!(config.port, 8080);
        assert_eq!(config.inference_timeout, Duration::from_secs(30));
        assert_eq!(config.suggestion_debounce, Duration::from_millis(300));
        assert_eq!(config.suggestion_min_query_len, 3);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GEMINI_API_KEY", "abc"),
            ("API_PORT", "9090"),
            ("INFERENCE_TIMEOUT_SECS", "5"),
            ("SUGGESTION_DEBOUNCE_MS", "150"),
        ])
        .unwrap();

        assert!(!config.uses_stub());
        assert_eq!(config.port, 9090);
        assert_eq!(config.inference_timeout, Duration::from_secs(5));
        assert_eq!(config.suggestion_debounce, Duration::from_millis(150));
    }

    #[test]
    fn test_port_takes_precedence_and_blank_key_means_stub() {
        let config = config(&[("PORT", "3000"), ("API_PORT", "9090"), ("GEMINI_API_KEY", "  ")]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.uses_stub());
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = config(&[("INFERENCE_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(err.kind(), "config_error");
        assert!(err.to_string().contains("INFERENCE_TIMEOUT_SECS"));
    }
}
