//! Text-generation provider abstractions for gencache-runtime.
//!
//! This module defines the trait every upstream provider implements and
//! includes HTTP implementations for Google Gemini and OpenAI.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod descriptor;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "openai")]
mod openai;

pub use descriptor::{ProviderDescriptor, ProviderKind};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::GeminiProvider;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

/// Errors from text-generation providers.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The request never produced a response
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Authentication failed ({0})")]
    Auth(u16),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned no usable text")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same call can help.
    ///
    /// Timeouts, network failures and 5xx (or status 0) responses are
    /// retryable. Every other rejection is final for this call.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Http(_) => true,
            ProviderError::Api { status, .. } => *status >= 500 || *status == 0,
            _ => false,
        }
    }

    /// HTTP-like status for diagnostics. `0` means no response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Http(_) | ProviderError::Timeout(_) => Some(0),
            ProviderError::RateLimited { .. } => Some(429),
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Auth(status) => Some(*status),
            ProviderError::Parse(_) | ProviderError::EmptyResponse => Some(200),
        }
    }

    /// Suggested retry interval, only present on rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier
    pub model: String,

    /// User prompt
    pub prompt: String,

    /// Optional system instruction
    pub system: Option<String>,

    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Provider abstraction allows swapping generation backends.
///
/// This is the only network boundary in the engine. Implementations map
/// transport and status failures onto [`ProviderError`]; timeouts and
/// retries are applied by the caller.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate raw text for the request.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Provider name, used as the backoff and metrics key.
    fn name(&self) -> &str;

    /// API version the model is served from, if the provider has one.
    fn api_version(&self, _model: &str) -> Option<String> {
        None
    }
}

/// Parse a suggested retry interval such as `"44s"`, `"1.5s"` or `"20"`.
///
/// Zero or unparseable values yield `None`.
pub fn parse_retry_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let parsed = raw
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
        .or_else(|| {
            raw.strip_suffix('s')?
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| Duration::from_secs(secs.floor() as u64))
        })
        .or_else(|| humantime::parse_duration(raw).ok());
    parsed.filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ProviderError::Http("connection reset".into()).is_retryable());
        assert!(ProviderError::Api { status: 503, message: String::new() }.is_retryable());
        assert!(ProviderError::Api { status: 0, message: String::new() }.is_retryable());

        assert!(!ProviderError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(!ProviderError::Auth(401).is_retryable());
        assert!(!ProviderError::RateLimited { retry_after: None, message: String::new() }.is_retryable());
        assert!(!ProviderError::Parse("bad".into()).is_retryable());
        assert!(!ProviderError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ProviderError::Timeout(Duration::from_secs(1)).status_code(), Some(0));
        assert_eq!(
            ProviderError::RateLimited { retry_after: None, message: String::new() }.status_code(),
            Some(429)
        );
    }

    #[test]
    fn test_parse_retry_delay() {
        assert_eq!(parse_retry_delay("44s"), Some(Duration::from_secs(44)));
        assert_eq!(parse_retry_delay("20"), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_delay("2.9s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_delay("0s"), None);
        assert_eq!(parse_retry_delay("0.4s"), None);
        assert_eq!(parse_retry_delay("soon"), None);
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("m", "p")
            .with_system("s")
            .with_temperature(0.3);
        assert_eq!(request.system.as_deref(), Some("s"));
        assert_eq!(request.temperature, 0.3);
    }
}
