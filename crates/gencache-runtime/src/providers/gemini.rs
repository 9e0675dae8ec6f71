//! Google Gemini provider implementation.
//!
//! Calls the `generateContent` endpoint. Models of the `gemini-2` family are
//! served from `v1beta`, everything else from `v1`.
//!
//! ## Security
//!
//! The API key travels as a query parameter and is held in an
//! [`ApiCredential`] until the moment the request is built.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{parse_retry_delay, secrets::ApiCredential, GenerationRequest, ProviderError, TextProvider};

/// Default API host.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

/// Google Gemini provider.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: GEMINI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Endpoint for `model`, without the key parameter.
    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url,
            api_version_for(model),
            model
        )
    }
}

/// API version serving `model`.
pub fn api_version_for(model: &str) -> &'static str {
    if model.starts_with("gemini-2") {
        "v1beta"
    } else {
        "v1"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiInstruction<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiInstruction<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Suggested retry interval from a Gemini error body.
///
/// Looks for a `RetryInfo` entry in `error.details[]`.
fn retry_hint(body: &JsonValue) -> Option<std::time::Duration> {
    body.pointer("/error/details")?
        .as_array()?
        .iter()
        .filter(|detail| detail.get("@type").and_then(JsonValue::as_str) == Some(RETRY_INFO_TYPE))
        .find_map(|detail| detail.get("retryDelay")?.as_str().and_then(parse_retry_delay))
}

fn error_message(body: &JsonValue, raw: &str) -> String {
    body.pointer("/error/message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw.chars().take(300).collect())
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = GeminiRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiPart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: request.system.as_deref().map(|text| GeminiInstruction {
                parts: [GeminiPart { text }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
            },
        };

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .query(&[("key", self.credential.expose())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.without_url().to_string()))?;

        if !status.is_success() {
            let parsed: JsonValue = serde_json::from_str(&text).unwrap_or(JsonValue::Null);
            let message = error_message(&parsed, &text);
            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited {
                    retry_after: retry_hint(&parsed),
                    message,
                },
                code @ (401 | 403) => ProviderError::Auth(code),
                code => ProviderError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed.into_text().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn api_version(&self, model: &str) -> Option<String> {
        Some(api_version_for(model).to_string())
    }
}
