//! OpenAI chat-completions provider implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{parse_retry_delay, secrets::ApiCredential, GenerationRequest, ProviderError, TextProvider};

/// Default API base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider.
pub struct OpenAiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: OPENAI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        Self {
            model: &request.model,
            messages,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.content
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&ChatRequest::from_request(request))
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_delay);
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<JsonValue>(&text)
                .ok()
                .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
                .unwrap_or_else(|| text.chars().take(300).collect());
            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited {
                    retry_after,
                    message,
                },
                code @ (401 | 403) => ProviderError::Auth(code),
                code => ProviderError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed.into_text().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
