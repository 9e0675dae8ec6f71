//! Data-driven provider selection.
//!
//! Each known provider is described by its credential, model list and
//! endpoint. Descriptors are evaluated in a fixed priority order; a provider
//! without a credential simply produces no descriptor.

use tracing::debug;

use super::secrets::ApiCredential;
use crate::config::{EngineConfig, ProviderSettings};
use crate::resilience::{ProviderChain, ProviderRoute};

/// Built-in provider kinds, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Evaluation order for descriptors.
    pub const PRIORITY: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Environment variable holding the credential.
    pub fn credential_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn credential_name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Google API key",
            ProviderKind::OpenAi => "OpenAI API key",
        }
    }

    fn settings<'a>(&self, config: &'a EngineConfig) -> &'a ProviderSettings {
        match self {
            ProviderKind::Gemini => &config.gemini,
            ProviderKind::OpenAi => &config.openai,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured provider: credential present, models known.
#[derive(Debug)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    pub credential: ApiCredential,
    pub model: String,
    pub fallback_models: Vec<String>,
    /// Base URL override
    pub endpoint: Option<String>,
}

impl ProviderDescriptor {
    /// Descriptors for every provider with a credential in the environment.
    pub fn from_env(config: &EngineConfig) -> Vec<Self> {
        Self::from_lookup(config, |key| std::env::var(key).ok())
    }

    /// Descriptors for every provider whose credential `lookup` returns,
    /// in [`ProviderKind::PRIORITY`] order.
    pub fn from_lookup<F>(config: &EngineConfig, lookup: F) -> Vec<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        ProviderKind::PRIORITY
            .iter()
            .filter_map(|kind| {
                let credential =
                    ApiCredential::from_lookup(&lookup, kind.credential_env(), kind.credential_name());
                if credential.is_none() {
                    debug!(provider = %kind, "No credential configured");
                }
                let settings = kind.settings(config);
                credential.map(|credential| Self {
                    kind: *kind,
                    credential,
                    model: settings.model.clone(),
                    fallback_models: settings.fallback_models.clone(),
                    endpoint: settings.endpoint.clone(),
                })
            })
            .collect()
    }

    /// Build the HTTP provider and its route.
    ///
    /// Returns `None` when the provider's cargo feature is disabled.
    pub fn into_route(self) -> Option<ProviderRoute> {
        match self.kind {
            ProviderKind::Gemini => self.gemini_route(),
            ProviderKind::OpenAi => self.openai_route(),
        }
    }

    #[cfg(feature = "gemini")]
    fn gemini_route(self) -> Option<ProviderRoute> {
        let mut provider = super::GeminiProvider::new(self.credential);
        if let Some(endpoint) = self.endpoint {
            provider = provider.with_base_url(endpoint);
        }
        Some(ProviderRoute::new(std::sync::Arc::new(provider), self.model, self.fallback_models))
    }

    #[cfg(not(feature = "gemini"))]
    fn gemini_route(self) -> Option<ProviderRoute> {
        tracing::warn!(provider = %self.kind, "Credential present but the 'gemini' feature is disabled");
        None
    }

    #[cfg(feature = "openai")]
    fn openai_route(self) -> Option<ProviderRoute> {
        let mut provider = super::OpenAiProvider::new(self.credential);
        if let Some(endpoint) = self.endpoint {
            provider = provider.with_base_url(endpoint);
        }
        Some(ProviderRoute::new(std::sync::Arc::new(provider), self.model, self.fallback_models))
    }

    #[cfg(not(feature = "openai"))]
    fn openai_route(self) -> Option<ProviderRoute> {
        tracing::warn!(provider = %self.kind, "Credential present but the 'openai' feature is disabled");
        None
    }
}

impl ProviderChain {
    /// Chain of routes for the given descriptors, preserving their order.
    pub fn from_descriptors(descriptors: Vec<ProviderDescriptor>) -> Self {
        descriptors
            .into_iter()
            .filter_map(ProviderDescriptor::into_route)
            .fold(ProviderChain::new(), ProviderChain::add)
    }
}
