//! Ordered provider/model fallback chain.

use std::sync::Arc;

use crate::providers::TextProvider;

/// One provider with the models to try on it, primary first.
#[derive(Clone)]
pub struct ProviderRoute {
    provider: Arc<dyn TextProvider>,
    models: Vec<String>,
}

impl ProviderRoute {
    /// Route trying `primary`, then each fallback model in order.
    ///
    /// Blank models and repeats of an earlier model are dropped.
    pub fn new(
        provider: Arc<dyn TextProvider>,
        primary: impl Into<String>,
        fallbacks: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut models: Vec<String> = Vec::new();
        for model in std::iter::once(primary.into()).chain(fallbacks) {
            let model = model.trim().to_string();
            if !model.is_empty() && !models.contains(&model) {
                models.push(model);
            }
        }
        Self { provider, models }
    }

    pub fn provider(&self) -> &Arc<dyn TextProvider> {
        &self.provider
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Models in try order. Empty only if every configured model was blank.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn primary_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRoute")
            .field("provider", &self.provider.name())
            .field("models", &self.models)
            .finish()
    }
}

/// Fallback chain - tried in order.
#[derive(Debug, Clone, Default)]
pub struct ProviderChain {
    routes: Vec<ProviderRoute>,
}

impl ProviderChain {
    /// Create a new, empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the end of the chain.
    pub fn add(mut self, route: ProviderRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// No provider is configured at all.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Get routes in order.
    pub fn routes(&self) -> &[ProviderRoute] {
        &self.routes
    }
}
