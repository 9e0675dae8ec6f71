//! Composition root.
//!
//! An [`Engine`] owns one content orchestrator and one idea orchestrator
//! built over the same provider chain, backoff tracker and metrics sink, so a
//! rate limit observed by either operation suppresses the provider for both.

use std::sync::Arc;

use gencache_core::{GenerationResult, IdeaList};
use tracing::info;

use crate::config::{ConfigError, EngineConfig};
use crate::content::ContentOrchestrator;
use crate::ideas::IdeaOrchestrator;
use crate::metrics::MetricsSink;
use crate::providers::ProviderDescriptor;
use crate::resilience::{ProviderBackoffTracker, ProviderChain, ProviderDiagnostics};
use crate::store::{IdeaStore, InMemoryIdeaStore};

pub struct Engine {
    content: ContentOrchestrator,
    ideas: IdeaOrchestrator,
    tracker: Arc<ProviderBackoffTracker>,
}

impl Engine {
    /// Build both orchestrators over shared state.
    pub fn new(
        config: EngineConfig,
        chain: ProviderChain,
        store: Arc<dyn IdeaStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, ConfigError> {
        let tracker = Arc::new(ProviderBackoffTracker::new());

        let content = ContentOrchestrator::builder()
            .config(config.clone())
            .chain(chain.clone())
            .tracker(tracker.clone())
            .metrics(metrics.clone())
            .build()?;
        let ideas = IdeaOrchestrator::builder()
            .config(config)
            .chain(chain)
            .tracker(tracker.clone())
            .store(store)
            .metrics(metrics)
            .build()?;

        Ok(Self {
            content,
            ideas,
            tracker,
        })
    }

    /// Configuration and credentials from the process environment, with a
    /// process-local idea store.
    pub fn from_env(metrics: Arc<dyn MetricsSink>) -> Result<Self, ConfigError> {
        let config = EngineConfig::from_env();
        let chain = ProviderChain::from_descriptors(ProviderDescriptor::from_env(&config));
        info!(
            providers = ?chain.routes().iter().map(|r| r.provider_name()).collect::<Vec<_>>(),
            "Provider chain configured"
        );
        Self::new(config, chain, Arc::new(InMemoryIdeaStore::new()), metrics)
    }

    pub fn content(&self) -> &ContentOrchestrator {
        &self.content
    }

    pub fn ideas(&self) -> &IdeaOrchestrator {
        &self.ideas
    }

    pub fn tracker(&self) -> &Arc<ProviderBackoffTracker> {
        &self.tracker
    }

    pub async fn generate(&self, query: &str, locale: &str) -> GenerationResult {
        self.content.generate(query, locale).await
    }

    pub async fn generate_ideas(&self, query: &str, locale: &str) -> IdeaList {
        self.ideas.generate_ideas(query, locale).await
    }

    /// Backoff state of every configured provider.
    pub fn diagnostics(&self) -> Vec<ProviderDiagnostics> {
        self.content.diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{names, InMemoryMetrics};

    #[tokio::test]
    async fn test_engine_without_providers() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let engine = Engine::new(
            EngineConfig::default(),
            ProviderChain::new(),
            Arc::new(InMemoryIdeaStore::new()),
            metrics.clone(),
        )
        .unwrap();

        let article = engine.generate("rust", "en_US").await;
        assert!(article.html.contains("placeholder"));
        assert!(article.has_meta());

        let ideas = engine.generate_ideas("rust", "en_US").await;
        assert_eq!(ideas.len(), 6);

        assert!(engine.diagnostics().is_empty());
        assert_eq!(metrics.counter(names::CONTENT_INVOCATIONS), 1);
        assert_eq!(metrics.counter(names::IDEAS_INVOCATIONS), 1);
        assert_eq!(metrics.counter(names::IDEAS_ERRORS), 0);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = EngineConfig::default();
        config.ideas_cache.max_entries = 0;
        let result = Engine::new(
            config,
            ProviderChain::new(),
            Arc::new(InMemoryIdeaStore::new()),
            Arc::new(InMemoryMetrics::new()),
        );
        assert!(result.is_err());
    }
}
