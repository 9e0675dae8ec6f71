//! Idea list orchestrator.
//!
//! Tier order: idea cache, persistent store, provider chain (primary model
//! of each route), then the deterministic default list. Provider and
//! default results are written through to both the cache and the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gencache_core::{default_ideas, idea_cache_key, parse_idea_list, IdeaList};
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::{ChainOutcome, Dispatcher, ModelScope};
use crate::metrics::{names, MetricsSink, NoopMetrics};
use crate::prompts::PromptKind;
use crate::providers::ProviderError;
use crate::resilience::{AttemptTimeouts, ProviderBackoffTracker, ProviderChain};
use crate::store::{IdeaStore, InMemoryIdeaStore};

/// Orchestrates idea list generation.
pub struct IdeaOrchestrator {
    dispatcher: Dispatcher,
    cache: TtlCache<IdeaList>,
    store: Arc<dyn IdeaStore>,
    metrics: Arc<dyn MetricsSink>,
    ideas_timeout: Duration,
}

impl IdeaOrchestrator {
    pub fn builder() -> IdeaOrchestratorBuilder {
        IdeaOrchestratorBuilder::new()
    }

    /// Ideas for `query` in `locale`. Always returns a non-empty list.
    pub async fn generate_ideas(&self, query: &str, locale: &str) -> IdeaList {
        let started = Instant::now();
        self.metrics.increment(names::IDEAS_INVOCATIONS);
        let key = idea_cache_key(query, locale);

        if let Some(cached) = self.cache.get(&key).filter(|list| !list.is_empty()) {
            debug!(query, locale, "Idea cache hit");
            self.metrics.increment(names::IDEAS_CACHE_HITS);
            self.record_elapsed(started);
            return cached;
        }

        if let Some(stored) = self.read_store(&key).await {
            debug!(query, locale, "Ideas served from store");
            self.cache.set(key, stored.clone());
            self.record_elapsed(started);
            return stored;
        }

        let outcome = if self.dispatcher.chain().is_empty() {
            ChainOutcome::Failed
        } else {
            self.dispatcher
                .run(
                    PromptKind::Ideas,
                    query,
                    locale,
                    ModelScope::Primary,
                    AttemptTimeouts::fixed(self.ideas_timeout),
                    accept_ideas,
                )
                .await
        };

        let ideas = match outcome {
            ChainOutcome::Generated(ideas) => ideas,
            other => {
                if !self.dispatcher.chain().is_empty() {
                    self.metrics.increment(names::IDEAS_ERRORS);
                }
                if let ChainOutcome::Suppressed { retry_in } = other {
                    warn!(query, locale, retry_in_secs = retry_in.as_secs(), "All providers suppressed");
                }
                debug!(query, locale, "Serving default ideas");
                default_ideas(query)
            }
        };

        self.cache.set(key.clone(), ideas.clone());
        if let Err(err) = self.store.upsert(&key, query, locale, &ideas.to_json()).await {
            warn!(query, locale, error = %err, "Idea store write failed");
        }
        self.record_elapsed(started);
        ideas
    }

    async fn read_store(&self, key: &str) -> Option<IdeaList> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match IdeaList::from_json(&raw) {
                Ok(list) if !list.is_empty() => Some(list),
                Ok(_) => None,
                Err(err) => {
                    warn!(key, error = %err, "Stored ideas are not valid JSON");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "Idea store read failed, generating");
                None
            }
        }
    }

    fn record_elapsed(&self, started: Instant) {
        self.metrics
            .record_duration(names::IDEAS_GENERATE_MS, started.elapsed().as_millis() as u64);
    }
}

fn accept_ideas(raw: &str) -> Result<IdeaList, ProviderError> {
    parse_idea_list(raw).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Builder for IdeaOrchestrator.
pub struct IdeaOrchestratorBuilder {
    config: EngineConfig,
    chain: ProviderChain,
    tracker: Option<Arc<ProviderBackoffTracker>>,
    store: Option<Arc<dyn IdeaStore>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl IdeaOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            chain: ProviderChain::new(),
            tracker: None,
            store: None,
            metrics: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chain(mut self, chain: ProviderChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn tracker(mut self, tracker: Arc<ProviderBackoffTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set the persistent store. Defaults to a process-local store.
    pub fn store(mut self, store: Arc<dyn IdeaStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<IdeaOrchestrator, ConfigError> {
        self.config.validate()?;
        let tracker = self.tracker.unwrap_or_default();

        Ok(IdeaOrchestrator {
            dispatcher: Dispatcher::new(self.chain, tracker, &self.config),
            cache: TtlCache::new(&self.config.ideas_cache),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryIdeaStore::new()) as Arc<dyn IdeaStore>),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(NoopMetrics) as Arc<dyn MetricsSink>),
            ideas_timeout: self.config.ideas_timeout,
        })
    }
}

impl Default for IdeaOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl IdeaStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn upsert(&self, _key: &str, _query: &str, _locale: &str, _items: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_accept_ideas() {
        assert!(accept_ideas(r#"[{"title": "a", "query": "b", "description": "c"}]"#).is_ok());
        assert!(matches!(accept_ideas("nope"), Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_store_hit_populates_cache() {
        let store = Arc::new(InMemoryIdeaStore::new());
        let stored = default_ideas("tea");
        store.upsert("en_US:tea", "tea", "en_US", &stored.to_json()).await.unwrap();

        let orchestrator = IdeaOrchestrator::builder().store(store.clone()).build().unwrap();
        assert_eq!(orchestrator.generate_ideas("Tea", "en_US").await, stored);
        assert_eq!(orchestrator.cache.get("en_US:tea"), Some(stored));
    }

    #[tokio::test]
    async fn test_broken_store_still_serves_defaults() {
        let orchestrator = IdeaOrchestrator::builder()
            .store(Arc::new(BrokenStore))
            .build()
            .unwrap();

        let ideas = orchestrator.generate_ideas("tea", "en_US").await;
        assert_eq!(ideas, default_ideas("tea"));
    }

    #[tokio::test]
    async fn test_invalid_stored_row_is_ignored() {
        let store = Arc::new(InMemoryIdeaStore::new());
        store.upsert("en_US:tea", "tea", "en_US", "not json").await.unwrap();

        let orchestrator = IdeaOrchestrator::builder().store(store.clone()).build().unwrap();
        let ideas = orchestrator.generate_ideas("tea", "en_US").await;

        assert_eq!(ideas.len(), 6);
        assert_eq!(store.get("en_US:tea").await.unwrap(), Some(ideas.to_json()));
    }
}
