//! Content generation orchestrator.
//!
//! `generate(query, locale)` never fails. It consults the content cache,
//! drives the provider chain, validates relevance, runs at most one strict
//! regeneration pass, and degrades to deterministic placeholder markup
//! whenever no provider output can be accepted.
//!
//! The strict pass runs only after the whole chain has produced an
//! off-topic article. It uses the primary model of each non-suppressed
//! route with the strict timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gencache_core::{
    content_cache_key, sanitize_article, GenerationResult, KeywordRelevance, Placeholder,
    RelevanceCheck,
};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::{ChainOutcome, Dispatcher, ModelScope};
use crate::metrics::{names, MetricsSink, NoopMetrics};
use crate::prompts::PromptKind;
use crate::providers::ProviderError;
use crate::resilience::{AttemptTimeouts, ProviderBackoffTracker, ProviderChain, ProviderDiagnostics};

/// Cached article plus whether it is placeholder markup.
///
/// Placeholders embed the query and are never relevance-evicted.
#[derive(Debug, Clone)]
struct CachedArticle {
    result: GenerationResult,
    placeholder: bool,
}

/// Orchestrates article generation for (query, locale) pairs.
pub struct ContentOrchestrator {
    dispatcher: Dispatcher,
    cache: TtlCache<CachedArticle>,
    relevance: Arc<dyn RelevanceCheck>,
    metrics: Arc<dyn MetricsSink>,
    generation_timeout: Duration,
    strict_timeout: Duration,
    placeholder_ttl: Duration,
}

impl ContentOrchestrator {
    pub fn builder() -> ContentOrchestratorBuilder {
        ContentOrchestratorBuilder::new()
    }

    /// Generate, or serve from cache, the article for `query` in `locale`.
    pub async fn generate(&self, query: &str, locale: &str) -> GenerationResult {
        let started = Instant::now();
        self.metrics.increment(names::CONTENT_INVOCATIONS);
        let key = content_cache_key(query, locale);

        if let Some(cached) = self.cache.get(&key) {
            if cached.placeholder || self.relevance.is_relevant(query, &cached.result.html) {
                debug!(query, locale, placeholder = cached.placeholder, "Content cache hit");
                self.metrics.increment(names::CONTENT_CACHE_HITS);
                self.record_elapsed(started);
                return cached.result.with_derived_meta(query, locale);
            }
            warn!(query, locale, "Cached content no longer relevant, evicting");
            self.cache.delete(&key);
        }

        if self.dispatcher.chain().is_empty() {
            info!(query, locale, "No provider configured, serving placeholder");
            self.record_elapsed(started);
            return GenerationResult::placeholder(Placeholder::MissingCredentials, query, locale)
                .with_derived_meta(query, locale);
        }

        let outcome = self
            .dispatcher
            .run(
                PromptKind::Standard,
                query,
                locale,
                ModelScope::All,
                AttemptTimeouts::escalating(self.generation_timeout),
                accept_article,
            )
            .await;

        let (entry, ttl) = match outcome {
            ChainOutcome::Generated(html) => (self.validate(html, query, locale).await, self.cache.default_ttl()),
            ChainOutcome::Suppressed { retry_in } => {
                warn!(query, locale, retry_in_secs = retry_in.as_secs(), "All providers suppressed");
                let reason = Placeholder::RateLimited {
                    retry_in_secs: retry_in.as_secs().max(1),
                };
                (placeholder(reason, query, locale), retry_in)
            }
            ChainOutcome::Failed => {
                self.metrics.increment(names::CONTENT_ERRORS);
                (placeholder(Placeholder::ProviderError, query, locale), self.placeholder_ttl)
            }
        };

        let entry = CachedArticle {
            result: entry.result.with_derived_meta(query, locale),
            placeholder: entry.placeholder,
        };
        self.cache.set_with_ttl(key, entry.clone(), ttl);
        self.record_elapsed(started);
        entry.result
    }

    /// Accept relevant output, otherwise run the single strict pass.
    async fn validate(&self, html: String, query: &str, locale: &str) -> CachedArticle {
        if self.relevance.is_relevant(query, &html) {
            if let Some(result) = GenerationResult::from_html(html) {
                return CachedArticle {
                    result,
                    placeholder: false,
                };
            }
        }

        warn!(query, locale, "Generated content off-topic, attempting strict regeneration");
        let strict = self
            .dispatcher
            .run(
                PromptKind::Strict,
                query,
                locale,
                ModelScope::Primary,
                AttemptTimeouts::fixed(self.strict_timeout),
                accept_article,
            )
            .await;

        match strict {
            ChainOutcome::Generated(html) if self.relevance.is_relevant(query, &html) => {
                info!(query, locale, "Strict regeneration accepted");
                match GenerationResult::from_html(html) {
                    Some(result) => CachedArticle {
                        result,
                        placeholder: false,
                    },
                    None => placeholder(Placeholder::OffTopic, query, locale),
                }
            }
            _ => {
                warn!(query, locale, "Strict regeneration failed, serving placeholder");
                placeholder(Placeholder::OffTopic, query, locale)
            }
        }
    }

    /// Cached article, if any, without generating or evicting.
    pub fn peek(&self, query: &str, locale: &str) -> Option<GenerationResult> {
        self.cache
            .get(&content_cache_key(query, locale))
            .map(|cached| cached.result.with_derived_meta(query, locale))
    }

    /// Backoff state of every configured provider.
    pub fn diagnostics(&self) -> Vec<ProviderDiagnostics> {
        self.dispatcher
            .chain()
            .routes()
            .iter()
            .map(|route| self.dispatcher.tracker().snapshot(route.provider_name()))
            .collect()
    }

    /// Number of cached articles.
    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }

    fn record_elapsed(&self, started: Instant) {
        self.metrics
            .record_duration(names::CONTENT_GENERATE_MS, started.elapsed().as_millis() as u64);
    }
}

fn placeholder(reason: Placeholder, query: &str, locale: &str) -> CachedArticle {
    CachedArticle {
        result: GenerationResult::placeholder(reason, query, locale),
        placeholder: true,
    }
}

/// Sanitized article markup; nothing usable is a failed attempt.
fn accept_article(raw: &str) -> Result<String, ProviderError> {
    let html = sanitize_article(raw);
    if html.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(html)
    }
}

/// Builder for ContentOrchestrator.
pub struct ContentOrchestratorBuilder {
    config: EngineConfig,
    chain: ProviderChain,
    tracker: Option<Arc<ProviderBackoffTracker>>,
    relevance: Option<Arc<dyn RelevanceCheck>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl ContentOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            chain: ProviderChain::new(),
            tracker: None,
            relevance: None,
            metrics: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the provider chain.
    pub fn chain(mut self, chain: ProviderChain) -> Self {
        self.chain = chain;
        self
    }

    /// Share a backoff tracker with other orchestrators.
    pub fn tracker(mut self, tracker: Arc<ProviderBackoffTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Replace the relevance validator.
    pub fn relevance(mut self, relevance: Arc<dyn RelevanceCheck>) -> Self {
        self.relevance = Some(relevance);
        self
    }

    /// Set the metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<ContentOrchestrator, ConfigError> {
        self.config.validate()?;
        let tracker = self.tracker.unwrap_or_default();

        Ok(ContentOrchestrator {
            dispatcher: Dispatcher::new(self.chain, tracker, &self.config),
            cache: TtlCache::new(&self.config.content_cache),
            relevance: self
                .relevance
                .unwrap_or_else(|| Arc::new(KeywordRelevance::default()) as Arc<dyn RelevanceCheck>),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(NoopMetrics) as Arc<dyn MetricsSink>),
            generation_timeout: self.config.generation_timeout,
            strict_timeout: self.config.strict_timeout,
            placeholder_ttl: self.config.placeholder_ttl,
        })
    }
}

impl Default for ContentOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
