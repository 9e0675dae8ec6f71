//! # gencache-runtime
//!
//! Resilient generation cache and upstream orchestration.
//!
//! This crate drives slow, rate-limited text-generation providers on behalf
//! of two operations:
//! - **Content**: an HTML article for a (query, locale) pair
//! - **Ideas**: a short list of follow-up suggestions
//!
//! Every call completes with a usable value. Provider failures degrade to
//! deterministic placeholder markup or templated ideas; nothing is surfaced
//! to the caller as an error.
//!
//! ## Resilience
//!
//! - Per-attempt timeouts and jittered exponential backoff
//! - Ordered provider and model fallback
//! - Shared per-provider suppression after rate limiting
//! - Bounded TTL caches in front of the providers
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gencache_runtime::{Engine, NoopMetrics};
//!
//! # async fn run() -> Result<(), gencache_runtime::ConfigError> {
//! let engine = Engine::from_env(Arc::new(NoopMetrics))?;
//!
//! let article = engine.generate("sourdough starter", "en_US").await;
//! println!("{}", article.html);
//!
//! let ideas = engine.generate_ideas("sourdough starter", "en_US").await;
//! for idea in ideas.items() {
//!     println!("{}: {}", idea.title, idea.query);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod content;
mod dispatch;
pub mod engine;
pub mod ideas;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod store;

pub use cache::{CacheSettings, TtlCache};
pub use config::{ConfigError, EngineConfig, ProviderSettings};
pub use content::{ContentOrchestrator, ContentOrchestratorBuilder};
pub use engine::Engine;
pub use ideas::{IdeaOrchestrator, IdeaOrchestratorBuilder};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use providers::{ApiCredential, GenerationRequest, ProviderDescriptor, ProviderError, ProviderKind, TextProvider};
pub use resilience::{
    AttemptTimeouts, ProviderBackoffTracker, ProviderChain, ProviderDiagnostics, ProviderRoute, ProviderStatus,
    ResilienceClient, RetryPolicy, SuppressionPolicy,
};
pub use store::{IdeaStore, InMemoryIdeaStore, StoreError};

// Content types callers receive
pub use gencache_core::{GenerationResult, IdeaItem, IdeaList};
