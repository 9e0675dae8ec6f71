//! Drives generation requests through the provider fallback chain.
//!
//! Shared by both orchestrators. For each route in order: skip it while its
//! provider is suppressed, otherwise try its models through the
//! [`ResilienceClient`], recording every outcome in the backoff tracker.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::prompts::PromptKind;
use crate::providers::{GenerationRequest, ProviderError};
use crate::resilience::{
    AttemptTimeouts, ProviderBackoffTracker, ProviderChain, ProviderRoute, ProviderStatus,
    ResilienceClient, SuppressionPolicy,
};

/// Result of one pass over the chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ChainOutcome<T> {
    /// A model produced acceptable output
    Generated(T),
    /// Nothing succeeded and at least one provider is inside a suppression window
    Suppressed { retry_in: Duration },
    /// Every attempted model failed
    Failed,
}

/// Which models of each route a pass tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModelScope {
    /// Primary, then every fallback model
    All,
    /// Primary model only
    Primary,
}

pub(crate) struct Dispatcher {
    chain: ProviderChain,
    client: ResilienceClient,
    tracker: Arc<ProviderBackoffTracker>,
    suppression: SuppressionPolicy,
    inplace_max_wait: Duration,
    inplace_retries: u32,
}

impl Dispatcher {
    pub fn new(chain: ProviderChain, tracker: Arc<ProviderBackoffTracker>, config: &EngineConfig) -> Self {
        Self {
            chain,
            client: ResilienceClient::new(config.retry.clone()),
            tracker,
            suppression: config.suppression.clone(),
            inplace_max_wait: config.inplace_max_wait,
            inplace_retries: config.inplace_retries,
        }
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn tracker(&self) -> &Arc<ProviderBackoffTracker> {
        &self.tracker
    }

    /// One pass over the chain, stopping at the first accepted output.
    ///
    /// `accept` turns raw provider text into the caller's type; a rejection
    /// counts as a failed attempt for that model.
    pub async fn run<T, A>(
        &self,
        kind: PromptKind,
        query: &str,
        locale: &str,
        scope: ModelScope,
        timeouts: AttemptTimeouts,
        accept: A,
    ) -> ChainOutcome<T>
    where
        A: Fn(&str) -> Result<T, ProviderError>,
    {
        for route in self.chain.routes() {
            let provider = route.provider_name();
            if let Some(remaining) = self.tracker.suppression_remaining(provider) {
                warn!(
                    provider,
                    remaining_secs = remaining.as_secs(),
                    "Provider suppressed, skipping route"
                );
                self.tracker.record_status(provider, ProviderStatus::suppressed(remaining));
                continue;
            }

            let models = match scope {
                ModelScope::All => route.models(),
                ModelScope::Primary => &route.models()[..route.models().len().min(1)],
            };
            for model in models {
                let request = kind.request(model, query, locale);
                match self.call_model(route, &request, timeouts, &accept).await {
                    Ok(output) => {
                        info!(query, locale, provider, model = model.as_str(), "Generation accepted");
                        return ChainOutcome::Generated(output);
                    }
                    Err(err) => {
                        error!(query, locale, provider, model = model.as_str(), error = %err, "Model failed");
                    }
                }
            }
        }

        let retry_in = self
            .chain
            .routes()
            .iter()
            .filter_map(|route| self.tracker.suppression_remaining(route.provider_name()))
            .min();
        match retry_in {
            Some(retry_in) => ChainOutcome::Suppressed { retry_in },
            None => ChainOutcome::Failed,
        }
    }

    /// Call one model, waiting in place once for a short rate-limit hint.
    async fn call_model<T, A>(
        &self,
        route: &ProviderRoute,
        request: &GenerationRequest,
        timeouts: AttemptTimeouts,
        accept: &A,
    ) -> Result<T, ProviderError>
    where
        A: Fn(&str) -> Result<T, ProviderError>,
    {
        let provider = route.provider();
        let name = provider.name();
        let model = request.model.as_str();
        let version = provider.api_version(model);
        let mut waits = 0u32;

        loop {
            let result = self
                .client
                .call(timeouts, |attempt| {
                    debug!(provider = name, model, attempt, "Calling provider");
                    provider.complete(request)
                })
                .await
                .and_then(|raw| accept(&raw));

            let err = match result {
                Ok(output) => {
                    self.tracker.record_success(name, model, version);
                    return Ok(output);
                }
                Err(err) => err,
            };

            let window = self
                .tracker
                .record_failure(name, model, version.clone(), &err, &self.suppression);
            let wait = window
                .and(err.retry_after())
                .filter(|hint| *hint <= self.inplace_max_wait && waits < self.inplace_retries);
            match wait {
                Some(hint) => {
                    waits += 1;
                    warn!(
                        provider = name,
                        model,
                        delay_ms = hint.as_millis() as u64,
                        "Rate limited, waiting in place"
                    );
                    tokio::time::sleep(hint).await;
                }
                None => return Err(err),
            }
        }
    }
}
