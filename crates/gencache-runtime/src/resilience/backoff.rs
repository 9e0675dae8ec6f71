//! Provider backoff tracker.
//!
//! Records the last observed status of each provider and a shared
//! "do not call before" instant set after a rate-limit response. One
//! provider's 429 becomes visible to every in-flight and future invocation
//! without re-probing it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::providers::ProviderError;

/// Suppression window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionPolicy {
    /// Window when the provider gives no hint (in seconds)
    #[serde(with = "crate::config::duration_secs")]
    pub default_window: Duration,

    /// Shortest window (in seconds)
    #[serde(with = "crate::config::duration_secs")]
    pub min_window: Duration,

    /// Longest window (in seconds)
    #[serde(with = "crate::config::duration_secs")]
    pub max_window: Duration,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            default_window: Duration::from_secs(60),
            min_window: Duration::from_secs(1),
            max_window: Duration::from_secs(300),
        }
    }
}

impl SuppressionPolicy {
    /// Window for a rate-limit response with an optional retry hint.
    pub fn window(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.default_window)
            .clamp(self.min_window, self.max_window)
    }
}

/// Last observed outcome of a provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    pub observed_at: DateTime<Utc>,
}

impl ProviderStatus {
    pub fn success(model: &str, version: Option<String>) -> Self {
        Self {
            ok: true,
            model: Some(model.to_string()),
            version,
            status_code: Some(200),
            message: None,
            retry_after_seconds: None,
            observed_at: Utc::now(),
        }
    }

    pub fn failure(model: &str, version: Option<String>, error: &ProviderError) -> Self {
        let message = match error {
            ProviderError::Timeout(limit) => format!("Aborted after {}ms", limit.as_millis()),
            other => other.to_string(),
        };
        Self {
            ok: false,
            model: Some(model.to_string()),
            version,
            status_code: error.status_code(),
            message: Some(message),
            retry_after_seconds: error.retry_after().map(|d| d.as_secs()),
            observed_at: Utc::now(),
        }
    }

    /// Status recorded when a call is skipped because of an active window.
    pub fn suppressed(remaining: Duration) -> Self {
        let secs = remaining.as_secs().max(1);
        Self {
            ok: false,
            model: None,
            version: None,
            status_code: Some(429),
            message: Some(format!("Backoff active ({secs}s)")),
            retry_after_seconds: Some(secs),
            observed_at: Utc::now(),
        }
    }
}

/// Serializable view of one provider's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDiagnostics {
    pub provider: String,
    pub status: Option<ProviderStatus>,
    pub suppressed_until: Option<DateTime<Utc>>,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, Default)]
struct ProviderState {
    status: Option<ProviderStatus>,
    suppress_until: Option<Instant>,
}

/// Shared per-provider status and suppression state.
///
/// Construct one per engine and share it by `Arc`.
#[derive(Debug, Default)]
pub struct ProviderBackoffTracker {
    states: RwLock<HashMap<String, ProviderState>>,
}

impl ProviderBackoffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the provider's last status.
    pub fn record_status(&self, provider: &str, status: ProviderStatus) {
        self.states
            .write()
            .entry(provider.to_string())
            .or_default()
            .status = Some(status);
    }

    pub fn status(&self, provider: &str) -> Option<ProviderStatus> {
        self.states.read().get(provider)?.status.clone()
    }

    pub fn set_suppression(&self, provider: &str, until: Instant) {
        self.states
            .write()
            .entry(provider.to_string())
            .or_default()
            .suppress_until = Some(until);
    }

    /// The stored window end, even if it has already passed.
    pub fn suppression_until(&self, provider: &str) -> Option<Instant> {
        self.states.read().get(provider)?.suppress_until
    }

    /// Time left in the active window, `None` when the provider may be called.
    pub fn suppression_remaining(&self, provider: &str) -> Option<Duration> {
        let until = self.suppression_until(provider)?;
        let remaining = until.saturating_duration_since(Instant::now());
        (!remaining.is_zero()).then_some(remaining)
    }

    pub fn is_suppressed(&self, provider: &str) -> bool {
        self.suppression_remaining(provider).is_some()
    }

    pub fn record_success(&self, provider: &str, model: &str, version: Option<String>) {
        self.record_status(provider, ProviderStatus::success(model, version));
    }

    /// Record a failed call. A rate-limit error also opens a suppression
    /// window, whose length is returned.
    pub fn record_failure(
        &self,
        provider: &str,
        model: &str,
        version: Option<String>,
        error: &ProviderError,
        policy: &SuppressionPolicy,
    ) -> Option<Duration> {
        let status = ProviderStatus::failure(model, version, error);
        let window = matches!(error, ProviderError::RateLimited { .. })
            .then(|| policy.window(error.retry_after()));

        let mut states = self.states.write();
        let state = states.entry(provider.to_string()).or_default();
        state.status = Some(status);
        if let Some(window) = window {
            state.suppress_until = Some(Instant::now() + window);
            tracing::warn!(
                provider,
                model,
                window_secs = window.as_secs(),
                "Provider rate limited, suppressing calls"
            );
        }
        window
    }

    /// Diagnostics view of one provider.
    pub fn snapshot(&self, provider: &str) -> ProviderDiagnostics {
        let remaining = self.suppression_remaining(provider);
        ProviderDiagnostics {
            provider: provider.to_string(),
            status: self.status(provider),
            suppressed_until: remaining.and_then(|d| {
                chrono::Duration::from_std(d).ok().map(|d| Utc::now() + d)
            }),
            remaining_secs: remaining.map(|d| d.as_secs()).unwrap_or(0),
        }
    }

    /// Forget all state.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}
