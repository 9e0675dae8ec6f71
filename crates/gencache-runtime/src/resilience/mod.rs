//! Resilience patterns for gencache-runtime.
//!
//! This module provides:
//! - Retry with backoff and per-attempt timeouts
//! - Shared provider backoff (rate-limit suppression) state
//! - Ordered provider/model fallback chain

mod backoff;
mod fallback;
mod retry;

pub use backoff::{ProviderBackoffTracker, ProviderDiagnostics, ProviderStatus, SuppressionPolicy};
pub use fallback::{ProviderChain, ProviderRoute};
pub use retry::{apply_jitter, AttemptTimeouts, ResilienceClient, RetryDelays, RetryPolicy, JITTER_FRACTION, MIN_DELAY};
