//! Per-call timeouts and retry with exponential backoff.
//!
//! A single upstream call is wrapped in [`ResilienceClient::call`]: each
//! attempt runs under its own timeout, retryable failures sleep and retry,
//! the last failure is returned once retries are exhausted.

use backon::{BackoffBuilder, Retryable};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::providers::ProviderError;

/// Jitter removes up to this fraction of a delay.
pub const JITTER_FRACTION: f64 = 0.3;

/// No retry delay is shorter than this.
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// Retry policy for one upstream call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// First retry delay (in milliseconds)
    #[serde(with = "crate::config::duration_millis")]
    pub base_delay: Duration,

    /// Upper bound for any delay (in milliseconds)
    #[serde(with = "crate::config::duration_millis")]
    pub max_delay: Duration,

    pub backoff_factor: f64,

    /// Shorten delays by a random amount
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(1500),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Pre-jitter delay before retry `n` (1-based): `min(base * factor^(n-1), max)`.
    pub fn nominal_delay(&self, n: u32) -> Duration {
        let exponent = n.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Delays between attempts, in order.
    pub fn delays(&self) -> RetryDelays {
        RetryDelays {
            policy: self.clone(),
            next: 1,
        }
    }
}

/// Remove `sample * 30%` of `nominal`, floor to whole milliseconds and
/// enforce [`MIN_DELAY`]. `sample` is expected in `[0, 1)`.
pub fn apply_jitter(nominal: Duration, sample: f64) -> Duration {
    let millis = nominal.as_millis() as f64;
    let jittered = (millis - millis * JITTER_FRACTION * sample.clamp(0.0, 1.0)).floor();
    Duration::from_millis(jittered as u64).max(MIN_DELAY)
}

/// Iterator over the retry delays of a [`RetryPolicy`].
///
/// The first delay is the unjittered base delay; jitter applies from the
/// second retry on.
#[derive(Debug, Clone)]
pub struct RetryDelays {
    policy: RetryPolicy,
    next: u32,
}

impl Iterator for RetryDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.next > self.policy.max_retries {
            return None;
        }
        let n = self.next;
        self.next += 1;

        let nominal = self.policy.nominal_delay(n);
        if n == 1 || !self.policy.jitter {
            return Some(nominal.max(MIN_DELAY));
        }
        Some(apply_jitter(nominal, rand::thread_rng().gen::<f64>()))
    }
}

impl BackoffBuilder for RetryPolicy {
    type Backoff = RetryDelays;

    fn build(self) -> Self::Backoff {
        self.delays()
    }
}

/// Timeout schedule across the attempts of one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptTimeouts {
    /// `base * (1 + 0.5 * (attempt - 1))`, attempt capped at 3, never below 1s
    Escalating(Duration),
    /// Same limit for every attempt
    Fixed(Duration),
}

impl AttemptTimeouts {
    const GROWTH: f64 = 0.5;
    const MAX_ESCALATION: u32 = 3;
    const FLOOR: Duration = Duration::from_secs(1);

    pub fn escalating(base: Duration) -> Self {
        Self::Escalating(base)
    }

    pub fn fixed(limit: Duration) -> Self {
        Self::Fixed(limit)
    }

    /// Limit for 1-based `attempt`.
    pub fn for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            AttemptTimeouts::Fixed(limit) => limit,
            AttemptTimeouts::Escalating(base) => {
                let step = attempt.clamp(1, Self::MAX_ESCALATION) - 1;
                base.mul_f64(1.0 + Self::GROWTH * step as f64).max(Self::FLOOR)
            }
        }
    }
}

/// Executes upstream calls under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ResilienceClient {
    policy: RetryPolicy,
}

impl ResilienceClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// retries are exhausted.
    ///
    /// `op` receives the 1-based attempt number. An attempt that outlives its
    /// timeout is dropped and counts as [`ProviderError::Timeout`].
    pub async fn call<T, F, Fut>(&self, timeouts: AttemptTimeouts, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        let run = || {
            attempt += 1;
            let limit = timeouts.for_attempt(attempt);
            let pending = op(attempt);
            async move {
                match tokio::time::timeout(limit, pending).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(limit)),
                }
            }
        };

        run.retry(self.policy.clone())
            .sleep(tokio::time::sleep)
            .when(ProviderError::is_retryable)
            .notify(|err: &ProviderError, delay: Duration| {
                warn!(error = %err, delay_ms = delay.as_millis() as u64, "Retrying upstream call");
            })
            .await
    }
}
