//! Engine configuration.
//!
//! Every setting has a default and can be overridden from the environment.
//! Durations accept a bare integer in the unit named by the variable
//! (`_SECONDS`, `_MS`) or a humantime string such as `"90s"` or `"2m"`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::cache::CacheSettings;
use crate::resilience::{RetryPolicy, SuppressionPolicy};

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Cache '{0}' must hold at least one entry")]
    ZeroCapacity(&'static str),

    #[error("Suppression window bounds are inverted: min {min:?} > max {max:?}")]
    InvalidSuppression { min: Duration, max: Duration },

    #[error("Timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("Backoff factor must be at least 1.0, got {0}")]
    InvalidBackoffFactor(f64),
}

/// Model selection for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Primary model
    pub model: String,

    /// Models tried after the primary, in order
    #[serde(default)]
    pub fallback_models: Vec<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Default Gemini fallback order.
pub const GEMINI_FALLBACK_MODELS: [&str; 10] = [
    "gemini-2.5-pro",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-lite-001",
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro",
    "gemini-pro",
];

impl ProviderSettings {
    pub fn gemini() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".to_string(),
            fallback_models: GEMINI_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            endpoint: None,
        }
    }

    pub fn openai() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            fallback_models: Vec::new(),
            endpoint: None,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub content_cache: CacheSettings,
    pub ideas_cache: CacheSettings,

    pub retry: RetryPolicy,

    /// Base per-attempt timeout for article generation (in milliseconds)
    #[serde(with = "duration_millis")]
    pub generation_timeout: Duration,

    /// Per-attempt timeout of the strict regeneration pass (in milliseconds)
    #[serde(with = "duration_millis")]
    pub strict_timeout: Duration,

    /// Per-attempt timeout for idea generation (in milliseconds)
    #[serde(with = "duration_millis")]
    pub ideas_timeout: Duration,

    pub suppression: SuppressionPolicy,

    /// Longest rate-limit hint honored by waiting in place (in seconds)
    #[serde(with = "duration_secs")]
    pub inplace_max_wait: Duration,

    /// In-place rate-limit waits per model
    pub inplace_retries: u32,

    /// Lifetime of cached provider-error placeholders (in seconds)
    #[serde(with = "duration_secs")]
    pub placeholder_ttl: Duration,

    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_cache: CacheSettings::new(Duration::from_secs(3600), 500),
            ideas_cache: CacheSettings::new(Duration::from_secs(900), 500),
            retry: RetryPolicy::default(),
            generation_timeout: Duration::from_millis(60_000),
            strict_timeout: Duration::from_millis(3_000),
            ideas_timeout: Duration::from_millis(4_000),
            suppression: SuppressionPolicy::default(),
            inplace_max_wait: Duration::from_secs(15),
            inplace_retries: 1,
            placeholder_ttl: Duration::from_secs(60),
            gemini: ProviderSettings::gemini(),
            openai: ProviderSettings::openai(),
        }
    }
}

#[derive(Clone, Copy)]
enum Unit {
    Seconds,
    Millis,
}

/// Reads typed overrides through an environment-style lookup.
struct Overrides<F> {
    lookup: F,
}

impl<F> Overrides<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T, P>(&self, name: &str, default: T, parse: P) -> T
    where
        P: FnOnce(&str) -> Option<T>,
    {
        match self.raw(name) {
            None => default,
            Some(raw) => parse(&raw).unwrap_or_else(|| {
                warn!(variable = name, value = %raw, "Invalid configuration value, using default");
                default
            }),
        }
    }

    fn duration(&self, name: &str, unit: Unit, default: Duration) -> Duration {
        self.parsed(name, default, |raw| match raw.parse::<u64>() {
            Ok(n) => Some(match unit {
                Unit::Seconds => Duration::from_secs(n),
                Unit::Millis => Duration::from_millis(n),
            }),
            Err(_) => humantime::parse_duration(raw).ok(),
        })
    }

    fn number<T: std::str::FromStr>(&self, name: &str, default: T) -> T {
        self.parsed(name, default, |raw| raw.parse().ok())
    }

    fn flag(&self, name: &str, default: bool) -> bool {
        self.parsed(name, default, |raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
    }

    fn text(&self, name: &str, default: String) -> String {
        self.raw(name).unwrap_or(default)
    }

    fn list(&self, name: &str, default: Vec<String>) -> Vec<String> {
        self.raw(name)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(default)
    }

    fn provider(&self, prefix: &str, default: ProviderSettings) -> ProviderSettings {
        ProviderSettings {
            model: self.text(&format!("{prefix}_MODEL"), default.model),
            fallback_models: self.list(&format!("{prefix}_FALLBACK_MODELS"), default.fallback_models),
            endpoint: self.raw(&format!("{prefix}_BASE_URL")).or(default.endpoint),
        }
    }
}

impl EngineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an environment-style lookup. Unset variables keep their
    /// defaults; invalid ones are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Overrides { lookup };
        let d = Self::default();

        let max_entries = env.number("CACHE_MAX_ENTRIES", d.content_cache.max_entries);
        Self {
            content_cache: CacheSettings::new(
                env.duration("ARTICLE_CACHE_TTL_SECONDS", Unit::Seconds, d.content_cache.ttl),
                max_entries,
            ),
            ideas_cache: CacheSettings::new(
                env.duration("IDEAS_CACHE_TTL_SECONDS", Unit::Seconds, d.ideas_cache.ttl),
                max_entries,
            ),
            retry: RetryPolicy {
                max_retries: env.number("PROVIDER_MAX_RETRIES", d.retry.max_retries),
                base_delay: env.duration("RETRY_BASE_DELAY_MS", Unit::Millis, d.retry.base_delay),
                max_delay: env.duration("RETRY_MAX_DELAY_MS", Unit::Millis, d.retry.max_delay),
                backoff_factor: env.number("RETRY_BACKOFF_FACTOR", d.retry.backoff_factor),
                jitter: env.flag("RETRY_JITTER", d.retry.jitter),
            },
            generation_timeout: env.duration("GEMINI_TIMEOUT_MS", Unit::Millis, d.generation_timeout),
            strict_timeout: env.duration("STRICT_TIMEOUT_MS", Unit::Millis, d.strict_timeout),
            ideas_timeout: env.duration("IDEAS_TIMEOUT_MS", Unit::Millis, d.ideas_timeout),
            suppression: SuppressionPolicy {
                default_window: env.duration(
                    "RATE_LIMIT_DEFAULT_SECONDS",
                    Unit::Seconds,
                    d.suppression.default_window,
                ),
                min_window: env.duration("RATE_LIMIT_MIN_SECONDS", Unit::Seconds, d.suppression.min_window),
                max_window: env.duration("RATE_LIMIT_MAX_SECONDS", Unit::Seconds, d.suppression.max_window),
            },
            inplace_max_wait: env.duration(
                "RATE_LIMIT_INPLACE_MAX_WAIT_SECONDS",
                Unit::Seconds,
                d.inplace_max_wait,
            ),
            inplace_retries: env.number("RATE_LIMIT_INPLACE_RETRIES", d.inplace_retries),
            placeholder_ttl: env.duration("PLACEHOLDER_CACHE_TTL_SECONDS", Unit::Seconds, d.placeholder_ttl),
            gemini: env.provider("GEMINI", d.gemini),
            openai: env.provider("OPENAI", d.openai),
        }
    }

    /// Reject structurally impossible settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_cache.max_entries == 0 {
            return Err(ConfigError::ZeroCapacity("content"));
        }
        if self.ideas_cache.max_entries == 0 {
            return Err(ConfigError::ZeroCapacity("ideas"));
        }
        if self.suppression.min_window > self.suppression.max_window {
            return Err(ConfigError::InvalidSuppression {
                min: self.suppression.min_window,
                max: self.suppression.max_window,
            });
        }
        for (name, timeout) in [
            ("generation", self.generation_timeout),
            ("strict", self.strict_timeout),
            ("ideas", self.ideas_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }
        if self.retry.backoff_factor.is_nan() || self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidBackoffFactor(self.retry.backoff_factor));
        }
        Ok(())
    }
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
