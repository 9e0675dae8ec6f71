//! Metrics boundary.
//!
//! The engine reports named counters and millisecond timings through a
//! [`MetricsSink`]. Sinks are fire-and-forget: they cannot fail back into
//! the engine.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Metric names emitted by the orchestrators.
pub mod names {
    pub const CONTENT_INVOCATIONS: &str = "content.invocations";
    pub const CONTENT_CACHE_HITS: &str = "content.cache_hits";
    pub const CONTENT_ERRORS: &str = "content.errors";
    pub const CONTENT_GENERATE_MS: &str = "content.generate_ms";

    pub const IDEAS_INVOCATIONS: &str = "ideas.invocations";
    pub const IDEAS_CACHE_HITS: &str = "ideas.cache_hits";
    pub const IDEAS_ERRORS: &str = "ideas.errors";
    pub const IDEAS_GENERATE_MS: &str = "ideas.generate_ms";
}

/// Receiver for engine metrics.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: &str);

    fn record_duration(&self, timing: &str, millis: u64);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: &str) {}

    fn record_duration(&self, _timing: &str, _millis: u64) {}
}

/// Aggregate of one timing series.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingStats {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl TimingStats {
    pub fn avg_ms(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ms / self.count
        }
    }

    fn record(&mut self, millis: u64) {
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(millis);
        self.max_ms = self.max_ms.max(millis);
    }
}

#[derive(Debug, Default)]
struct Registry {
    counters: HashMap<String, u64>,
    timings: HashMap<String, TimingStats>,
}

/// In-process sink keeping counters and timing aggregates.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    registry: Mutex<Registry>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.registry.lock().counters.get(name).copied().unwrap_or(0)
    }

    pub fn timing(&self, name: &str) -> TimingStats {
        self.registry.lock().timings.get(name).copied().unwrap_or_default()
    }

    /// JSON view of every counter and timing.
    pub fn snapshot(&self) -> serde_json::Value {
        let registry = self.registry.lock();
        let timings: serde_json::Map<String, serde_json::Value> = registry
            .timings
            .iter()
            .map(|(name, stats)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "count": stats.count,
                        "avg_ms": stats.avg_ms(),
                        "max_ms": stats.max_ms,
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "counters": registry.counters,
            "timings": timings,
        })
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, counter: &str) {
        *self
            .registry
            .lock()
            .counters
            .entry(counter.to_string())
            .or_insert(0) += 1;
    }

    fn record_duration(&self, timing: &str, millis: u64) {
        self.registry
            .lock()
            .timings
            .entry(timing.to_string())
            .or_default()
            .record(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = InMemoryMetrics::new();
        assert_eq!(metrics.counter(names::CONTENT_INVOCATIONS), 0);

        metrics.increment(names::CONTENT_INVOCATIONS);
        metrics.increment(names::CONTENT_INVOCATIONS);
        metrics.increment(names::CONTENT_CACHE_HITS);

        assert_eq!(metrics.counter(names::CONTENT_INVOCATIONS), 2);
        assert_eq!(metrics.counter(names::CONTENT_CACHE_HITS), 1);
    }

    #[test]
    fn test_timings() {
        let metrics = InMemoryMetrics::new();
        metrics.record_duration(names::IDEAS_GENERATE_MS, 10);
        metrics.record_duration(names::IDEAS_GENERATE_MS, 30);

        let stats = metrics.timing(names::IDEAS_GENERATE_MS);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max_ms, 30);
        assert_eq!(stats.avg_ms(), 20);
        assert_eq!(metrics.timing("missing").avg_ms(), 0);
    }

    #[test]
    fn test_snapshot() {
        let metrics = InMemoryMetrics::new();
        metrics.increment(names::IDEAS_ERRORS);
        metrics.record_duration(names::IDEAS_GENERATE_MS, 8);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["counters"][names::IDEAS_ERRORS], 1);
        assert_eq!(snapshot["timings"][names::IDEAS_GENERATE_MS]["avg_ms"], 8);
    }
}
