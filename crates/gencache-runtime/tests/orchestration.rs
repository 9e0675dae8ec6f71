//! End-to-end behavior of the engine against scripted providers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{article, Reply, ScriptedProvider, ToggleRelevance};
use gencache_core::{default_ideas, idea_cache_key};
use gencache_runtime::metrics::names;
use gencache_runtime::{
    ContentOrchestrator, Engine, EngineConfig, IdeaOrchestrator, IdeaStore, InMemoryIdeaStore, InMemoryMetrics,
    ProviderBackoffTracker, ProviderChain, ProviderRoute, TextProvider,
};

fn route(provider: &Arc<ScriptedProvider>, models: &[&str]) -> ProviderRoute {
    let provider: Arc<dyn TextProvider> = provider.clone();
    ProviderRoute::new(provider, models[0], models[1..].iter().map(|m| m.to_string()))
}

fn content_with(chain: ProviderChain) -> ContentOrchestrator {
    ContentOrchestrator::builder().chain(chain).build().unwrap()
}

#[tokio::test]
async fn test_missing_credentials_serves_placeholder() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let engine = Engine::new(
        EngineConfig::default(),
        ProviderChain::new(),
        Arc::new(InMemoryIdeaStore::new()),
        metrics.clone(),
    )
    .unwrap();

    let result = engine.generate("rust", "en_US").await;

    assert!(result.html.contains("rust"));
    assert!(result.html.contains("placeholder"));
    assert!(result.meta_title.as_deref().is_some_and(|t| !t.is_empty()));
    assert!(result.meta_description.as_deref().is_some_and(|d| !d.is_empty()));
    assert_eq!(metrics.counter(names::CONTENT_ERRORS), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_in_place_then_falls_back_in_order() {
    let gemini = Arc::new(
        ScriptedProvider::new("gemini", Reply::text(&article("Rust ownership")))
            .on("m1", [Reply::rate_limited(5), Reply::rate_limited(5)])
            .on("m2", [Reply::text("```\n```")]),
    );
    let orchestrator = content_with(ProviderChain::new().add(route(&gemini, &["m1", "m2", "m3", "m4"])));

    let started = tokio::time::Instant::now();
    let result = orchestrator.generate("rust ownership", "en_US").await;

    assert_eq!(gemini.calls(), vec!["m1", "m1", "m2", "m3"]);
    assert!(result.html.starts_with("<article>"));
    assert!(result.html.contains("Rust ownership"));
    assert!(started.elapsed() >= Duration::from_secs(5));

    let diagnostics = orchestrator.diagnostics();
    let status = diagnostics[0].status.as_ref().unwrap();
    assert!(status.ok);
    assert_eq!(status.model.as_deref(), Some("m3"));
}

#[tokio::test]
async fn test_warm_cache_issues_no_provider_calls() {
    let gemini = Arc::new(ScriptedProvider::new("gemini", Reply::text(&article("Sourdough starter"))));
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = ContentOrchestrator::builder()
        .chain(ProviderChain::new().add(route(&gemini, &["m1"])))
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let first = orchestrator.generate("sourdough starter", "en_US").await;
    let second = orchestrator.generate("sourdough starter", "en_US").await;

    assert_eq!(first, second);
    assert_eq!(gemini.call_count(), 1);
    assert_eq!(metrics.counter(names::CONTENT_INVOCATIONS), 2);
    assert_eq!(metrics.counter(names::CONTENT_CACHE_HITS), 1);
    assert_eq!(metrics.timing(names::CONTENT_GENERATE_MS).count, 2);
}

#[tokio::test]
async fn test_stale_cached_content_is_regenerated() {
    let gemini = Arc::new(
        ScriptedProvider::new("gemini", Reply::text(&article("Rust ownership")))
            .on("m1", [Reply::text(&article("Gardening for beginners"))]),
    );
    let relevance = ToggleRelevance::lenient();
    let orchestrator = ContentOrchestrator::builder()
        .chain(ProviderChain::new().add(route(&gemini, &["m1"])))
        .relevance(relevance.clone())
        .build()
        .unwrap();

    let stale = orchestrator.generate("rust ownership", "en_US").await;
    assert!(stale.html.contains("Gardening"));

    relevance.enforce();
    let fresh = orchestrator.generate("rust ownership", "en_US").await;

    assert!(!fresh.html.contains("Gardening"));
    assert!(fresh.html.contains("Rust ownership"));
    assert_eq!(gemini.call_count(), 2);
}

#[tokio::test]
async fn test_off_topic_output_gets_one_strict_pass_on_primary() {
    let gemini = Arc::new(
        ScriptedProvider::new("gemini", Reply::text(&article("Rust ownership")))
            .on("m1", [Reply::text(&article("Gardening for beginners"))]),
    );
    let orchestrator = content_with(ProviderChain::new().add(route(&gemini, &["m1", "m2"])));

    let result = orchestrator.generate("rust ownership", "en_US").await;

    assert_eq!(gemini.calls(), vec!["m1", "m1"]);
    assert!(result.html.contains("Rust ownership"));
}

#[tokio::test]
async fn test_rate_limit_suppresses_primary_for_later_calls() {
    let primary = Arc::new(
        ScriptedProvider::new("primary", Reply::text(&article("unused"))).on("p1", [Reply::rate_limited(90)]),
    );
    let secondary = Arc::new(ScriptedProvider::new(
        "secondary",
        Reply::text("<article><h1>Rust async</h1><p>Rust futures and tokio basics.</p></article>"),
    ));
    let tracker = Arc::new(ProviderBackoffTracker::new());
    let orchestrator = ContentOrchestrator::builder()
        .chain(
            ProviderChain::new()
                .add(route(&primary, &["p1"]))
                .add(route(&secondary, &["s1"])),
        )
        .tracker(tracker.clone())
        .build()
        .unwrap();

    let queries = ["rust async", "rust futures", "rust tokio"];
    for query in queries {
        let result = orchestrator.generate(query, "en_US").await;
        assert!(result.html.contains("Rust async"));
    }

    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), queries.len());

    let remaining = tracker.suppression_remaining("primary").unwrap();
    assert!(remaining > Duration::from_secs(85) && remaining <= Duration::from_secs(90));
    let snapshot = tracker.snapshot("primary");
    assert!(snapshot.remaining_secs > 0);
    assert_eq!(snapshot.status.unwrap().status_code, Some(429));
}

#[tokio::test]
async fn test_every_provider_suppressed_serves_rate_limit_placeholder() {
    let primary = Arc::new(ScriptedProvider::new("primary", Reply::rate_limited(90)));
    let orchestrator = content_with(ProviderChain::new().add(route(&primary, &["p1"])));

    let first = orchestrator.generate("rust async", "en_US").await;
    let second = orchestrator.generate("sourdough starter", "en_US").await;

    assert!(first.html.contains("rate limit"));
    assert!(second.html.contains("rate limit"));
    assert!(second.html.contains("sourdough starter"));
    assert_eq!(primary.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_provider_yields_default_ideas_written_through() {
    let gemini = Arc::new(ScriptedProvider::new("gemini", Reply::unavailable()));
    let store = Arc::new(InMemoryIdeaStore::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let ideas = IdeaOrchestrator::builder()
        .chain(ProviderChain::new().add(route(&gemini, &["m1", "m2"])))
        .store(store.clone())
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let list = ideas.generate_ideas("kombucha", "en_US").await;

    assert_eq!(list.len(), 6);
    assert_eq!(list, default_ideas("kombucha"));
    // Primary model only, first attempt plus two retries.
    assert_eq!(gemini.calls(), vec!["m1", "m1", "m1"]);

    let key = idea_cache_key("kombucha", "en_US");
    let row = store.row(&key).unwrap();
    assert_eq!(row.items, list.to_json());
    assert_eq!(row.query, "kombucha");
    assert_eq!(metrics.counter(names::IDEAS_ERRORS), 1);

    let again = ideas.generate_ideas("kombucha", "en_US").await;
    assert_eq!(again, list);
    assert_eq!(gemini.call_count(), 3);
    assert_eq!(metrics.counter(names::IDEAS_CACHE_HITS), 1);
}

#[tokio::test]
async fn test_generated_ideas_are_parsed_and_stored() {
    let reply = r#"```json
[{"title": "Second fermentation", "query": "kombucha second fermentation", "description": "Carbonation and flavor."},
 {"title": "SCOBY care", "q": "kombucha scoby", "desc": "Keeping the culture healthy."}]
```"#;
    let gemini = Arc::new(ScriptedProvider::new("gemini", Reply::text(reply)));
    let store = Arc::new(InMemoryIdeaStore::new());
    let ideas = IdeaOrchestrator::builder()
        .chain(ProviderChain::new().add(route(&gemini, &["m1"])))
        .store(store.clone())
        .build()
        .unwrap();

    let list = ideas.generate_ideas("Kombucha", "en_US").await;

    assert_eq!(list.len(), 2);
    assert_eq!(list.items()[1].query, "kombucha scoby");
    let stored = store.get("en_US:kombucha").await.unwrap().unwrap();
    assert_eq!(stored, list.to_json());
}

#[tokio::test]
async fn test_content_rate_limit_suppresses_ideas() {
    let primary = Arc::new(ScriptedProvider::new("primary", Reply::rate_limited(90)));
    let engine = Engine::new(
        EngineConfig::default(),
        ProviderChain::new().add(route(&primary, &["p1"])),
        Arc::new(InMemoryIdeaStore::new()),
        Arc::new(InMemoryMetrics::new()),
    )
    .unwrap();

    engine.generate("rust async", "en_US").await;
    let list = engine.generate_ideas("rust async", "en_US").await;

    assert_eq!(list, default_ideas("rust async"));
    assert_eq!(primary.call_count(), 1);
    assert!(engine.tracker().is_suppressed("primary"));
    assert_eq!(engine.diagnostics()[0].provider, "primary");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_for_one_key_agree() {
    let gemini = Arc::new(ScriptedProvider::new("gemini", Reply::text(&article("Sourdough starter"))));
    let orchestrator = content_with(ProviderChain::new().add(route(&gemini, &["m1"])));

    let (a, b) = futures::future::join(
        orchestrator.generate("sourdough starter", "en_US"),
        orchestrator.generate("sourdough starter", "en_US"),
    )
    .await;

    assert_eq!(a, b);
    assert!((1..=2).contains(&gemini.call_count()));
    assert_eq!(orchestrator.peek("sourdough starter", "en_US"), Some(a));
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_escalates_without_retry() {
    let gemini = Arc::new(
        ScriptedProvider::new("gemini", Reply::text(&article("Rust ownership"))).on("m1", [Reply::unauthorized()]),
    );
    let orchestrator = content_with(ProviderChain::new().add(route(&gemini, &["m1", "m2", "m3"])));

    let result = orchestrator.generate("rust ownership", "en_US").await;

    assert_eq!(gemini.calls(), vec!["m1", "m2"]);
    assert!(result.html.contains("Rust ownership"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_placeholder_expires_with_window() {
    let primary = Arc::new(
        ScriptedProvider::new("primary", Reply::text(&article("Rust async"))).on("p1", [Reply::rate_limited(90)]),
    );
    let orchestrator = content_with(ProviderChain::new().add(route(&primary, &["p1"])));

    let placeholder = orchestrator.generate("rust async", "en_US").await;
    assert!(placeholder.html.contains("rate limit"));

    tokio::time::advance(Duration::from_secs(60)).await;
    let cached = orchestrator.generate("rust async", "en_US").await;
    assert_eq!(cached, placeholder);
    assert_eq!(primary.call_count(), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    let fresh = orchestrator.generate("rust async", "en_US").await;
    assert!(fresh.html.contains("Rust async"));
    assert!(!fresh.html.contains("rate limit"));
    assert_eq!(primary.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_provider_error_placeholder_expires_after_placeholder_ttl() {
    let gemini = Arc::new(
        ScriptedProvider::new("gemini", Reply::text(&article("Rust ownership"))).on("m1", [Reply::unauthorized()]),
    );
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = ContentOrchestrator::builder()
        .chain(ProviderChain::new().add(route(&gemini, &["m1"])))
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let placeholder = orchestrator.generate("rust ownership", "en_US").await;
    assert!(placeholder.html.contains("service error"));
    assert_eq!(metrics.counter(names::CONTENT_ERRORS), 1);

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(orchestrator.generate("rust ownership", "en_US").await, placeholder);
    assert_eq!(gemini.call_count(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let fresh = orchestrator.generate("rust ownership", "en_US").await;
    assert!(fresh.html.contains("Rust ownership"));
    assert_eq!(gemini.call_count(), 2);
}
