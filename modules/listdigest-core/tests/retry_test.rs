//! Summarizer behavior over a scripted backend, under paused time.

use std::sync::Arc;
use std::time::Duration;

use ai_client::AiError;
use listdigest_common::{AggregationResult, LinkGroup, ProviderOptions};
use listdigest_core::health::HealthCache;
use listdigest_core::provider::resilience::RetrySchedule;
use listdigest_core::provider::{is_failure, Summarizer};
use listdigest_core::testing::{post, ScriptedGenerator, ScriptedProvider};

fn aggregation() -> AggregationResult {
    AggregationResult {
        groups: vec![LinkGroup::new(
            "https://ex.com/a".to_string(),
            vec![post("1", &["https://ex.com/a"], 4)],
        )],
        unlinked: Vec::new(),
    }
}

fn summarizer(provider: ScriptedProvider) -> Summarizer {
    Summarizer::new(Arc::new(provider), &ProviderOptions::default()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn rate_limited_twice_then_succeeds_on_schedule() {
    let generator = ScriptedGenerator::new()
        .then_err(AiError::api(429, "slow down"))
        .then_err(AiError::api(429, "slow down"))
        .then_ok("### TL;DR\nAll good.");
    let summarizer = summarizer(ScriptedProvider::new(generator.clone()));

    let summary = summarizer.synthesize(&aggregation()).await;

    assert_eq!(summary, "### TL;DR\nAll good.");
    assert_eq!(generator.calls(), 3);
    let times = generator.call_times();
    let tolerance = Duration::from_millis(50);
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(first_gap >= Duration::from_secs(2));
    assert!(first_gap < Duration::from_secs(2) + tolerance);
    assert!(second_gap >= Duration::from_secs(5));
    assert!(second_gap < Duration::from_secs(5) + tolerance);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_past_cap_is_a_failure_string() {
    let generator = ScriptedGenerator::new()
        .then_err(AiError::api(429, ""))
        .then_err(AiError::api(429, ""))
        .then_err(AiError::api(429, ""))
        .then_ok("never reached");
    let summarizer = summarizer(ScriptedProvider::new(generator.clone()));

    let summary = summarizer.synthesize(&aggregation()).await;

    assert!(is_failure(&summary));
    assert!(summary.contains("Rate limited"));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn server_hint_replaces_scheduled_delay() {
    let generator = ScriptedGenerator::new()
        .then_err(AiError::api(429, "Rate limit reached. Please try again in 7.5s."))
        .then_ok("done");
    let summarizer = summarizer(ScriptedProvider::new(generator.clone()));

    assert_eq!(summarizer.synthesize(&aggregation()).await, "done");
    let times = generator.call_times();
    assert_eq!(times[1] - times[0], Duration::from_millis(7500));
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let generator = ScriptedGenerator::new()
        .then_err(AiError::api(401, "invalid x-api-key"))
        .then_ok("never reached");
    let provider = ScriptedProvider::new(generator.clone()).with_retry(RetrySchedule::default());
    let summarizer = summarizer(provider);

    let summary = summarizer.synthesize(&aggregation()).await;

    assert!(summary.starts_with("Error with Scripted: Invalid API key"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn context_overflow_has_its_own_message() {
    let generator = ScriptedGenerator::new()
        .then_err(AiError::api(400, "context_length_exceeded"));
    let summarizer = summarizer(ScriptedProvider::new(generator.clone()));

    let summary = summarizer.synthesize(&aggregation()).await;

    assert!(summary.contains("context window"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn empty_generation_is_a_failure() {
    let generator = ScriptedGenerator::new().then_ok("   \n");
    let summary = summarizer(ScriptedProvider::new(generator))
        .synthesize(&aggregation())
        .await;
    assert!(is_failure(&summary));
    assert!(summary.contains("empty summary"));
}

#[tokio::test]
async fn verify_without_credential_makes_no_call() {
    let generator = ScriptedGenerator::new()
        .with_unhealthy(AiError::Network("should not be reached".to_string()));
    let summarizer = summarizer(ScriptedProvider::new(generator.clone()).credential_required());

    let status = summarizer.verify().await;

    assert!(!status.active);
    assert_eq!(status.message, "Missing API Key");
    assert_eq!(generator.calls(), 0);
    assert!(summarizer.ensure_configured().is_err());

    let summary = summarizer.synthesize(&aggregation()).await;
    assert!(summary.starts_with("Error: Scripted API key not configured"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn verify_reports_ready_and_caches() {
    let generator = ScriptedGenerator::new();
    let options = ProviderOptions {
        model: Some("tiny".to_string()),
        ..Default::default()
    };
    let summarizer = Summarizer::new(Arc::new(ScriptedProvider::new(generator)), &options).unwrap();
    let cache = HealthCache::new();

    let status = summarizer.verify_cached(&cache).await;
    assert!(status.active);
    assert_eq!(status.message, "Ready (tiny)");
    assert_eq!(cache.get(&summarizer.cache_key()), Some(status));
    assert_eq!(summarizer.display_name(), "Scripted \u{b7} tiny");
}

#[tokio::test]
async fn verify_maps_unhealthy_backend() {
    let generator = ScriptedGenerator::new().with_unhealthy(AiError::api(401, "bad key"));
    let status = summarizer(ScriptedProvider::new(generator)).verify().await;
    assert_eq!(status.message, "Invalid API Key");
}
