//! Contract Test: Engine-Owned Retry
//!
//! Providers make one attempt per call; the engine decides whether to try
//! again.
//!
//! Constraints verified:
//! - Only rate limiting and network failures are retried
//! - Attempts never exceed `max_attempts`
//! - Backoff sleeps grow between attempts
//! - A create that keeps failing degrades the run without stopping it
//! - A fetch that keeps failing aborts the run before any mutation
//!
//! If this test fails, retries leaked into providers or got unbounded.

mod common;

use common::*;
use dnsync_core::provider::{Fault, ProviderCall};
use dnsync_core::{EngineConfig, Error, MemoryProvider, RunStatus};
use std::time::Duration;

#[tokio::test]
async fn transient_fetch_failures_are_retried() {
    let provider = MemoryProvider::new(ZONE);
    provider.fail_times(ProviderCall::List, Fault::RateLimited, 2);
    let engine = engine_for(&provider);

    let report = engine
        .reconcile(&desired(&["10.0.0.1"]))
        .await
        .expect("third attempt succeeds");

    assert_eq!(provider.call_count(ProviderCall::List), 3);
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn exhausted_fetch_aborts_without_mutation() {
    let provider = MemoryProvider::new(ZONE);
    provider.fail_always(ProviderCall::List, Fault::Network);
    let engine = engine_for(&provider);

    let err = engine
        .reconcile(&desired(&["10.0.0.1"]))
        .await
        .expect_err("fetch never succeeds");

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(provider.call_count(ProviderCall::List), 3);
    assert_eq!(provider.mutation_count(), 0);
}

#[tokio::test]
async fn backoff_sleeps_between_attempts() {
    let memory = MemoryProvider::new(ZONE);
    memory.fail_times(ProviderCall::List, Fault::RateLimited, 2);
    let (provider, log) = RecordingProvider::new(memory);
    let engine = engine_with(
        Box::new(provider),
        EngineConfig {
            max_attempts: 3,
            base_delay_ms: 20,
            backoff_multiplier: 2,
            concurrency: 1,
        },
    );

    engine
        .reconcile(&desired(&[]))
        .await
        .expect("third attempt succeeds");

    let log = log.lock().unwrap();
    let lists: Vec<_> = log.iter().filter(|(c, _)| *c == Call::List).map(|(_, t)| *t).collect();
    assert_eq!(lists.len(), 3);
    assert!(lists[1] - lists[0] >= Duration::from_millis(20));
    assert!(lists[2] - lists[1] >= Duration::from_millis(40));
}

#[tokio::test]
async fn failing_create_is_isolated_and_degrades_run() {
    let provider = MemoryProvider::new(ZONE);
    provider.seed(NAME, ip("10.0.0.9"));
    provider.fail_create_of(ip("10.0.0.2"), Fault::Network, None);
    let engine = engine_for(&provider);

    let report = engine
        .reconcile(&desired(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]))
        .await
        .expect("run completes despite failures");

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.created, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 1);

    let failure = &report.failures[0];
    assert_eq!(failure.attempts, 3);
    assert!(failure.cause.contains("gave up after 3 attempts"));
    assert!(failure.operation.to_string().contains("10.0.0.2"));

    // 2 successful creates + 3 attempts at the failing one
    assert_eq!(provider.call_count(ProviderCall::Create), 5);
}

#[tokio::test]
async fn quota_failure_is_not_retried() {
    let provider = MemoryProvider::new(ZONE);
    provider.fail_create_of(ip("10.0.0.1"), Fault::QuotaExceeded, None);
    let engine = engine_for(&provider);

    let report = engine
        .reconcile(&desired(&["10.0.0.1"]))
        .await
        .expect("run completes");

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].attempts, 1);
    assert_eq!(provider.call_count(ProviderCall::Create), 1);
}

#[tokio::test]
async fn degraded_run_converges_on_rerun() {
    let provider = MemoryProvider::new(ZONE);
    provider.fail_create_of(ip("10.0.0.2"), Fault::QuotaExceeded, Some(1));
    let engine = engine_for(&provider);
    let wanted = desired(&["10.0.0.1", "10.0.0.2"]);

    let first = engine.reconcile(&wanted).await.expect("run completes");
    assert_eq!(first.status, RunStatus::Degraded);

    let second = engine.reconcile(&wanted).await.expect("run completes");
    assert_eq!(second.status, RunStatus::Converged);
    assert_eq!(second.created, 1);
    assert_eq!(second.unchanged, 1);
}
