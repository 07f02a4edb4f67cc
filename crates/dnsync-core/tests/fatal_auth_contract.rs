//! Contract Test: Fatal Errors and Benign Races
//!
//! Constraints verified:
//! - Rejected credentials at fetch time stop the run with zero apply calls
//! - Auth errors are never retried
//! - A record deleted by someone else between fetch and delete is skipped,
//!   not failed
//! - Auth failing mid-apply is recorded against that operation only

mod common;

use common::*;
use dnsync_core::provider::{Fault, ProviderCall};
use dnsync_core::{Error, MemoryProvider, RunStatus};

#[tokio::test]
async fn auth_failure_on_fetch_is_fatal() {
    let provider = MemoryProvider::new(ZONE);
    provider.seed(NAME, ip("10.0.0.9"));
    provider.fail_always(ProviderCall::List, Fault::Auth);
    let engine = engine_for(&provider);

    let err = engine
        .reconcile(&desired(&["10.0.0.1"]))
        .await
        .expect_err("auth failure aborts the run");

    assert!(matches!(err, Error::Auth(_)));
    assert!(err.is_fatal_for_run());
    assert_eq!(provider.call_count(ProviderCall::List), 1);
    assert_eq!(provider.mutation_count(), 0);
    assert_eq!(provider.records().len(), 1);
}

#[tokio::test]
async fn wrong_zone_is_fatal() {
    let provider = MemoryProvider::new("example.org");
    let engine = engine_for(&provider);

    let err = engine
        .reconcile(&desired(&["10.0.0.1"]))
        .await
        .expect_err("zone does not exist at the provider");

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(provider.mutation_count(), 0);
}

#[tokio::test]
async fn delete_race_is_skipped() {
    let provider = MemoryProvider::new(ZONE);
    provider.seed(NAME, ip("10.0.0.9"));
    provider.fail_times(ProviderCall::Delete, Fault::NotFound, 1);
    let engine = engine_for(&provider);

    let report = engine.reconcile(&desired(&[])).await.expect("run completes");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.status, RunStatus::Converged);
    assert_eq!(provider.call_count(ProviderCall::Delete), 1);
}

#[tokio::test]
async fn auth_failure_during_apply_fails_only_that_operation() {
    let provider = MemoryProvider::new(ZONE);
    provider.seed(NAME, ip("10.0.0.9"));
    provider.fail_create_of(ip("10.0.0.1"), Fault::Auth, None);
    let engine = engine_for(&provider);

    let report = engine
        .reconcile(&desired(&["10.0.0.1", "10.0.0.2"]))
        .await
        .expect("run completes");

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.created, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].attempts, 1);
    assert!(report.failures[0].cause.starts_with("Authentication failed"));
}

#[tokio::test]
async fn dry_run_plan_never_mutates() {
    let provider = MemoryProvider::new(ZONE);
    provider.seed(NAME, ip("10.0.0.9"));
    let engine = engine_for(&provider);

    let plan = engine
        .plan(&desired(&["10.0.0.1", "10.0.0.2"]))
        .await
        .expect("plan computed");

    assert_eq!(plan.to_create.len(), 2);
    assert_eq!(plan.delete_ids().len(), 1);
    assert_eq!(provider.mutation_count(), 0);
}
