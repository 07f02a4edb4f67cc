//! Reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Fetching the subdomain's current records (with retry)
//! - Planning the minimal set of creates and deletes
//! - Applying creates, then deletes, with bounded concurrency
//! - Reporting what happened
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────┐
//! │ DesiredAddressSet│     │  DnsProvider  │
//! └──────────────────┘     └───────────────┘
//!          │                  ▲    │ list
//!          │       create/del │    ▼
//!          │           ┌─────────────────┐
//!          └──────────▶│ ReconcileEngine │───▶ Report
//!                      └─────────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch: `list_records`, retried on rate limit / network errors.
//!    Any failure here aborts the run before anything is mutated.
//! 2. Plan: [`ReconciliationPlan::compute`]
//! 3. Apply creates (each one independent, failures recorded)
//! 4. Apply deletes, only after every create has finished. When the name
//!    should resolve to something but no desired record is in place after
//!    the creates, the deletes are held back (reported as skipped) so the
//!    name is not left empty.
//! 5. Report
//!
//! ## Concurrency
//!
//! Two runs against the same subdomain are not coordinated and may race.

pub mod plan;
pub mod report;
pub mod retry;

pub use plan::ReconciliationPlan;
pub use report::{Operation, OperationFailure, Report, RunStatus, SkippedOperation};
pub use retry::{Attempted, RetryPolicy};

use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

use crate::config::{Configuration, EngineConfig};
use crate::desired::DesiredAddressSet;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord};
use retry::describe_failure;

/// Core reconciliation engine
///
/// One engine drives runs for one subdomain. A run is a single pass; there
/// is no background loop and nothing is scheduled.
///
/// # Example
///
/// ```rust,no_run
/// use dnsync_core::{Configuration, EngineConfig, ReconcileEngine};
/// use dnsync_core::provider::MemoryProvider;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Configuration::new("ops@example.com", "key", "example.com", "edge.example.com");
///     let provider = MemoryProvider::new("example.com");
///     let engine = ReconcileEngine::new(Box::new(provider), &config, EngineConfig::default())?;
///
///     let desired = dnsync_core::desired::parse_desired_addresses("10.0.0.1\n10.0.0.2\n")?;
///     let report = engine.reconcile(&desired).await?;
///     println!("{}", report);
///     Ok(())
/// }
/// ```
pub struct ReconcileEngine {
    /// DNS provider for listing and mutating records
    provider: Box<dyn DnsProvider>,

    /// Zone the subdomain belongs to
    zone: String,

    /// Fully-qualified record name being managed
    record_name: String,

    /// Backoff policy for every provider call
    retry: RetryPolicy,

    /// Maximum operations in flight within one phase
    concurrency: usize,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `config`: Validated persisted configuration
    /// - `engine`: Retry and concurrency settings
    pub fn new(
        provider: Box<dyn DnsProvider>,
        config: &Configuration,
        engine: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        engine.validate()?;

        Ok(Self {
            provider,
            zone: config.zone.clone(),
            record_name: config.subdomain.clone(),
            retry: RetryPolicy::from_config(&engine),
            concurrency: engine.concurrency,
        })
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Fetch current records and compute the plan without applying it
    pub async fn plan(&self, desired: &DesiredAddressSet) -> Result<ReconciliationPlan> {
        let current = self.fetch().await?;
        Ok(ReconciliationPlan::compute(desired, &current))
    }

    /// Run one full reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(Report)`: The run completed; check [`Report::status`] for
    ///   degraded success
    /// - `Err(Error)`: The fetch failed (auth, or transient errors past the
    ///   retry budget); nothing was mutated
    pub async fn reconcile(&self, desired: &DesiredAddressSet) -> Result<Report> {
        let mut report = Report::start(
            self.provider.provider_name(),
            &self.zone,
            &self.record_name,
            desired.len(),
        );

        let plan = self.plan(desired).await?;
        report.unchanged = plan.unchanged.len();

        if plan.is_noop() {
            info!(
                "{} already converged ({} record(s)), nothing to do",
                self.record_name,
                plan.unchanged.len()
            );
            return Ok(report.finish());
        }

        info!(
            "Plan for {}: {} create(s), {} delete(s), {} unchanged",
            self.record_name,
            plan.to_create.len(),
            plan.to_delete.len(),
            plan.unchanged.len()
        );

        // Creates first so the name is never left empty when avoidable
        self.apply_creates(&plan.to_create, &mut report).await;

        if would_empty_name(desired, &report) && !plan.to_delete.is_empty() {
            warn!(
                "No desired record for {} is in place; holding back {} delete(s)",
                self.record_name,
                plan.to_delete.len()
            );
            for record in &plan.to_delete {
                report.record_skip(
                    Operation::Delete {
                        record_id: record.id.clone(),
                        address: record.address,
                    },
                    "held back: every create failed and deleting would leave the name empty",
                );
            }
        } else {
            self.apply_deletes(&plan.to_delete, &mut report).await;
        }

        let report = report.finish();
        if report.is_converged() {
            info!(
                "Converged {}: {} created, {} deleted",
                self.record_name, report.created, report.deleted
            );
        } else {
            warn!(
                "Run for {} finished degraded: {} operation(s) failed",
                self.record_name, report.failed
            );
        }
        Ok(report)
    }

    /// List current records, retrying transient failures
    async fn fetch(&self) -> Result<Vec<DnsRecord>> {
        let attempted = self
            .retry
            .run("list records", || {
                self.provider.list_records(&self.zone, &self.record_name)
            })
            .await;

        match attempted.result {
            Ok(records) => {
                debug!(
                    "Fetched {} record(s) for {} in {} attempt(s)",
                    records.len(),
                    self.record_name,
                    attempted.attempts
                );
                Ok(records)
            }
            Err(e) => {
                error!(
                    "Failed to fetch records for {}: {}",
                    self.record_name,
                    describe_failure(&e, attempted.attempts)
                );
                Err(e)
            }
        }
    }

    async fn apply_creates(&self, addresses: &[IpAddr], report: &mut Report) {
        let outcomes: Vec<(IpAddr, Attempted<DnsRecord>)> = stream::iter(addresses.to_vec())
            .map(|address| async move {
                let label = format!("create {}", address);
                let attempted = self
                    .retry
                    .run(&label, || {
                        self.provider
                            .create_record(&self.zone, &self.record_name, address)
                    })
                    .await;
                (address, attempted)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (address, attempted) in outcomes {
            match attempted.result {
                Ok(record) => {
                    info!(
                        "Created {} {} -> {} (id {})",
                        record.record_type, self.record_name, address, record.id
                    );
                    report.created += 1;
                }
                Err(e) => {
                    error!("Failed to create {} -> {}: {}", self.record_name, address, e);
                    report.record_failure(
                        Operation::Create { address },
                        describe_failure(&e, attempted.attempts),
                        attempted.attempts,
                    );
                }
            }
        }
    }

    async fn apply_deletes(&self, records: &[DnsRecord], report: &mut Report) {
        let outcomes: Vec<(&DnsRecord, Attempted<()>)> = stream::iter(records.iter())
            .map(|record| async move {
                let label = format!("delete {}", record.id);
                let attempted = self
                    .retry
                    .run(&label, || self.provider.delete_record(&self.zone, &record.id))
                    .await;
                (record, attempted)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (record, attempted) in outcomes {
            match attempted.result {
                Ok(()) => {
                    info!(
                        "Deleted {} -> {} (id {})",
                        self.record_name, record.address, record.id
                    );
                    report.deleted += 1;
                }
                Err(Error::NotFound(msg)) => {
                    // Someone else already removed it; that is the state we wanted
                    info!("Record {} already gone ({}), skipping", record.id, msg);
                    report.record_skip(
                        Operation::Delete {
                            record_id: record.id.clone(),
                            address: record.address,
                        },
                        format!("already gone: {}", msg),
                    );
                }
                Err(e) => {
                    error!(
                        "Failed to delete {} -> {} (id {}): {}",
                        self.record_name, record.address, record.id, e
                    );
                    report.record_failure(
                        Operation::Delete {
                            record_id: record.id.clone(),
                            address: record.address,
                        },
                        describe_failure(&e, attempted.attempts),
                        attempted.attempts,
                    );
                }
            }
        }
    }
}

/// Whether running the delete phase now could leave the name with no records
///
/// True when addresses are wanted but none of them has a record after the
/// create phase.
fn would_empty_name(desired: &DesiredAddressSet, report: &Report) -> bool {
    !desired.is_empty() && report.created == 0 && report.unchanged == 0
}
