// # dnsync-core
//
// Core library for reconciling a subdomain's A/AAAA records against a
// desired list of addresses.
//
// ## Architecture Overview
//
// - **ConfigStore**: Loads and atomically saves the key=value settings file
// - **DesiredAddressSet**: The addresses the subdomain should resolve to
// - **DnsProvider**: Trait for listing, creating and deleting records
// - **ReconcileEngine**: Fetch, plan, apply creates then deletes, report
// - **Collector**: Input source for interactive setup
//
// ## Design Principles
//
// 1. **Library-First**: The binary only wires these pieces together
// 2. **Engine Owns Retries**: Providers make exactly one attempt per call
// 3. **Idempotency**: A second run against a converged zone changes nothing
// 4. **Fail Before Mutating**: Anything fatal is detected before the first write

pub mod config;
pub mod config_store;
pub mod desired;
pub mod engine;
pub mod error;
pub mod provider;
pub mod setup;
pub mod traits;

// Re-export core types for convenience
pub use config::{Configuration, EngineConfig};
pub use config_store::ConfigStore;
pub use desired::{DesiredAddressSet, read_desired_addresses};
pub use engine::{ReconcileEngine, ReconciliationPlan, Report, RunStatus};
pub use error::{Error, Result};
pub use provider::MemoryProvider;
pub use traits::{DnsProvider, DnsRecord, RecordType};
