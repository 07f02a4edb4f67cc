//! Test doubles and common utilities for engine contract tests

#![allow(dead_code)]

use dnsync_core::error::Result;
use dnsync_core::traits::{DnsProvider, DnsRecord};
use dnsync_core::{Configuration, DesiredAddressSet, EngineConfig, MemoryProvider, ReconcileEngine};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const ZONE: &str = "example.com";
pub const NAME: &str = "edge.example.com";

/// Create a valid configuration for the test subdomain
pub fn test_config() -> Configuration {
    Configuration::new("ops@example.com", "test-key", ZONE, NAME)
}

/// Engine settings with no backoff sleep
pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        max_attempts: 3,
        base_delay_ms: 0,
        backoff_multiplier: 2,
        concurrency: 4,
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal in test")
}

pub fn desired(addrs: &[&str]) -> DesiredAddressSet {
    addrs.iter().map(|a| ip(a)).collect()
}

/// Address set, for comparing against [`MemoryProvider::addresses`]
pub fn addresses(addrs: &[&str]) -> BTreeSet<IpAddr> {
    addrs.iter().map(|a| ip(a)).collect()
}

/// Engine over a clone of `provider`, so the test keeps a handle on the zone
pub fn engine_for(provider: &MemoryProvider) -> ReconcileEngine {
    engine_with(Box::new(provider.clone()), fast_engine_config())
}

pub fn engine_with(provider: Box<dyn DnsProvider>, engine: EngineConfig) -> ReconcileEngine {
    ReconcileEngine::new(provider, &test_config(), engine).expect("engine construction succeeds")
}

/// A provider call as seen by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(IpAddr),
    Delete(String),
}

/// Wraps a provider and records every call in order, with its start time
pub struct RecordingProvider {
    inner: MemoryProvider,
    log: Arc<Mutex<Vec<(Call, Instant)>>>,
}

impl RecordingProvider {
    pub fn new(inner: MemoryProvider) -> (Self, Arc<Mutex<Vec<(Call, Instant)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    fn push(&self, call: Call) {
        self.log.lock().unwrap().push((call, Instant::now()));
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn list_records(&self, zone: &str, record_name: &str) -> Result<Vec<DnsRecord>> {
        self.push(Call::List);
        self.inner.list_records(zone, record_name).await
    }

    async fn create_record(
        &self,
        zone: &str,
        record_name: &str,
        address: IpAddr,
    ) -> Result<DnsRecord> {
        self.push(Call::Create(address));
        self.inner.create_record(zone, record_name, address).await
    }

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()> {
        self.push(Call::Delete(record_id.to_string()));
        self.inner.delete_record(zone, record_id).await
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Calls only, without timestamps
pub fn calls(log: &Arc<Mutex<Vec<(Call, Instant)>>>) -> Vec<Call> {
    log.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
}
