// # Memory Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Stands in for the network-backed provider wherever the remote API must not
// be touched: engine tests, contract tests, and local experiments.
//
// ## Behavior
//
// - Records live in a shared map; clones see the same zone
// - Ids are sequential decimal strings ("1", "2", ...)
// - Duplicate addresses are allowed, like the real API
// - Faults can be injected per call kind or per created address
// - Every call is counted, including calls that fail

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::DEFAULT_TTL;
use crate::traits::dns_provider::{DnsProvider, DnsRecord};
use crate::Error;

/// Provider operation, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    List,
    Create,
    Delete,
}

/// Failure the memory provider can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Auth,
    RateLimited,
    Network,
    QuotaExceeded,
    NotFound,
}

impl Fault {
    fn to_error(self, context: &str) -> Error {
        match self {
            Fault::Auth => Error::auth(format!("injected: {}", context)),
            Fault::RateLimited => Error::rate_limited(format!("injected: {}", context)),
            Fault::Network => Error::network(format!("injected: {}", context)),
            Fault::QuotaExceeded => Error::quota_exceeded(format!("injected: {}", context)),
            Fault::NotFound => Error::not_found(format!("injected: {}", context)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScriptedFault {
    fault: Fault,
    /// `None` means forever
    remaining: Option<usize>,
}

#[derive(Debug)]
struct MemoryZone {
    zone: String,
    records: Vec<DnsRecord>,
    next_id: u64,
    faults: HashMap<ProviderCall, VecDeque<ScriptedFault>>,
    address_faults: HashMap<IpAddr, ScriptedFault>,
    calls: HashMap<ProviderCall, usize>,
}

/// In-memory DNS provider
///
/// # Example
///
/// ```rust
/// use dnsync_core::provider::{MemoryProvider, ProviderCall, Fault};
///
/// let provider = MemoryProvider::new("example.com");
/// provider.seed("edge.example.com", "10.0.0.1".parse().unwrap());
/// provider.fail_times(ProviderCall::List, Fault::RateLimited, 1);
///
/// assert_eq!(provider.records().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    inner: Arc<Mutex<MemoryZone>>,
}

impl MemoryProvider {
    /// Create an empty zone
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryZone {
                zone: zone.into().to_ascii_lowercase(),
                records: Vec::new(),
                next_id: 1,
                faults: HashMap::new(),
                address_faults: HashMap::new(),
                calls: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryZone> {
        // A panicking test thread must not hide the zone from other assertions
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a record with the next sequential id and return it
    pub fn seed(&self, name: &str, address: IpAddr) -> DnsRecord {
        let mut zone = self.lock();
        zone.insert(name, address)
    }

    /// Insert a record with a caller-chosen id
    pub fn seed_with_id(&self, id: &str, name: &str, address: IpAddr) -> DnsRecord {
        let record = DnsRecord::new(id, name.to_ascii_lowercase(), address, DEFAULT_TTL);
        self.lock().records.push(record.clone());
        record
    }

    /// Remove a record without going through the provider API
    ///
    /// Simulates another actor deleting it between list and delete.
    pub fn remove_out_of_band(&self, id: &str) -> bool {
        let mut zone = self.lock();
        let before = zone.records.len();
        zone.records.retain(|r| r.id != id);
        zone.records.len() != before
    }

    /// Fail the next `times` calls of `call` with `fault`
    pub fn fail_times(&self, call: ProviderCall, fault: Fault, times: usize) {
        if times == 0 {
            return;
        }
        self.lock()
            .faults
            .entry(call)
            .or_default()
            .push_back(ScriptedFault {
                fault,
                remaining: Some(times),
            });
    }

    /// Fail every call of `call` with `fault`
    pub fn fail_always(&self, call: ProviderCall, fault: Fault) {
        self.lock()
            .faults
            .entry(call)
            .or_default()
            .push_back(ScriptedFault {
                fault,
                remaining: None,
            });
    }

    /// Fail creates of `address` with `fault`, `times` times (`None` = forever)
    pub fn fail_create_of(&self, address: IpAddr, fault: Fault, times: Option<usize>) {
        self.lock().address_faults.insert(
            address,
            ScriptedFault {
                fault,
                remaining: times,
            },
        );
    }

    /// Drop all injected faults
    pub fn clear_faults(&self) {
        let mut zone = self.lock();
        zone.faults.clear();
        zone.address_faults.clear();
    }

    /// Snapshot of all records in the zone
    pub fn records(&self) -> Vec<DnsRecord> {
        self.lock().records.clone()
    }

    /// Addresses currently published for `name`
    pub fn addresses(&self, name: &str) -> BTreeSet<IpAddr> {
        let name = name.to_ascii_lowercase();
        self.lock()
            .records
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.address)
            .collect()
    }

    /// Number of times `call` was invoked (including failed invocations)
    pub fn call_count(&self, call: ProviderCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Number of create + delete invocations
    pub fn mutation_count(&self) -> usize {
        self.call_count(ProviderCall::Create) + self.call_count(ProviderCall::Delete)
    }

    /// Reset call counters (records and faults are kept)
    pub fn reset_counts(&self) {
        self.lock().calls.clear();
    }
}

impl MemoryZone {
    fn insert(&mut self, name: &str, address: IpAddr) -> DnsRecord {
        let id = self.next_id.to_string();
        self.next_id += 1;
        let record = DnsRecord::new(id, name.to_ascii_lowercase(), address, DEFAULT_TTL);
        self.records.push(record.clone());
        record
    }

    fn record_call(&mut self, call: ProviderCall) {
        *self.calls.entry(call).or_insert(0) += 1;
    }

    fn take_fault(&mut self, call: ProviderCall) -> Option<Fault> {
        let queue = self.faults.get_mut(&call)?;
        let front = queue.front_mut()?;
        let fault = front.fault;
        match front.remaining.as_mut() {
            None => {}
            Some(n) => {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    queue.pop_front();
                }
            }
        }
        Some(fault)
    }

    fn take_address_fault(&mut self, address: &IpAddr) -> Option<Fault> {
        let scripted = self.address_faults.get_mut(address)?;
        let fault = scripted.fault;
        if let Some(n) = scripted.remaining.as_mut() {
            if *n == 0 {
                self.address_faults.remove(address);
                return None;
            }
            *n -= 1;
            if *n == 0 {
                self.address_faults.remove(address);
            }
        }
        Some(fault)
    }

    fn check_zone(&self, zone: &str) -> Result<(), Error> {
        if zone.eq_ignore_ascii_case(&self.zone) {
            Ok(())
        } else {
            Err(Error::not_found(format!("Zone not found: {}", zone)))
        }
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list_records(&self, zone: &str, record_name: &str) -> Result<Vec<DnsRecord>, Error> {
        let mut state = self.lock();
        state.record_call(ProviderCall::List);
        if let Some(fault) = state.take_fault(ProviderCall::List) {
            return Err(fault.to_error("list"));
        }
        state.check_zone(zone)?;

        let name = record_name.to_ascii_lowercase();
        Ok(state
            .records
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }

    async fn create_record(
        &self,
        zone: &str,
        record_name: &str,
        address: IpAddr,
    ) -> Result<DnsRecord, Error> {
        let mut state = self.lock();
        state.record_call(ProviderCall::Create);
        if let Some(fault) = state.take_fault(ProviderCall::Create) {
            return Err(fault.to_error("create"));
        }
        if let Some(fault) = state.take_address_fault(&address) {
            return Err(fault.to_error(&format!("create {}", address)));
        }
        state.check_zone(zone)?;

        let record = state.insert(record_name, address);
        tracing::trace!("memory provider created {} -> {}", record.id, address);
        Ok(record)
    }

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<(), Error> {
        let mut state = self.lock();
        state.record_call(ProviderCall::Delete);
        if let Some(fault) = state.take_fault(ProviderCall::Delete) {
            return Err(fault.to_error("delete"));
        }
        state.check_zone(zone)?;

        let before = state.records.len();
        state.records.retain(|r| r.id != record_id);
        if state.records.len() == before {
            return Err(Error::not_found(format!("DNS record not found: {}", record_id)));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = "example.com";
    const NAME: &str = "edge.example.com";

    #[tokio::test]
    async fn test_create_list_delete() {
        let provider = MemoryProvider::new(ZONE);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        let created = provider.create_record(ZONE, NAME, ip).await.unwrap();
        assert_eq!(created.id, "1");

        let listed = provider.list_records(ZONE, NAME).await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        provider.delete_record(ZONE, &created.id).await.unwrap();
        assert!(provider.list_records(ZONE, NAME).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_duplicates_and_filters_name() {
        let provider = MemoryProvider::new(ZONE);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        provider.seed(NAME, ip);
        provider.seed(NAME, ip);
        provider.seed("other.example.com", ip);

        let listed = provider.list_records(ZONE, NAME).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let provider = MemoryProvider::new(ZONE);
        let err = provider.delete_record(ZONE, "42").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fault_injection_counts_down() {
        let provider = MemoryProvider::new(ZONE);
        provider.fail_times(ProviderCall::List, Fault::RateLimited, 2);

        assert!(matches!(
            provider.list_records(ZONE, NAME).await,
            Err(Error::RateLimited(_))
        ));
        assert!(provider.list_records(ZONE, NAME).await.is_err());
        assert!(provider.list_records(ZONE, NAME).await.is_ok());
        assert_eq!(provider.call_count(ProviderCall::List), 3);
    }

    #[tokio::test]
    async fn test_address_fault_only_hits_that_address() {
        let provider = MemoryProvider::new(ZONE);
        let bad: IpAddr = "10.0.0.1".parse().unwrap();
        let good: IpAddr = "10.0.0.2".parse().unwrap();
        provider.fail_create_of(bad, Fault::QuotaExceeded, None);

        assert!(matches!(
            provider.create_record(ZONE, NAME, bad).await,
            Err(Error::QuotaExceeded(_))
        ));
        assert!(provider.create_record(ZONE, NAME, good).await.is_ok());
        assert!(provider.create_record(ZONE, NAME, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let provider = MemoryProvider::new(ZONE);
        let clone = provider.clone();
        clone
            .create_record(ZONE, NAME, "10.0.0.9".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(provider.records().len(), 1);
        assert_eq!(provider.call_count(ProviderCall::Create), 1);
    }

    #[tokio::test]
    async fn test_wrong_zone() {
        let provider = MemoryProvider::new(ZONE);
        assert!(matches!(
            provider.list_records("example.org", NAME).await,
            Err(Error::NotFound(_))
        ));
    }
}
