// # DNS Provider Trait
//
// Defines the capability set the reconciliation engine needs from a DNS
// provider: list, create, delete.
//
// ## Implementations
//
// - Cloudflare: `dnsync-provider-cloudflare` crate
// - In-memory: `dnsync_core::provider::MemoryProvider` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("example.com", "edge.example.com").await?;
//     for record in records {
//         provider.delete_record("example.com", &record.id).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;
use std::net::IpAddr;

/// Address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Record type that can hold the given address
    pub fn for_address(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }

    /// Wire name ("A" or "AAAA")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address record as the provider reports it
///
/// Identity is the provider-assigned `id`. Two records with the same
/// address and different ids are duplicates, not the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    /// Provider-assigned opaque identifier
    pub id: String,
    /// A or AAAA
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Address the record points at
    pub address: IpAddr,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl DnsRecord {
    /// Create a record, deriving the type from the address
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: IpAddr, ttl: u32) -> Self {
        Self {
            id: id.into(),
            record_type: RecordType::for_address(&address),
            name: name.into(),
            address,
            ttl,
        }
    }
}

/// Order record ids: shorter first, then lexicographic
///
/// Decimal ids ("9" < "10") sort numerically and fixed-width hex ids sort
/// lexicographically. Used to pick which duplicate survives.
pub fn compare_record_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Trait for DNS provider implementations
///
/// Implementations must be thread-safe: the engine issues creates (and
/// deletes) concurrently against one shared instance.
///
/// ## Rules for implementations
///
/// - One API call sequence per invocation, no retries or backoff
///   (the engine owns those)
/// - Map failures onto the typed variants of [`crate::Error`] so the engine
///   can tell transient from fatal:
///   - 401/403 → `Error::Auth`
///   - 429 → `Error::RateLimited`
///   - 5xx, connection failures → `Error::Network`
///   - missing record → `Error::NotFound`
///   - record quota → `Error::QuotaExceeded`
/// - Never log credentials
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every A/AAAA record named `record_name` in `zone`
    ///
    /// Must return duplicates as separate entries; the provider API does
    /// not enforce one record per address.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: All matching records, in provider order
    /// - `Err(Error)`: `Auth`, `RateLimited`, or `Network`
    async fn list_records(
        &self,
        zone: &str,
        record_name: &str,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create an address record
    ///
    /// The record type follows the address family.
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: The created record, with its new id
    /// - `Err(Error)`: `Auth`, `RateLimited`, `Network`, or `QuotaExceeded`
    async fn create_record(
        &self,
        zone: &str,
        record_name: &str,
        address: IpAddr,
    ) -> Result<DnsRecord, crate::Error>;

    /// Delete a record by id
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted
    /// - `Err(Error::NotFound)`: The record was already gone
    /// - `Err(Error)`: `Auth`, `RateLimited`, or `Network`
    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
