//! Core traits for dnsync
//!
//! - [`DnsProvider`]: List, create and delete address records via a provider API

pub mod dns_provider;

pub use dns_provider::{DnsProvider, DnsRecord, RecordType, compare_record_ids};
