//! Cloudflare API v4 wire types

use dnsync_core::{DnsRecord, RecordType};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Envelope every v4 endpoint responds with
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    pub result_info: Option<ResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// First error as `(code, message)`, if the API sent one
    pub fn first_error(&self) -> Option<(i64, &str)> {
        self.errors.first().map(|e| (e.code, e.message.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareError {
    pub code: i64,
    pub message: String,
}

/// Pagination info on list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareZone {
    pub id: String,
    pub name: String,
}

/// A DNS record as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
}

impl CloudflareDnsRecord {
    /// Convert to a core record
    ///
    /// Returns `None` for anything that is not an A/AAAA record with an
    /// address matching its type.
    pub fn into_dns_record(self) -> Option<DnsRecord> {
        let address: IpAddr = self.content.parse().ok()?;
        let expected = match self.record_type.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            _ => return None,
        };
        if RecordType::for_address(&address) != expected {
            return None;
        }
        Some(DnsRecord::new(
            self.id,
            self.name.to_ascii_lowercase(),
            address,
            self.ttl,
        ))
    }
}

/// Body of `POST /zones/:zone_id/dns_records`
#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: &'a str,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}
