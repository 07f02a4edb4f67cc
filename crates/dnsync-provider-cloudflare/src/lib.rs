// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of `dnsync_core::DnsProvider`.
//
// ## Behavior
//
// - One HTTP exchange per call (list follows pagination, one request per page)
// - No retry, no backoff: failures are classified and returned to the engine
// - HTTP timeout of 30 seconds
// - Both A and AAAA records, chosen by address family
// - Zone id taken from the configuration, or looked up once by zone name
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or Debug output
// - Construction fails fast on empty credentials
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&per_page=100&page=N`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - List Zones: GET `/zones?name=...`

pub mod types;

use async_trait::async_trait;
use dnsync_core::traits::{DnsProvider, DnsRecord, RecordType};
use dnsync_core::{Configuration, Error, Result};
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use types::{
    CloudflareDnsRecord, CloudflareResponse, CloudflareZone, CreateRecordRequest, ResultInfo,
};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest page the DNS records endpoint serves
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare DNS provider
///
/// Stateless and single-shot. All coordination (retries, backoff,
/// ordering) is owned by `ReconcileEngine`.
pub struct CloudflareProvider {
    /// Account email, sent as `X-Auth-Email`
    email: String,

    /// Global API key, sent as `X-Auth-Key`
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Zone ID, from the configuration or resolved on first use
    zone_id: OnceCell<String>,

    /// TTL for created records
    ttl: u32,

    /// Proxy flag for created records
    proxied: bool,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider from the persisted configuration
    ///
    /// # Errors
    ///
    /// - `ConfigInvalid` if the email or API key is empty
    /// - `Provider` if the HTTP client cannot be built
    pub fn new(config: &Configuration) -> Result<Self> {
        if config.email.is_empty() {
            return Err(Error::config("Cloudflare account email is required"));
        }
        if config.api_key.is_empty() {
            return Err(Error::config("Cloudflare API key is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            email: config.email.clone(),
            api_key: config.api_key.clone(),
            zone_id: OnceCell::new_with(config.zone_id.clone()),
            ttl: config.ttl,
            proxied: config.proxied,
            client,
        })
    }

    /// Look up the zone identifier for a zone name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// ```
    pub async fn resolve_zone_id(&self, zone: &str) -> Result<String> {
        debug!("Looking up zone ID for: {}", zone);

        let url = format!("{}/zones", CLOUDFLARE_API_BASE);
        let request = self.client.get(&url).query(&[("name", zone)]);
        let response: CloudflareResponse<Vec<CloudflareZone>> = self.send(request).await?;

        let found = response
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))?;

        debug!("Found zone ID for {}: {}", found.name, found.id);
        Ok(found.id)
    }

    async fn zone_id_for(&self, zone: &str) -> Result<String> {
        self.zone_id
            .get_or_try_init(|| async {
                self.resolve_zone_id(zone).await.map_err(zone_lookup_error)
            })
            .await
            .cloned()
    }

    /// Authenticate, send, and decode one request
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<CloudflareResponse<T>> {
        let response = request
            .header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(classify_failure(status, &body));
        }

        let decoded: CloudflareResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        if !decoded.success {
            return Err(classify_failure(status, &body));
        }
        Ok(decoded)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self, zone: &str, record_name: &str) -> Result<Vec<DnsRecord>> {
        let zone_id = self.zone_id_for(zone).await?;
        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);

        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self.client.get(&url).query(&[
                ("name", record_name.to_string()),
                ("per_page", RECORDS_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let response: CloudflareResponse<Vec<CloudflareDnsRecord>> =
                self.send(request).await?;

            let next = next_page(response.result_info.as_ref(), page);

            for raw in response.result.unwrap_or_default() {
                let (id, kind) = (raw.id.clone(), raw.record_type.clone());
                match raw.into_dns_record() {
                    Some(record) => records.push(record),
                    None if kind == "A" || kind == "AAAA" => {
                        warn!("Ignoring {} record {} with unparseable content", kind, id);
                    }
                    None => {}
                }
            }

            match next {
                Some(n) => page = n,
                None => break,
            }
        }

        debug!("Listed {} A/AAAA record(s) for {}", records.len(), record_name);
        Ok(records)
    }

    async fn create_record(
        &self,
        zone: &str,
        record_name: &str,
        address: IpAddr,
    ) -> Result<DnsRecord> {
        let zone_id = self.zone_id_for(zone).await?;
        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);
        let body = CreateRecordRequest {
            record_type: RecordType::for_address(&address).as_str(),
            name: record_name,
            content: address.to_string(),
            ttl: self.ttl,
            proxied: self.proxied,
        };

        let response: CloudflareResponse<CloudflareDnsRecord> =
            self.send(self.client.post(&url).json(&body)).await?;

        response
            .result
            .and_then(CloudflareDnsRecord::into_dns_record)
            .ok_or_else(|| {
                Error::provider(PROVIDER_NAME, "Create succeeded but returned no usable record")
            })
    }

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()> {
        let zone_id = self.zone_id_for(zone).await?;
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record_id
        );

        let _: CloudflareResponse<serde_json::Value> = self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Page to request after `page`, or `None` when the listing is complete
///
/// A response without pagination info is a single page.
fn next_page(info: Option<&ResultInfo>, page: u32) -> Option<u32> {
    let total_pages = info?.total_pages;
    (page < total_pages).then_some(page + 1)
}

/// A zone that cannot be found is a configuration problem
///
/// Keeps the lookup miss from reading as `NotFound` on a record, which the
/// engine treats as an already-deleted record.
fn zone_lookup_error(e: Error) -> Error {
    match e {
        Error::NotFound(msg) => Error::config(msg),
        other => other,
    }
}

/// Map a transport-level failure
fn transport_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::provider(PROVIDER_NAME, format!("Invalid request: {}", e))
    } else {
        Error::network(format!("HTTP request failed: {}", e))
    }
}

/// Map a failed API exchange to an error
///
/// The HTTP status decides first; for statuses that say nothing specific,
/// the first Cloudflare error code in the body decides.
pub fn classify_failure(status: u16, body: &str) -> Error {
    let first = serde_json::from_str::<CloudflareResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|r| r.first_error().map(|(code, msg)| (code, msg.to_string())));
    let message = match &first {
        Some((code, msg)) => format!("{} (code {}, HTTP {})", msg, code, status),
        None => format!("HTTP {}", status),
    };

    match status {
        401 | 403 => return Error::auth(message),
        429 => return Error::rate_limited(message),
        500..=599 => return Error::network(message),
        404 => return Error::not_found(message),
        _ => {}
    }

    match first.map(|(code, _)| code) {
        // Authentication error
        // 6003: Invalid request headers
        // 6103: Invalid format for X-Auth-Key header
        // 9103: Unknown X-Auth-Key or X-Auth-Email
        // 9109: Unauthorized to access requested resource
        // 10000: Authentication error
        Some(6003 | 6103 | 9103 | 9109 | 10000) => Error::auth(message),
        // 81044: Record does not exist
        Some(81044) => Error::not_found(message),
        // 81045: The record quota has been exceeded
        Some(81045) => Error::quota_exceeded(message),
        // 971: Please wait and consider throttling your request speed
        Some(971) => Error::rate_limited(message),
        _ => Error::provider(PROVIDER_NAME, message),
    }
}
