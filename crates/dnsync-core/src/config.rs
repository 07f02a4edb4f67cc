//! Configuration types for dnsync
//!
//! [`Configuration`] is what `dnsync init` persists: provider credentials plus
//! the zone and subdomain to manage. [`EngineConfig`] tunes the reconciliation
//! engine and never touches disk.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default TTL for created records (seconds)
pub const DEFAULT_TTL: u32 = 60;

/// Provider credentials and the record set to manage
///
/// Loaded once per run by [`crate::ConfigStore`] and passed by reference
/// into the provider and the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Account login email
    pub email: String,

    /// Global API key
    /// ⚠️ NEVER log this value
    pub api_key: String,

    /// Zone name (e.g., "example.com")
    pub zone: String,

    /// Fully-qualified name whose records are managed (e.g., "edge.example.com")
    pub subdomain: String,

    /// Provider zone identifier, resolved during `init` when possible
    pub zone_id: Option<String>,

    /// TTL for newly created records
    pub ttl: u32,

    /// Whether created records go through the provider's proxy
    pub proxied: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("zone", &self.zone)
            .field("subdomain", &self.subdomain)
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl Configuration {
    /// Create a configuration with default TTL and no cached zone id
    ///
    /// Zone and subdomain are normalized (lowercase, no trailing dot).
    /// Call [`Configuration::validate`] before using the result.
    pub fn new(
        email: impl Into<String>,
        api_key: impl Into<String>,
        zone: impl AsRef<str>,
        subdomain: impl AsRef<str>,
    ) -> Self {
        Self {
            email: email.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            zone: normalize_domain(zone.as_ref()),
            subdomain: normalize_domain(subdomain.as_ref()),
            zone_id: None,
            ttl: DEFAULT_TTL,
            proxied: false,
        }
    }

    /// Set the cached zone identifier
    pub fn with_zone_id(mut self, zone_id: impl Into<String>) -> Self {
        let zone_id = zone_id.into();
        self.zone_id = if zone_id.trim().is_empty() {
            None
        } else {
            Some(zone_id.trim().to_string())
        };
        self
    }

    /// Set the TTL for created records
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable proxying for created records
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Validate the configuration
    ///
    /// All four required fields must be non-empty, the zone must look like a
    /// domain name, and the subdomain must be the zone itself or live under it.
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(Error::config("email cannot be empty"));
        }
        if !self.email.contains('@') {
            return Err(Error::config(format!(
                "email '{}' does not look like an email address",
                self.email
            )));
        }
        if self.api_key.is_empty() {
            return Err(Error::config("api_key cannot be empty"));
        }
        if self.zone.is_empty() {
            return Err(Error::config("zone cannot be empty"));
        }
        if self.subdomain.is_empty() {
            return Err(Error::config("subdomain cannot be empty"));
        }

        validate_domain_name(&self.zone)?;
        if !self.zone.contains('.') {
            return Err(Error::config(format!(
                "zone '{}' must have at least two labels (e.g., example.com)",
                self.zone
            )));
        }

        validate_domain_name(&self.subdomain)?;
        if !is_within_zone(&self.subdomain, &self.zone) {
            return Err(Error::config(format!(
                "subdomain '{}' is not inside zone '{}'",
                self.subdomain, self.zone
            )));
        }

        if self.ttl != 1 && !(60..=86400).contains(&self.ttl) {
            return Err(Error::config(format!(
                "ttl must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                self.ttl
            )));
        }

        Ok(())
    }
}

/// Lowercase, trim, and drop a trailing root dot
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `name` is `zone` or a name below it
pub fn is_within_zone(name: &str, zone: &str) -> bool {
    name == zone
        || name
            .strip_suffix(zone)
            .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, allowed characters,
/// and no leading/trailing hyphen.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    // RFC 1035: 253 chars max
    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Total attempts per provider call (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Maximum number of creates (or deletes) in flight at once
    ///
    /// Keep this small: the provider API is rate limited.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("max_attempts must be at least 1"));
        }
        if self.backoff_multiplier == 0 {
            return Err(Error::config("backoff_multiplier must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_concurrency() -> usize {
    4
}
