// # Config Store
//
// File-backed persistence for `Configuration`.
//
// ## File Format
//
// Flat `key=value` text, one pair per line:
//
// ```text
// email=ops@example.com
// api_key=0123456789abcdef
// zone=example.com
// subdomain=edge.example.com
// zone_id=023e105f4ecef8ad9ca31a8372d0c353
// ttl=60
// proxied=false
// ```
//
// `email`, `api_key`, `zone` and `subdomain` are required; the rest are
// optional. Blank lines and `#` comments are ignored.
//
// ## Atomic Writes
//
// `save()` writes the whole file to `<path>.tmp`, syncs it, then renames it
// over the target. Readers either see the old file or the new one.
//
// Two operators running `init` at the same time may still race; last
// rename wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::{Configuration, DEFAULT_TTL};
use crate::error::{Error, Result};

const KEY_EMAIL: &str = "email";
const KEY_API_KEY: &str = "api_key";
const KEY_ZONE: &str = "zone";
const KEY_SUBDOMAIN: &str = "subdomain";
const KEY_ZONE_ID: &str = "zone_id";
const KEY_TTL: &str = "ttl";
const KEY_PROXIED: &str = "proxied";

const KNOWN_KEYS: [&str; 7] = [
    KEY_EMAIL,
    KEY_API_KEY,
    KEY_ZONE,
    KEY_SUBDOMAIN,
    KEY_ZONE_ID,
    KEY_TTL,
    KEY_PROXIED,
];

/// Loads and saves the persisted [`Configuration`]
///
/// # Example
///
/// ```rust,no_run
/// use dnsync_core::{ConfigStore, Configuration};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = ConfigStore::new("settings.txt");
///
///     let config = Configuration::new("ops@example.com", "key", "example.com", "edge.example.com");
///     store.save(&config).await?;
///
///     let loaded = store.load().await?;
///     assert_eq!(loaded, config);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a settings file exists yet
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate the configuration
    ///
    /// # Returns
    ///
    /// - `Err(Error::ConfigMissing)`: the file does not exist
    /// - `Err(Error::ConfigInvalid)`: the file is malformed or fails validation
    pub async fn load(&self) -> Result<Configuration> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigMissing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config = parse_settings(&content)?;
        config.validate()?;

        tracing::debug!(
            "Loaded configuration from {} (zone: {}, subdomain: {})",
            self.path.display(),
            config.zone,
            config.subdomain
        );
        Ok(config)
    }

    /// Validate and persist the configuration, replacing the file wholesale
    pub async fn save(&self, config: &Configuration) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = render_settings(config);
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::Other(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            restrict_permissions(&temp_path).await?;

            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::Other(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Parse `key=value` settings text into a configuration
///
/// Does not call [`Configuration::validate`]; [`ConfigStore::load`] does.
pub fn parse_settings(content: &str) -> Result<Configuration> {
    let mut values: HashMap<&str, &str> = HashMap::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::config(format!(
                "line {}: expected key=value, got '{}'",
                index + 1,
                line
            ))
        })?;
        let key = key.trim();
        let value = value.trim();

        if !KNOWN_KEYS.contains(&key) {
            tracing::warn!("Ignoring unknown settings key '{}' on line {}", key, index + 1);
            continue;
        }

        if values.insert(key, value).is_some() {
            return Err(Error::config(format!(
                "line {}: duplicate key '{}'",
                index + 1,
                key
            )));
        }
    }

    let required = |key: &str| -> Result<&str> {
        match values.get(key) {
            Some(v) if !v.is_empty() => Ok(*v),
            Some(_) => Err(Error::config(format!("'{}' is empty", key))),
            None => Err(Error::config(format!("missing required key '{}'", key))),
        }
    };

    let mut config = Configuration::new(
        required(KEY_EMAIL)?,
        required(KEY_API_KEY)?,
        required(KEY_ZONE)?,
        required(KEY_SUBDOMAIN)?,
    );

    if let Some(zone_id) = values.get(KEY_ZONE_ID) {
        config = config.with_zone_id(*zone_id);
    }

    config.ttl = match values.get(KEY_TTL) {
        Some(v) if !v.is_empty() => v
            .parse()
            .map_err(|_| Error::config(format!("ttl '{}' is not a number", v)))?,
        _ => DEFAULT_TTL,
    };

    config.proxied = match values.get(KEY_PROXIED).map(|v| v.to_ascii_lowercase()) {
        None => false,
        Some(v) => match v.as_str() {
            "" | "false" | "no" | "0" => false,
            "true" | "yes" | "1" => true,
            other => {
                return Err(Error::config(format!(
                    "proxied must be true or false. Got: '{}'",
                    other
                )));
            }
        },
    };

    Ok(config)
}

/// Render a configuration as `key=value` settings text
pub fn render_settings(config: &Configuration) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}={}\n", KEY_EMAIL, config.email));
    out.push_str(&format!("{}={}\n", KEY_API_KEY, config.api_key));
    out.push_str(&format!("{}={}\n", KEY_ZONE, config.zone));
    out.push_str(&format!("{}={}\n", KEY_SUBDOMAIN, config.subdomain));
    if let Some(zone_id) = &config.zone_id {
        out.push_str(&format!("{}={}\n", KEY_ZONE_ID, zone_id));
    }
    out.push_str(&format!("{}={}\n", KEY_TTL, config.ttl));
    out.push_str(&format!("{}={}\n", KEY_PROXIED, config.proxied));
    out
}
