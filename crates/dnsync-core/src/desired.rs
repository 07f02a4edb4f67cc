//! Desired-state input
//!
//! Reads the newline-delimited address list that says what the subdomain
//! should resolve to. The whole read fails on the first bad line: publishing
//! a partial list would delete records the operator meant to keep.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;
use tokio::fs;

use crate::error::{Error, Result};

/// Set of addresses the subdomain should resolve to
///
/// Ordered so that plans and reports come out deterministic.
/// An empty set is valid and means "remove every record".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredAddressSet {
    addresses: BTreeSet<IpAddr>,
}

impl DesiredAddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address, returning false if it was already present
    pub fn insert(&mut self, address: IpAddr) -> bool {
        self.addresses.insert(address)
    }

    pub fn contains(&self, address: &IpAddr) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterate in address order
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addresses.iter()
    }
}

impl FromIterator<IpAddr> for DesiredAddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DesiredAddressSet {
    type Item = &'a IpAddr;
    type IntoIter = std::collections::btree_set::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.iter()
    }
}

/// Read the desired address list from a file
///
/// # Returns
///
/// - `Err(Error::FileMissing)`: the file does not exist
/// - `Err(Error::Parse)`: a non-blank line is not an IP literal
pub async fn read_desired_addresses<P: AsRef<Path>>(path: P) -> Result<DesiredAddressSet> {
    let path = path.as_ref();

    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let set = parse_desired_bytes(&content)?;
    tracing::info!("Read {} desired address(es) from {}", set.len(), path.display());
    Ok(set)
}

/// Parse newline-delimited IP literals
///
/// Lines are trimmed; blank lines are skipped; duplicates collapse.
pub fn parse_desired_addresses(content: &str) -> Result<DesiredAddressSet> {
    parse_desired_bytes(content.as_bytes())
}

/// Parse raw file content
///
/// A line that is not valid UTF-8 is a parse error on that line.
pub fn parse_desired_bytes(content: &[u8]) -> Result<DesiredAddressSet> {
    let mut set = DesiredAddressSet::new();

    for (index, raw) in content.split(|b| *b == b'\n').enumerate() {
        let line_number = index + 1;
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::Parse {
                line: line_number,
                content: String::from_utf8_lossy(raw).trim().to_string(),
                reason: e.to_string(),
            })?
            .trim();
        if line.is_empty() {
            continue;
        }

        let address: IpAddr = line.parse().map_err(|e: std::net::AddrParseError| Error::Parse {
            line: line_number,
            content: line.to_string(),
            reason: e.to_string(),
        })?;

        if !set.insert(address) {
            tracing::debug!("Duplicate address {} on line {}", address, line_number);
        }
    }

    Ok(set)
}
