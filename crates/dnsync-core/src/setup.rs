//! Interactive setup
//!
//! `dnsync init` asks for four values. How they are asked (terminal, test
//! script) is behind [`Collector`]; turning the answers into a validated
//! [`Configuration`] is [`collect_configuration`], which has no side effects
//! of its own.

use crate::config::Configuration;
use crate::error::Result;

/// A value asked for during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Email,
    ApiKey,
    Zone,
    Subdomain,
}

impl SetupField {
    /// All fields, in the order they are asked
    pub const ALL: [SetupField; 4] = [
        SetupField::Email,
        SetupField::ApiKey,
        SetupField::Zone,
        SetupField::Subdomain,
    ];

    /// Human-readable prompt text
    pub fn label(&self) -> &'static str {
        match self {
            SetupField::Email => "Cloudflare account email",
            SetupField::ApiKey => "Cloudflare global API key",
            SetupField::Zone => "Zone (e.g., example.com)",
            SetupField::Subdomain => "Subdomain to manage (e.g., edge.example.com)",
        }
    }

    /// Whether the current value must not be echoed back
    pub fn is_secret(&self) -> bool {
        matches!(self, SetupField::ApiKey)
    }
}

/// Source of setup answers
pub trait Collector {
    /// Ask for one field
    ///
    /// `current` is the value already on disk, if any. Returning an empty
    /// string keeps it.
    fn prompt(&mut self, field: SetupField, current: Option<&str>) -> Result<String>;
}

/// Ask every field and build a validated configuration
///
/// Optional settings (`zone_id`, `ttl`, `proxied`) carry over from
/// `existing`. A cached `zone_id` is dropped when the zone changes.
pub fn collect_configuration(
    collector: &mut dyn Collector,
    existing: Option<&Configuration>,
) -> Result<Configuration> {
    let mut answers: [String; 4] = Default::default();

    for (slot, field) in answers.iter_mut().zip(SetupField::ALL) {
        let current = existing.map(|c| current_value(c, field));
        let answer = collector.prompt(field, current)?;
        let answer = answer.trim();

        *slot = if answer.is_empty() {
            current.unwrap_or_default().to_string()
        } else {
            answer.to_string()
        };
    }

    let [email, api_key, zone, subdomain] = answers;
    let mut config = Configuration::new(email, api_key, zone, subdomain);

    if let Some(previous) = existing {
        config = config.with_ttl(previous.ttl).with_proxied(previous.proxied);
        if previous.zone == config.zone {
            config.zone_id = previous.zone_id.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

fn current_value(config: &Configuration, field: SetupField) -> &str {
    match field {
        SetupField::Email => &config.email,
        SetupField::ApiKey => &config.api_key,
        SetupField::Zone => &config.zone,
        SetupField::Subdomain => &config.subdomain,
    }
}

/// Collector that replays canned answers, in field order
#[derive(Debug, Default)]
pub struct ScriptedCollector {
    answers: Vec<String>,
    asked: Vec<SetupField>,
}

impl ScriptedCollector {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut answers: Vec<String> = answers.into_iter().map(Into::into).collect();
        answers.reverse();
        Self {
            answers,
            asked: Vec::new(),
        }
    }

    /// Fields asked so far
    pub fn asked(&self) -> &[SetupField] {
        &self.asked
    }
}

impl Collector for ScriptedCollector {
    fn prompt(&mut self, field: SetupField, _current: Option<&str>) -> Result<String> {
        self.asked.push(field);
        // Running out of answers behaves like pressing enter
        Ok(self.answers.pop().unwrap_or_default())
    }
}
