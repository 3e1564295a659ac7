//! Ingestion configuration
//!
//! Loaded from `INGEST_*` environment variables, with a builder-style API for
//! tests and embedding.

use nameswipe_common::env::{secs_or, var_or};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{IngestError, Result};

/// Placeholder replaced by the upper-case source code in the URL template
pub const SOURCE_PLACEHOLDER: &str = "{source}";

pub const DEFAULT_SOURCE_URL_TEMPLATE: &str = "http://localhost:8080/extended-dataset/{source}.csv";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_CLEANUP_GRACE_SECS: u64 = 5;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROGRESS_LOG_EVERY: u64 = 10_000;
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Ingestion run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Dataset URL, with `{source}` standing in for the source code
    pub source_url_template: String,
    /// Accepted records per catalog write
    pub batch_size: usize,
    /// How long a finished run stays visible in the status report
    pub cleanup_grace: Duration,
    /// Maximum wait for the next piece of the response body
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    /// Emit a progress log line every this many processed records
    pub progress_log_every: u64,
    /// Progress events buffered per subscriber before it starts lagging
    pub event_capacity: usize,
    /// Names rejected for one source only, keyed by upper-case source code
    pub country_blacklists: BTreeMap<String, Vec<String>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_url_template: DEFAULT_SOURCE_URL_TEMPLATE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            cleanup_grace: Duration::from_secs(DEFAULT_CLEANUP_GRACE_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            progress_log_every: DEFAULT_PROGRESS_LOG_EVERY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            country_blacklists: BTreeMap::new(),
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            source_url_template: std::env::var("INGEST_SOURCE_URL_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_SOURCE_URL_TEMPLATE.to_string()),
            batch_size: var_or("INGEST_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            cleanup_grace: secs_or("INGEST_CLEANUP_GRACE_SECS", DEFAULT_CLEANUP_GRACE_SECS)?,
            idle_timeout: secs_or("INGEST_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?,
            connect_timeout: secs_or("INGEST_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            progress_log_every: var_or("INGEST_PROGRESS_LOG_EVERY", DEFAULT_PROGRESS_LOG_EVERY)?,
            event_capacity: var_or("INGEST_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?,
            country_blacklists: match std::env::var("INGEST_COUNTRY_BLACKLIST") {
                Ok(value) => parse_country_blacklists(&value)?,
                Err(_) => BTreeMap::new(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.source_url_template.contains(SOURCE_PLACEHOLDER) {
            return Err(IngestError::Config(format!(
                "INGEST_SOURCE_URL_TEMPLATE must contain {}",
                SOURCE_PLACEHOLDER
            )));
        }
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "INGEST_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(IngestError::Config(
                "INGEST_IDLE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if self.progress_log_every == 0 {
            return Err(IngestError::Config(
                "INGEST_PROGRESS_LOG_EVERY must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(IngestError::Config(
                "INGEST_EVENT_CAPACITY must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Dataset URL for an upper-case source code
    pub fn url_for(&self, source: &str) -> String {
        self.source_url_template.replace(SOURCE_PLACEHOLDER, source)
    }

    pub fn with_source_url_template(mut self, template: impl Into<String>) -> Self {
        self.source_url_template = template.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace = grace;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_progress_log_every(mut self, every: u64) -> Self {
        self.progress_log_every = every;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_country_blacklist<I, S>(mut self, country: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country_blacklists
            .entry(country.trim().to_uppercase())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }
}

/// Parse `DE=Kevin,Chantal;US=Bud` into per-source name lists
fn parse_country_blacklists(value: &str) -> anyhow::Result<BTreeMap<String, Vec<String>>> {
    let mut blacklists: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in value.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (country, names) = entry.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("Invalid INGEST_COUNTRY_BLACKLIST entry: {} (expected CODE=name,...)", entry)
        })?;
        let country = country.trim().to_uppercase();
        if country.is_empty() {
            anyhow::bail!("Invalid INGEST_COUNTRY_BLACKLIST entry: {} (missing source code)", entry);
        }

        blacklists.entry(country).or_default().extend(
            names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
    }

    Ok(blacklists)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.cleanup_grace, Duration::from_secs(5));
        assert_eq!(
            config.url_for("FR"),
            "http://localhost:8080/extended-dataset/FR.csv"
        );
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let config = IngestConfig::default().with_source_url_template("http://example.com/names.csv");
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(IngestConfig::default().with_batch_size(0).validate().is_err());
        assert!(IngestConfig::default()
            .with_idle_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(IngestConfig::default().with_progress_log_every(0).validate().is_err());
        assert!(IngestConfig::default().with_event_capacity(0).validate().is_err());
    }

    #[test]
    fn test_parse_country_blacklists() {
        let parsed = parse_country_blacklists(" de=Kevin, Chantal ;US=Bud;; ").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["DE"], vec!["Kevin", "Chantal"]);
        assert_eq!(parsed["US"], vec!["Bud"]);

        assert!(parse_country_blacklists("").unwrap().is_empty());
        assert!(parse_country_blacklists("Kevin").is_err());
        assert!(parse_country_blacklists("=Kevin").is_err());
    }

    #[test]
    fn test_with_country_blacklist_merges() {
        let config = IngestConfig::default()
            .with_country_blacklist("de", ["Kevin"])
            .with_country_blacklist("DE", ["Chantal"]);
        assert_eq!(config.country_blacklists["DE"], vec!["Kevin", "Chantal"]);
    }
}
