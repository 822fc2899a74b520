use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

/// Typed configuration. Every section is optional in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmsConfig {
    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Channel product code -> internal product code.
    #[serde(default)]
    pub product_mappings: BTreeMap<String, String>,
    /// Channel code -> collector. Replaces the default set as a whole when present.
    #[serde(default = "default_collectors")]
    pub collectors: BTreeMap<String, CollectorConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// IANA zone whose calendar day scopes order numbers and "today" stats.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Width of the rolling window each scheduled collection covers.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: i64,
    /// Re-collect the previous business day at midnight.
    #[serde(default = "default_true")]
    pub daily_recollect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// A claim older than this is considered abandoned.
    #[serde(default = "default_claim_ttl_secs")]
    pub claim_ttl_secs: u64,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Business-timezone hour at which the daily stats line is logged.
    #[serde(default = "default_stats_hour")]
    pub stats_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CollectorConfig {
    /// Deterministic built-in collector (NAVER, COUPANG, 11ST).
    Mock,
    /// Generic JSON-over-HTTP collector.
    Http {
        base_url: String,
        /// NAME of the env var holding the API key.
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_interval_secs() -> u64 {
    600
}
fn default_initial_delay_secs() -> u64 {
    60
}
fn default_lookback_minutes() -> i64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_claim_ttl_secs() -> u64 {
    300
}
fn default_retry_interval_secs() -> u64 {
    3600
}
fn default_stats_hour() -> u32 {
    9
}

fn default_collectors() -> BTreeMap<String, CollectorConfig> {
    ["NAVER", "COUPANG", "11ST"]
        .into_iter()
        .map(|c| (c.to_string(), CollectorConfig::Mock))
        .collect()
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            lookback_minutes: default_lookback_minutes(),
            daily_recollect: true,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            claim_ttl_secs: default_claim_ttl_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            worker_id: None,
            stats_hour: default_stats_hour(),
        }
    }
}

impl Default for OmsConfig {
    fn default() -> Self {
        Self {
            business: BusinessConfig::default(),
            collection: CollectionConfig::default(),
            processing: ProcessingConfig::default(),
            product_mappings: BTreeMap::new(),
            collectors: default_collectors(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading / validation
// ---------------------------------------------------------------------------

/// Upper bound for every `*_secs` setting: one week.
pub const MAX_PERIOD_SECS: u64 = 7 * 24 * 3600;
/// Upper bound for `collection.lookback_minutes`: 31 days.
pub const MAX_LOOKBACK_MINUTES: i64 = 31 * 24 * 60;

fn check_secs(key: &str, v: u64, min: u64) -> Result<()> {
    if !(min..=MAX_PERIOD_SECS).contains(&v) {
        bail!("CONFIG_INVALID {key} must be {min}..={MAX_PERIOD_SECS}, got {v}");
    }
    Ok(())
}

impl OmsConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: OmsConfig =
            serde_json::from_value(v.clone()).context("config does not match OmsConfig")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.business.tz()?;
        check_secs("collection.interval_secs", self.collection.interval_secs, 1)?;
        check_secs("collection.initial_delay_secs", self.collection.initial_delay_secs, 0)?;
        check_secs("processing.claim_ttl_secs", self.processing.claim_ttl_secs, 1)?;
        check_secs("processing.retry_interval_secs", self.processing.retry_interval_secs, 1)?;
        if !(1..=MAX_LOOKBACK_MINUTES).contains(&self.collection.lookback_minutes) {
            bail!(
                "CONFIG_INVALID collection.lookback_minutes must be 1..={MAX_LOOKBACK_MINUTES}, got {}",
                self.collection.lookback_minutes
            );
        }
        if self.processing.stats_hour > 23 {
            bail!("CONFIG_INVALID processing.stats_hour must be 0..=23");
        }
        for (code, c) in &self.collectors {
            if code.trim().is_empty() {
                bail!("CONFIG_INVALID collectors: empty channel code");
            }
            if let CollectorConfig::Http { base_url, .. } = c {
                if base_url.trim().is_empty() {
                    bail!("CONFIG_INVALID collectors.{code}.base_url is empty");
                }
            }
        }
        for (from, to) in &self.product_mappings {
            if from.trim().is_empty() || to.trim().is_empty() {
                bail!("CONFIG_INVALID product_mappings: empty code in '{from}' -> '{to}'");
            }
        }
        Ok(())
    }

    /// Configured worker id, or one derived from host and pid.
    pub fn worker_id(&self) -> String {
        if let Some(id) = self.processing.worker_id.as_deref() {
            if !id.trim().is_empty() {
                return id.trim().to_string();
            }
        }
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "oms".to_string());
        format!("{}-{}", host, std::process::id())
    }
}

impl BusinessConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("CONFIG_INVALID business.timezone '{}': {}", self.timezone, e))
    }
}
