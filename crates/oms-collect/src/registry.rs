//! Collector registry, keyed by channel code.
//!
//! Insertion order is preserved so `list()` output and collector status
//! reports are deterministic. Codes are compared case-sensitively.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use oms_config::{secrets, CollectorConfig, OmsConfig};

use crate::collector::OrderCollector;
use crate::http::HttpCollector;
use crate::mock::MockCollector;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A collector for this channel code is already registered.
    DuplicateChannel { code: String },
    /// No collector is registered for this channel code.
    UnknownChannel { code: String },
    /// The collector reported an empty channel code.
    EmptyCode,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateChannel { code } => {
                write!(f, "a collector for channel '{code}' is already registered")
            }
            Self::UnknownChannel { code } => {
                write!(f, "no collector registered for channel '{code}'")
            }
            Self::EmptyCode => write!(f, "collector channel code must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Default, Clone)]
pub struct CollectorRegistry {
    entries: Vec<Arc<dyn OrderCollector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// - [`RegistryError::EmptyCode`] if the collector's code is blank.
    /// - [`RegistryError::DuplicateChannel`] if the code is already taken.
    pub fn register(&mut self, collector: Arc<dyn OrderCollector>) -> Result<(), RegistryError> {
        let code = collector.channel_code();
        if code.trim().is_empty() {
            return Err(RegistryError::EmptyCode);
        }
        if self.contains(code) {
            return Err(RegistryError::DuplicateChannel {
                code: code.to_string(),
            });
        }
        self.entries.push(collector);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn OrderCollector>> {
        self.entries
            .iter()
            .find(|c| c.channel_code() == code)
            .cloned()
    }

    pub fn require(&self, code: &str) -> Result<Arc<dyn OrderCollector>, RegistryError> {
        self.get(code).ok_or_else(|| RegistryError::UnknownChannel {
            code: code.to_string(),
        })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|c| c.channel_code() == code)
    }

    /// Registered channel codes in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|c| c.channel_code().to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OrderCollector>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build collectors from the `collectors` config section.
    ///
    /// `kind: mock` is only available for the built-in channels; HTTP
    /// collectors resolve their API key from the named env var here.
    pub fn from_config(cfg: &OmsConfig) -> Result<Self> {
        let mut reg = Self::new();
        for (code, c) in &cfg.collectors {
            let collector: Arc<dyn OrderCollector> = match c {
                CollectorConfig::Mock => Arc::new(
                    MockCollector::for_channel(code)
                        .ok_or_else(|| anyhow!("no built-in mock collector for channel '{code}'"))?,
                ),
                CollectorConfig::Http {
                    base_url,
                    timeout_secs,
                    ..
                } => {
                    let key = secrets::resolve_collector_key(code, c)?;
                    Arc::new(
                        HttpCollector::new(code, base_url, key, *timeout_secs)
                            .with_context(|| format!("http collector for '{code}'"))?,
                    )
                }
            };
            reg.register(collector)
                .with_context(|| format!("register collector '{code}'"))?;
        }
        Ok(reg)
    }
}
