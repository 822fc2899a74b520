//! Command handlers for the `oms` binary.
//!
//! Shared setup (config loading, store and orchestrator wiring, time
//! windows) lives here; the pipeline commands live in [`pipeline`].

pub mod pipeline;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use oms_collect::CollectorRegistry;
use oms_config::{LoadedConfig, OmsConfig, UnusedKeyPolicy};
use oms_pipeline::{
    CollectionOrchestrator, OmsStore, PgStore, ProcessingOrchestrator, ProcessingSettings,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Layered YAML when paths are given, built-in defaults otherwise.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, OmsConfig)> {
    let loaded = if paths.is_empty() {
        oms_config::load_defaults()?
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        oms_config::load_layered_yaml(&refs)?
    };

    let report = oms_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for p in &report.unused_leaf_pointers {
        tracing::warn!(pointer = %p, "unused config key");
    }

    let cfg = loaded.typed()?;
    Ok((loaded, cfg))
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Services {
    pub store: Arc<dyn OmsStore>,
    pub collection: Arc<CollectionOrchestrator>,
    pub processing: Arc<ProcessingOrchestrator>,
}

pub async fn services(cfg: &OmsConfig) -> Result<Services> {
    let pool = oms_db::connect_from_env().await?;
    let store: Arc<dyn OmsStore> = Arc::new(PgStore::new(pool));
    let registry = Arc::new(CollectorRegistry::from_config(cfg)?);
    let settings = ProcessingSettings::from_config(cfg)?;
    Ok(Services {
        collection: Arc::new(CollectionOrchestrator::new(Arc::clone(&store), registry)),
        processing: Arc::new(ProcessingOrchestrator::new(Arc::clone(&store), settings)),
        store,
    })
}

/// Config plus database-backed services, for every command that touches
/// the store.
pub async fn connect(paths: &[String]) -> Result<(OmsConfig, Services)> {
    let (_, cfg) = load_config(paths)?;
    let svc = services(&cfg).await?;
    Ok((cfg, svc))
}

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// `[from, to)` from explicit RFC 3339 bounds, or the last `minutes`
/// ending at `now`. A lone `--from` runs to `now`.
pub fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    minutes: i64,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let parse = |s: &str, flag: &str| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .with_context(|| format!("{flag} must be RFC 3339 (e.g. 2026-03-01T09:00:00Z): {s}"))
    };

    let end = match to {
        Some(s) => parse(s, "--to")?,
        None => now,
    };
    let start = match from {
        Some(s) => parse(s, "--from")?,
        None => {
            if minutes <= 0 {
                bail!("--minutes must be > 0");
            }
            match Duration::try_minutes(minutes).and_then(|d| end.checked_sub_signed(d)) {
                Some(start) => start,
                None => bail!("--minutes {minutes} is out of range"),
            }
        }
    };
    if start >= end {
        bail!("empty window: {start} >= {end}");
    }
    Ok((start, end))
}
