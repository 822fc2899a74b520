//! Collection orchestrator: active channels -> collectors -> raw store.
//!
//! Per-channel and per-order failures are logged and counted, never
//! propagated; one channel's outage does not block the others.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use oms_collect::{CollectorRegistry, OrderCollector};
use oms_schemas::CollectedOrder;
use serde::Serialize;

use crate::raw_store::RawOrderStore;
use crate::store::OmsStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCollectReport {
    pub channel_code: String,
    /// Orders returned by the collector.
    pub collected: usize,
    /// Newly stored raw orders.
    pub stored: usize,
    /// Already stored (overlapping windows, redelivery).
    pub duplicates: usize,
    pub save_failures: usize,
    /// The collector call itself failed; counted as zero orders.
    pub collector_failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub channels: Vec<ChannelCollectReport>,
    /// Active channels with no registered collector.
    pub skipped: Vec<String>,
}

impl CollectionReport {
    pub fn collected(&self) -> usize {
        self.channels.iter().map(|c| c.collected).sum()
    }

    pub fn stored(&self) -> usize {
        self.channels.iter().map(|c| c.stored).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.channels.iter().map(|c| c.duplicates).sum()
    }

    pub fn save_failures(&self) -> usize {
        self.channels.iter().map(|c| c.save_failures).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorStatus {
    pub channel_code: String,
    pub collector_type: String,
    pub connected: bool,
}

pub struct CollectionOrchestrator {
    store: Arc<dyn OmsStore>,
    registry: Arc<CollectorRegistry>,
    raw: RawOrderStore,
}

impl CollectionOrchestrator {
    pub fn new(store: Arc<dyn OmsStore>, registry: Arc<CollectorRegistry>) -> Self {
        let raw = RawOrderStore::new(Arc::clone(&store));
        Self {
            store,
            registry,
            raw,
        }
    }

    /// Collect `[start, end)` from every active channel.
    ///
    /// Each attempted channel gets `last_collected_at` updated whether or
    /// not its collection succeeded.
    pub async fn collect_all_channels(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CollectionReport> {
        let channels = self.store.active_channels().await?;
        tracing::info!(
            %start,
            %end,
            active_channels = channels.len(),
            collectors = ?self.registry.list(),
            "collection started"
        );

        let mut report = CollectionReport::default();
        for channel in channels {
            let Some(collector) = self.registry.get(&channel.code) else {
                tracing::warn!(channel = %channel.code, "no collector registered, skipping");
                report.skipped.push(channel.code);
                continue;
            };

            let (_, ch_report) = self.collect_with(collector.as_ref(), start, end).await;

            if let Err(e) = self
                .store
                .touch_channel_collected(channel.id, Utc::now())
                .await
            {
                tracing::error!(channel = %channel.code, error = %format!("{e:#}"), "last_collected_at update failed");
            }
            report.channels.push(ch_report);
        }

        tracing::info!(
            collected = report.collected(),
            stored = report.stored(),
            duplicates = report.duplicates(),
            save_failures = report.save_failures(),
            skipped = report.skipped.len(),
            "collection finished"
        );
        Ok(report)
    }

    /// Targeted re-collection of one channel. Errors if no collector is
    /// registered for `channel_code`. Does not touch `last_collected_at`.
    pub async fn collect_by_channel(
        &self,
        channel_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(Vec<CollectedOrder>, ChannelCollectReport)> {
        let collector = self
            .registry
            .get(channel_code)
            .ok_or_else(|| anyhow!("no collector registered for channel {channel_code}"))?;
        Ok(self.collect_with(collector.as_ref(), start, end).await)
    }

    /// Type and liveness of every registered collector.
    pub async fn collector_status(&self) -> Vec<CollectorStatus> {
        Self::registry_status(&self.registry).await
    }

    /// Status of `registry` without a store, for config-only callers.
    pub async fn registry_status(registry: &CollectorRegistry) -> Vec<CollectorStatus> {
        let mut out = Vec::with_capacity(registry.len());
        for c in registry.iter() {
            out.push(CollectorStatus {
                channel_code: c.channel_code().to_string(),
                collector_type: c.collector_type().to_string(),
                connected: c.test_connection().await,
            });
        }
        out
    }

    async fn collect_with(
        &self,
        collector: &dyn OrderCollector,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (Vec<CollectedOrder>, ChannelCollectReport) {
        let code = collector.channel_code().to_string();
        let mut report = ChannelCollectReport {
            channel_code: code.clone(),
            ..Default::default()
        };

        let orders = match collector.collect_orders(start, end).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(channel = %code, error = %e, "collector failed");
                report.collector_failed = true;
                Vec::new()
            }
        };
        report.collected = orders.len();

        let now = Utc::now();
        for order in &orders {
            match self.raw.save_raw_order(order, now).await {
                Ok(saved) if saved.created => report.stored += 1,
                Ok(_) => report.duplicates += 1,
                Err(e) => {
                    report.save_failures += 1;
                    tracing::error!(
                        channel = %code,
                        channel_order_no = %order.channel_order_no,
                        error = %format!("{e:#}"),
                        "raw order save failed"
                    );
                }
            }
        }

        tracing::info!(
            channel = %code,
            collected = report.collected,
            stored = report.stored,
            duplicates = report.duplicates,
            "channel collected"
        );
        (orders, report)
    }
}
