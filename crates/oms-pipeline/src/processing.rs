//! Processing orchestrator: drain unprocessed raw orders into canonical
//! orders.
//!
//! Each raw order is handled independently: claim, decode, normalize, mint
//! an order number, commit. A failure marks that raw order errored (it stays
//! eligible for retry) and the drain continues.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use oms_config::OmsConfig;
use oms_db::CommitOutcome;
use oms_normalize::{normalize, ProductCodeMap};
use oms_schemas::{Order, RawOrder, RawPayload, SalesChannel};
use serde::Serialize;
use uuid::Uuid;

use crate::calendar::{business_day, day_bounds_utc};
use crate::raw_store::RawOrderStore;
use crate::sequence::SequenceGenerator;
use crate::store::OmsStore;

#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    /// Claimant identity recorded on claimed raw orders.
    pub worker_id: String,
    pub claim_ttl_secs: i64,
    pub tz: Tz,
    /// Configured mappings; stored mappings override them per drain.
    pub product_mappings: ProductCodeMap,
}

impl ProcessingSettings {
    pub fn from_config(cfg: &OmsConfig) -> Result<Self> {
        Ok(Self {
            worker_id: cfg.worker_id(),
            claim_ttl_secs: i64::try_from(cfg.processing.claim_ttl_secs)
                .context("processing.claim_ttl_secs out of range")?,
            tz: cfg.business.tz()?,
            product_mappings: cfg.product_mappings.clone().into_iter().collect(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Held by another worker's live claim, or the claim was lost before commit.
    pub skipped: usize,
    pub order_nos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStat {
    pub channel_code: String,
    pub channel_name: String,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub total_orders: i64,
    /// Orders placed on the current business day.
    pub today_orders: i64,
    pub unprocessed_orders: i64,
    pub errored_orders: i64,
    /// Busiest channel first.
    pub by_channel: Vec<ChannelStat>,
}

enum Outcome {
    Committed(Order),
    Skipped,
}

pub struct ProcessingOrchestrator {
    store: Arc<dyn OmsStore>,
    raw: RawOrderStore,
    sequence: SequenceGenerator,
    settings: ProcessingSettings,
}

impl ProcessingOrchestrator {
    pub fn new(store: Arc<dyn OmsStore>, settings: ProcessingSettings) -> Self {
        Self {
            raw: RawOrderStore::new(Arc::clone(&store)),
            sequence: SequenceGenerator::new(Arc::clone(&store), settings.tz),
            store,
            settings,
        }
    }

    pub fn raw_store(&self) -> &RawOrderStore {
        &self.raw
    }

    pub fn worker_id(&self) -> &str {
        &self.settings.worker_id
    }

    /// Drain every unprocessed raw order, oldest first.
    pub async fn process_unprocessed_orders(&self) -> Result<ProcessingReport> {
        let pending = self.raw.list_unprocessed(None).await?;
        self.drain(pending).await
    }

    /// Drain one channel's unprocessed raw orders.
    pub async fn process_channel(&self, channel_code: &str) -> Result<ProcessingReport> {
        let pending = self.raw.list_unprocessed(Some(channel_code)).await?;
        self.drain(pending).await
    }

    /// Process a single raw order by id. A failure is recorded on the raw
    /// order and returned.
    pub async fn process_raw_order(&self, raw_order_id: Uuid) -> Result<Option<Order>> {
        let products = self.product_codes().await?;
        let mut channels = HashMap::new();
        match self.process_one(raw_order_id, &products, &mut channels).await {
            Ok(Outcome::Committed(order)) => Ok(Some(order)),
            Ok(Outcome::Skipped) => Ok(None),
            Err(e) => {
                self.record_failure(raw_order_id, &e).await;
                Err(e)
            }
        }
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<ProcessingStats> {
        let (start, end) = day_bounds_utc(self.settings.tz, business_day(self.settings.tz, now))?;
        let counts = self.store.counts(start, end).await?;
        let by_channel = self
            .store
            .order_counts_by_channel()
            .await?
            .into_iter()
            .map(|c| ChannelStat {
                channel_code: c.channel_code,
                channel_name: c.channel_name,
                orders: c.orders,
            })
            .collect();
        Ok(ProcessingStats {
            total_orders: counts.total_orders,
            today_orders: counts.orders_in_window,
            unprocessed_orders: counts.unprocessed_raw_orders,
            errored_orders: counts.errored_raw_orders,
            by_channel,
        })
    }

    // -----------------------------------------------------------------------

    async fn drain(&self, pending: Vec<RawOrder>) -> Result<ProcessingReport> {
        tracing::info!(pending = pending.len(), worker = %self.settings.worker_id, "processing started");
        let products = self.product_codes().await?;
        let mut channels: HashMap<Uuid, SalesChannel> = HashMap::new();
        let mut report = ProcessingReport::default();

        for raw in &pending {
            match self.process_one(raw.id, &products, &mut channels).await {
                Ok(Outcome::Committed(order)) => {
                    report.succeeded += 1;
                    report.order_nos.push(order.order_no);
                }
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        raw_order_id = %raw.id,
                        channel_order_no = %raw.channel_order_no,
                        attempts = raw.attempts + 1,
                        error = %format!("{e:#}"),
                        "raw order processing failed"
                    );
                    self.record_failure(raw.id, &e).await;
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "processing finished"
        );
        Ok(report)
    }

    async fn record_failure(&self, raw_order_id: Uuid, err: &anyhow::Error) {
        let message = format!("{err:#}");
        match self
            .raw
            .mark_as_error(raw_order_id, &self.settings.worker_id, &message)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(raw_order_id = %raw_order_id, "error not recorded, raw order held elsewhere")
            }
            Err(e) => {
                tracing::error!(raw_order_id = %raw_order_id, error = %format!("{e:#}"), "mark_as_error failed")
            }
        }
    }

    async fn process_one(
        &self,
        raw_order_id: Uuid,
        products: &ProductCodeMap,
        channels: &mut HashMap<Uuid, SalesChannel>,
    ) -> Result<Outcome> {
        let now = Utc::now();
        let Some(raw) = self
            .store
            .claim_raw_order(
                raw_order_id,
                &self.settings.worker_id,
                self.settings.claim_ttl_secs,
                now,
            )
            .await?
        else {
            tracing::debug!(raw_order_id = %raw_order_id, "raw order not claimable, skipping");
            return Ok(Outcome::Skipped);
        };

        let payload = RawPayload::decode(&raw.raw_data).context("payload decode failed")?;
        if payload.order.channel_order_no != raw.channel_order_no {
            bail!(
                "payload channel_order_no '{}' does not match raw order '{}'",
                payload.order.channel_order_no,
                raw.channel_order_no
            );
        }

        let channel = match channels.get(&raw.channel_id) {
            Some(c) => c.clone(),
            None => {
                let c = self
                    .store
                    .channel_by_id(raw.channel_id)
                    .await?
                    .ok_or_else(|| anyhow!("channel {} not found", raw.channel_id))?;
                channels.insert(raw.channel_id, c.clone());
                c
            }
        };

        let draft = normalize(&payload.order, &raw, &channel, products, now)?;
        let order_no = self.sequence.next_order_no(now).await?;
        let order = draft.assign_order_no(order_no.to_string());

        match self.store.commit_order(&self.settings.worker_id, &order).await? {
            CommitOutcome::Committed => {
                tracing::info!(
                    channel = %channel.code,
                    channel_order_no = %order.channel_order_no,
                    order_no = %order.order_no,
                    status = %order.order_status,
                    "order created"
                );
                Ok(Outcome::Committed(order))
            }
            CommitOutcome::ClaimLost => {
                tracing::warn!(
                    raw_order_id = %raw.id,
                    order_no = %order.order_no,
                    "claim lost before commit, order number unused"
                );
                Ok(Outcome::Skipped)
            }
        }
    }

    async fn product_codes(&self) -> Result<ProductCodeMap> {
        let mut map = self.settings.product_mappings.clone();
        let stored = self
            .store
            .product_mappings()
            .await
            .context("load product mappings failed")?;
        map.merge(stored);
        Ok(map)
    }
}
