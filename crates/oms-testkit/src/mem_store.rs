use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use oms_db::{ChannelOrderCount, CommitOutcome};
use oms_pipeline::{OmsStore, OrderNo, StoreCounts};
use oms_schemas::{NewRawOrder, Order, RawOrder, SalesChannel};
use serde_json::Value;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    channels: Vec<SalesChannel>,
    raw: Vec<RawOrder>,
    orders: Vec<Order>,
    sequences: HashMap<NaiveDate, i32>,
    mappings: BTreeMap<String, String>,
}

/// In-memory `OmsStore`.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the active NAVER, COUPANG and 11ST channels.
    pub fn with_builtin_channels() -> Self {
        let s = Self::new();
        for (code, name) in [("NAVER", "Naver Smart Store"), ("COUPANG", "Coupang"), ("11ST", "11st")] {
            s.add_channel(SalesChannel::new(code, name));
        }
        s
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("mem store lock poisoned"))
    }

    fn guard(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_channel(&self, channel: SalesChannel) -> Uuid {
        let id = channel.id;
        self.guard().channels.push(channel);
        id
    }

    pub fn set_active(&self, code: &str, active: bool) {
        for c in self.guard().channels.iter_mut().filter(|c| c.code == code) {
            c.is_active = active;
        }
    }

    pub fn channel(&self, code: &str) -> Option<SalesChannel> {
        self.guard().channels.iter().find(|c| c.code == code).cloned()
    }

    pub fn set_product_mapping(&self, channel_product_code: &str, product_code: &str) {
        self.guard()
            .mappings
            .insert(channel_product_code.to_string(), product_code.to_string());
    }

    /// Store an arbitrary payload (e.g. a corrupt one) as a raw order.
    pub fn insert_raw_payload(
        &self,
        channel_code: &str,
        channel_order_no: &str,
        raw_data: Value,
        collected_at: DateTime<Utc>,
    ) -> Uuid {
        let mut g = self.guard();
        let channel_id = g
            .channels
            .iter()
            .find(|c| c.code == channel_code)
            .map(|c| c.id)
            .unwrap_or_else(Uuid::new_v4);
        let id = Uuid::new_v4();
        g.raw.push(new_raw_row(
            &NewRawOrder {
                id,
                channel_id,
                channel_order_no: channel_order_no.to_string(),
                raw_data,
                collected_at,
            },
            collected_at,
        ));
        id
    }

    /// Pretend `claimant` claimed the raw order at `at`.
    pub fn force_claim(&self, raw_order_id: Uuid, claimant: &str, at: DateTime<Utc>) {
        if let Some(r) = self.guard().raw.iter_mut().find(|r| r.id == raw_order_id) {
            r.claimed_by = Some(claimant.to_string());
            r.claimed_at = Some(at);
        }
    }

    /// Clear the processed flag, as if the mark was lost after the order
    /// was written.
    pub fn reopen_raw(&self, raw_order_id: Uuid) {
        if let Some(r) = self.guard().raw.iter_mut().find(|r| r.id == raw_order_id) {
            r.processed = false;
            r.processed_at = None;
        }
    }

    pub fn raw_orders(&self) -> Vec<RawOrder> {
        self.guard().raw.clone()
    }

    pub fn raw_order(&self, id: Uuid) -> Option<RawOrder> {
        self.guard().raw.iter().find(|r| r.id == id).cloned()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.guard().orders.clone()
    }
}

fn new_raw_row(new: &NewRawOrder, now: DateTime<Utc>) -> RawOrder {
    RawOrder {
        id: new.id,
        channel_id: new.channel_id,
        channel_order_no: new.channel_order_no.clone(),
        raw_data: new.raw_data.clone(),
        collected_at: new.collected_at,
        processed: false,
        processed_at: None,
        error_message: None,
        attempts: 0,
        claimed_by: None,
        claimed_at: None,
        created_at: now,
    }
}

#[async_trait::async_trait]
impl OmsStore for MemStore {
    async fn channel_by_code(&self, code: &str) -> Result<Option<SalesChannel>> {
        Ok(self.lock()?.channels.iter().find(|c| c.code == code).cloned())
    }

    async fn channel_by_id(&self, id: Uuid) -> Result<Option<SalesChannel>> {
        Ok(self.lock()?.channels.iter().find(|c| c.id == id).cloned())
    }

    async fn active_channels(&self) -> Result<Vec<SalesChannel>> {
        let mut out: Vec<_> = self
            .lock()?
            .channels
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }

    async fn touch_channel_collected(&self, channel_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        for c in self.lock()?.channels.iter_mut().filter(|c| c.id == channel_id) {
            c.last_collected_at = Some(at);
            c.updated_at = at;
        }
        Ok(())
    }

    async fn find_raw_order(
        &self,
        channel_id: Uuid,
        channel_order_no: &str,
    ) -> Result<Option<RawOrder>> {
        Ok(self
            .lock()?
            .raw
            .iter()
            .find(|r| r.channel_id == channel_id && r.channel_order_no == channel_order_no)
            .cloned())
    }

    async fn insert_raw_order_deduped(&self, new: &NewRawOrder) -> Result<(RawOrder, bool)> {
        let mut g = self.lock()?;
        if let Some(existing) = g
            .raw
            .iter()
            .find(|r| r.channel_id == new.channel_id && r.channel_order_no == new.channel_order_no)
        {
            return Ok((existing.clone(), false));
        }
        let row = new_raw_row(new, Utc::now());
        g.raw.push(row.clone());
        Ok((row, true))
    }

    async fn unprocessed_raw_orders(&self, channel_id: Option<Uuid>) -> Result<Vec<RawOrder>> {
        let mut out: Vec<_> = self
            .lock()?
            .raw
            .iter()
            .filter(|r| !r.processed && channel_id.map_or(true, |id| r.channel_id == id))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (a.collected_at, a.created_at, a.id).cmp(&(b.collected_at, b.created_at, b.id))
        });
        Ok(out)
    }

    async fn claim_raw_order(
        &self,
        id: Uuid,
        claimant: &str,
        ttl_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RawOrder>> {
        let mut g = self.lock()?;
        let Some(r) = g.raw.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if r.processed {
            return Ok(None);
        }
        let live = match (&r.claimed_by, r.claimed_at) {
            (Some(_), Some(at)) => Duration::try_seconds(ttl_secs)
                .and_then(|ttl| now.checked_sub_signed(ttl))
                .map_or(true, |cutoff| at >= cutoff),
            (Some(_), None) => true,
            _ => false,
        };
        if live {
            return Ok(None);
        }
        r.claimed_by = Some(claimant.to_string());
        r.claimed_at = Some(now);
        r.attempts += 1;
        Ok(Some(r.clone()))
    }

    async fn mark_raw_processed(
        &self,
        id: Uuid,
        claimant: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut g = self.lock()?;
        let has_order = g.orders.iter().any(|o| o.raw_order_id == id);
        let Some(r) = g.raw.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if !has_order || r.claimed_by.as_deref().is_some_and(|c| c != claimant) {
            return Ok(false);
        }
        r.processed = true;
        r.processed_at = r.processed_at.or(Some(at));
        r.claimed_by = None;
        r.claimed_at = None;
        Ok(true)
    }

    async fn mark_raw_error(&self, id: Uuid, claimant: &str, message: &str) -> Result<bool> {
        let mut g = self.lock()?;
        let Some(r) = g.raw.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if r.processed || r.claimed_by.as_deref().is_some_and(|c| c != claimant) {
            return Ok(false);
        }
        r.error_message = Some(message.to_string());
        r.claimed_by = None;
        r.claimed_at = None;
        Ok(true)
    }

    async fn next_order_seq(&self, day: NaiveDate) -> Result<i32> {
        let mut g = self.lock()?;
        let seeded = g
            .orders
            .iter()
            .filter_map(|o| OrderNo::parse(&o.order_no).ok())
            .filter(|n| n.day == day)
            .map(|n| n.seq as i32)
            .max()
            .unwrap_or(0);
        let next = match g.sequences.get(&day) {
            Some(last) => last + 1,
            None => seeded + 1,
        };
        g.sequences.insert(day, next);
        Ok(next)
    }

    async fn commit_order(&self, claimant: &str, order: &Order) -> Result<CommitOutcome> {
        let mut g = self.lock()?;
        let Some(idx) = g.raw.iter().position(|r| {
            r.id == order.raw_order_id && !r.processed && r.claimed_by.as_deref() == Some(claimant)
        }) else {
            return Ok(CommitOutcome::ClaimLost);
        };
        if g.orders.iter().any(|o| o.order_no == order.order_no) {
            bail!("order_no already in use: {}", order.order_no);
        }
        if g.orders.iter().any(|o| o.raw_order_id == order.raw_order_id) {
            bail!("raw order {} already has an order", order.raw_order_id);
        }
        let r = &mut g.raw[idx];
        r.processed = true;
        r.processed_at = Some(order.created_at);
        r.claimed_by = None;
        r.claimed_at = None;
        g.orders.push(order.clone());
        Ok(CommitOutcome::Committed)
    }

    async fn find_order_by_no(&self, order_no: &str) -> Result<Option<Order>> {
        Ok(self.lock()?.orders.iter().find(|o| o.order_no == order_no).cloned())
    }

    async fn counts(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<StoreCounts> {
        let g = self.lock()?;
        Ok(StoreCounts {
            total_orders: g.orders.len() as i64,
            orders_in_window: g
                .orders
                .iter()
                .filter(|o| o.ordered_at >= window_start && o.ordered_at < window_end)
                .count() as i64,
            unprocessed_raw_orders: g.raw.iter().filter(|r| !r.processed).count() as i64,
            errored_raw_orders: g
                .raw
                .iter()
                .filter(|r| !r.processed && r.error_message.is_some())
                .count() as i64,
        })
    }

    async fn order_counts_by_channel(&self) -> Result<Vec<ChannelOrderCount>> {
        let g = self.lock()?;
        let mut by_id: HashMap<Uuid, i64> = HashMap::new();
        for o in &g.orders {
            *by_id.entry(o.channel_id).or_default() += 1;
        }
        let mut out: Vec<ChannelOrderCount> = by_id
            .into_iter()
            .filter_map(|(id, n)| {
                g.channels.iter().find(|c| c.id == id).map(|c| ChannelOrderCount {
                    channel_code: c.code.clone(),
                    channel_name: c.name.clone(),
                    orders: n,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.orders
                .cmp(&a.orders)
                .then_with(|| a.channel_code.cmp(&b.channel_code))
        });
        Ok(out)
    }

    async fn product_mappings(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .lock()?
            .mappings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
