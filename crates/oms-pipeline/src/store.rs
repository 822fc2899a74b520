//! Persistence boundary consumed by the orchestrators.
//!
//! `PgStore` is the production implementation; `oms-testkit` provides an
//! in-memory one with the same claim and commit semantics.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use oms_db::{ChannelOrderCount, CommitOutcome};
use oms_schemas::{NewRawOrder, Order, RawOrder, SalesChannel};
use uuid::Uuid;

/// Point-in-time counters used by the stats query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub total_orders: i64,
    /// Orders whose `ordered_at` falls inside the requested window.
    pub orders_in_window: i64,
    pub unprocessed_raw_orders: i64,
    /// Unprocessed raw orders carrying an error message.
    pub errored_raw_orders: i64,
}

#[async_trait::async_trait]
pub trait OmsStore: Send + Sync {
    // --- channels -------------------------------------------------------
    async fn channel_by_code(&self, code: &str) -> Result<Option<SalesChannel>>;
    async fn channel_by_id(&self, id: Uuid) -> Result<Option<SalesChannel>>;
    /// Active channels ordered by code.
    async fn active_channels(&self) -> Result<Vec<SalesChannel>>;
    async fn touch_channel_collected(&self, channel_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    // --- raw orders -----------------------------------------------------
    async fn find_raw_order(
        &self,
        channel_id: Uuid,
        channel_order_no: &str,
    ) -> Result<Option<RawOrder>>;
    /// Insert unless `(channel_id, channel_order_no)` exists. `true` if created.
    async fn insert_raw_order_deduped(&self, new: &NewRawOrder) -> Result<(RawOrder, bool)>;
    /// Unprocessed raw orders, oldest collection first.
    async fn unprocessed_raw_orders(&self, channel_id: Option<Uuid>) -> Result<Vec<RawOrder>>;
    async fn claim_raw_order(
        &self,
        id: Uuid,
        claimant: &str,
        ttl_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RawOrder>>;
    /// Only for a raw order that already has its canonical order and is not
    /// claimed by another worker. `true` if the row is now processed.
    async fn mark_raw_processed(&self, id: Uuid, claimant: &str, at: DateTime<Utc>)
        -> Result<bool>;
    async fn mark_raw_error(&self, id: Uuid, claimant: &str, message: &str) -> Result<bool>;

    // --- canonical orders -----------------------------------------------
    async fn next_order_seq(&self, day: NaiveDate) -> Result<i32>;
    async fn commit_order(&self, claimant: &str, order: &Order) -> Result<CommitOutcome>;
    async fn find_order_by_no(&self, order_no: &str) -> Result<Option<Order>>;
    async fn counts(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>)
        -> Result<StoreCounts>;
    async fn order_counts_by_channel(&self) -> Result<Vec<ChannelOrderCount>>;

    // --- product mappings -----------------------------------------------
    async fn product_mappings(&self) -> Result<Vec<(String, String)>>;
}
