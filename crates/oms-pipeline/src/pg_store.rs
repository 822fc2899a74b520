use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use oms_db::{ChannelOrderCount, CommitOutcome};
use oms_schemas::{NewRawOrder, Order, RawOrder, SalesChannel};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{OmsStore, StoreCounts};

/// `OmsStore` over Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl OmsStore for PgStore {
    async fn channel_by_code(&self, code: &str) -> Result<Option<SalesChannel>> {
        oms_db::fetch_channel_by_code(&self.pool, code).await
    }

    async fn channel_by_id(&self, id: Uuid) -> Result<Option<SalesChannel>> {
        oms_db::fetch_channel(&self.pool, id).await
    }

    async fn active_channels(&self) -> Result<Vec<SalesChannel>> {
        oms_db::list_active_channels(&self.pool).await
    }

    async fn touch_channel_collected(&self, channel_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        oms_db::touch_channel_collected(&self.pool, channel_id, at).await
    }

    async fn find_raw_order(
        &self,
        channel_id: Uuid,
        channel_order_no: &str,
    ) -> Result<Option<RawOrder>> {
        oms_db::fetch_raw_order(&self.pool, channel_id, channel_order_no).await
    }

    async fn insert_raw_order_deduped(&self, new: &NewRawOrder) -> Result<(RawOrder, bool)> {
        oms_db::raw_order_insert_deduped(&self.pool, new).await
    }

    async fn unprocessed_raw_orders(&self, channel_id: Option<Uuid>) -> Result<Vec<RawOrder>> {
        oms_db::list_unprocessed_raw_orders(&self.pool, channel_id).await
    }

    async fn claim_raw_order(
        &self,
        id: Uuid,
        claimant: &str,
        ttl_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RawOrder>> {
        oms_db::claim_raw_order(&self.pool, id, claimant, ttl_secs, now).await
    }

    async fn mark_raw_processed(
        &self,
        id: Uuid,
        claimant: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        oms_db::mark_raw_processed(&self.pool, id, claimant, at).await
    }

    async fn mark_raw_error(&self, id: Uuid, claimant: &str, message: &str) -> Result<bool> {
        oms_db::mark_raw_error(&self.pool, id, claimant, message).await
    }

    async fn next_order_seq(&self, day: NaiveDate) -> Result<i32> {
        oms_db::next_order_seq(&self.pool, day).await
    }

    async fn commit_order(&self, claimant: &str, order: &Order) -> Result<CommitOutcome> {
        oms_db::commit_order(&self.pool, claimant, order).await
    }

    async fn find_order_by_no(&self, order_no: &str) -> Result<Option<Order>> {
        oms_db::fetch_order_by_no(&self.pool, order_no).await
    }

    async fn counts(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<StoreCounts> {
        Ok(StoreCounts {
            total_orders: oms_db::count_orders(&self.pool).await?,
            orders_in_window: oms_db::count_orders_ordered_between(
                &self.pool,
                window_start,
                window_end,
            )
            .await?,
            unprocessed_raw_orders: oms_db::count_unprocessed_raw_orders(&self.pool).await?,
            errored_raw_orders: oms_db::count_errored_raw_orders(&self.pool).await?,
        })
    }

    async fn order_counts_by_channel(&self) -> Result<Vec<ChannelOrderCount>> {
        oms_db::order_counts_by_channel(&self.pool).await
    }

    async fn product_mappings(&self) -> Result<Vec<(String, String)>> {
        oms_db::load_product_mappings(&self.pool).await
    }
}
