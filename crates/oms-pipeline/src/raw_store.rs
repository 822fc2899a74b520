//! Raw-order store service: the durable checkpoint between collection and
//! normalization.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use oms_schemas::{CollectedOrder, NewRawOrder, RawOrder, RawPayload};
use uuid::Uuid;

use crate::store::OmsStore;

/// Result of saving one collected order.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRawOrder {
    pub raw: RawOrder,
    /// `false` when the `(channel, channel_order_no)` pair was already stored.
    pub created: bool,
}

#[derive(Clone)]
pub struct RawOrderStore {
    store: Arc<dyn OmsStore>,
}

impl RawOrderStore {
    pub fn new(store: Arc<dyn OmsStore>) -> Self {
        Self { store }
    }

    /// Persist `collected` unless its `(channel, channel_order_no)` exists.
    ///
    /// An existing record is returned unchanged and never re-queued. The
    /// channel must exist.
    pub async fn save_raw_order(
        &self,
        collected: &CollectedOrder,
        now: DateTime<Utc>,
    ) -> Result<SavedRawOrder> {
        let channel = self
            .store
            .channel_by_code(&collected.channel_code)
            .await?
            .ok_or_else(|| anyhow!("unknown channel code: {}", collected.channel_code))?;

        if let Some(existing) = self
            .store
            .find_raw_order(channel.id, &collected.channel_order_no)
            .await?
        {
            tracing::debug!(
                channel = %channel.code,
                channel_order_no = %collected.channel_order_no,
                "raw order already stored"
            );
            return Ok(SavedRawOrder {
                raw: existing,
                created: false,
            });
        }

        let raw_data = RawPayload::wrap(collected)
            .to_value()
            .with_context(|| format!("encode payload for {}", collected.channel_order_no))?;
        let new = NewRawOrder {
            id: Uuid::new_v4(),
            channel_id: channel.id,
            channel_order_no: collected.channel_order_no.clone(),
            raw_data,
            collected_at: now,
        };

        // The pair can still race in between; the store resolves it.
        let (raw, created) = self.store.insert_raw_order_deduped(&new).await?;
        if created {
            tracing::info!(
                channel = %channel.code,
                channel_order_no = %raw.channel_order_no,
                raw_order_id = %raw.id,
                "raw order stored"
            );
        }
        Ok(SavedRawOrder { raw, created })
    }

    /// Unprocessed raw orders, oldest first; scoped to one channel when
    /// `channel_code` is given.
    pub async fn list_unprocessed(&self, channel_code: Option<&str>) -> Result<Vec<RawOrder>> {
        let channel_id = match channel_code {
            None => None,
            Some(code) => Some(
                self.store
                    .channel_by_code(code)
                    .await?
                    .ok_or_else(|| anyhow!("unknown channel code: {code}"))?
                    .id,
            ),
        };
        self.store.unprocessed_raw_orders(channel_id).await
    }

    /// Repair mark for a raw order whose canonical order already exists.
    /// Refused (`false`) while another claimant holds the row or when no
    /// order exists. Repeating it changes nothing.
    pub async fn mark_as_processed(
        &self,
        id: Uuid,
        claimant: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.store.mark_raw_processed(id, claimant, at).await
    }

    /// Record a failure; ignored when another claimant holds the row.
    pub async fn mark_as_error(&self, id: Uuid, claimant: &str, message: &str) -> Result<bool> {
        self.store.mark_raw_error(id, claimant, message).await
    }
}
