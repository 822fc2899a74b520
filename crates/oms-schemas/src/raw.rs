//! Raw-order checkpoint.
//!
//! Every collected order is stored once, verbatim, before any interpretation.
//! The stored payload is a versioned envelope ([`RawPayload`]) so the
//! normalizer can detect and branch on payload shape when the collected
//! model evolves.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::collected::CollectedOrder;

/// Current envelope version written by [`RawPayload::wrap`].
pub const RAW_PAYLOAD_SCHEMA_VERSION: u32 = 1;

/// Durable checkpoint of one channel order.
///
/// `(channel_id, channel_order_no)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub channel_order_no: String,
    /// Serialized [`RawPayload`] (jsonb in Postgres).
    pub raw_data: Value,
    pub collected_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    /// Last processing failure. Kept after a later success for operator history.
    pub error_message: Option<String>,
    /// Number of processing attempts (claims) so far. No cap is enforced.
    pub attempts: i32,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RawOrder {
    /// Unprocessed with a recorded failure.
    pub fn is_errored(&self) -> bool {
        !self.processed && self.error_message.is_some()
    }
}

/// Insert shape for a raw order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRawOrder {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub channel_order_no: String,
    pub raw_data: Value,
    pub collected_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payload envelope
// ---------------------------------------------------------------------------

/// Versioned envelope stored in `raw_orders.raw_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    pub schema_version: u32,
    pub order: CollectedOrder,
    /// Verbatim channel text (the collector's `raw_json`), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_raw: Option<String>,
}

/// Failure to encode or decode a [`RawPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    Encode(String),
    Decode(String),
    UnsupportedVersion(u64),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Encode(msg) => write!(f, "raw payload encode failed: {msg}"),
            PayloadError::Decode(msg) => write!(f, "raw payload decode failed: {msg}"),
            PayloadError::UnsupportedVersion(v) => {
                write!(f, "raw payload schema_version {v} is not supported")
            }
        }
    }
}

impl std::error::Error for PayloadError {}

impl RawPayload {
    /// Wrap a collected order at the current schema version.
    ///
    /// The collector's verbatim `raw_json` moves to `channel_raw` so it is
    /// stored once.
    pub fn wrap(order: &CollectedOrder) -> Self {
        let mut order = order.clone();
        let channel_raw = order.raw_json.take();
        Self {
            schema_version: RAW_PAYLOAD_SCHEMA_VERSION,
            order,
            channel_raw,
        }
    }

    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(|e| PayloadError::Encode(e.to_string()))
    }

    /// Decode a stored payload.
    ///
    /// - `schema_version == 1`: current envelope.
    /// - no `schema_version` key: legacy bare `CollectedOrder` (reported as version 0).
    /// - any other version: [`PayloadError::UnsupportedVersion`].
    pub fn decode(v: &Value) -> Result<Self, PayloadError> {
        let obj = v
            .as_object()
            .ok_or_else(|| PayloadError::Decode("payload is not a JSON object".to_string()))?;

        match obj.get("schema_version") {
            None => {
                let mut order: CollectedOrder = serde_json::from_value(v.clone())
                    .map_err(|e| PayloadError::Decode(e.to_string()))?;
                let channel_raw = order.raw_json.take();
                Ok(Self {
                    schema_version: 0,
                    order,
                    channel_raw,
                })
            }
            Some(ver) => match ver.as_u64() {
                Some(1) => serde_json::from_value(v.clone())
                    .map_err(|e| PayloadError::Decode(e.to_string())),
                Some(other) => Err(PayloadError::UnsupportedVersion(other)),
                None => Err(PayloadError::Decode(format!(
                    "schema_version is not an unsigned integer: {ver}"
                ))),
            },
        }
    }
}
