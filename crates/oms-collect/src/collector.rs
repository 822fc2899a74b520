//! Channel collector contract.

use std::fmt;

use chrono::{DateTime, Utc};
use oms_schemas::CollectedOrder;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    /// Network or transport failure.
    Transport(String),
    /// The channel answered with an application-level error.
    Api { status: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Point lookup found nothing.
    NotFound { channel_order_no: String },
    /// `start` is not before `end`.
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Collector is misconfigured (bad URL, missing key, ...).
    Config(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Transport(msg) => write!(f, "transport error: {msg}"),
            CollectorError::Api {
                status: Some(s),
                message,
            } => write!(f, "channel api error status={s}: {message}"),
            CollectorError::Api {
                status: None,
                message,
            } => write!(f, "channel api error: {message}"),
            CollectorError::Decode(msg) => write!(f, "decode error: {msg}"),
            CollectorError::NotFound { channel_order_no } => {
                write!(f, "channel order '{channel_order_no}' not found")
            }
            CollectorError::InvalidWindow { start, end } => {
                write!(f, "invalid collection window: start {start} is not before end {end}")
            }
            CollectorError::Config(msg) => write!(f, "collector config error: {msg}"),
        }
    }
}

impl std::error::Error for CollectorError {}

/// `[start, end)` must be non-empty.
pub fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), CollectorError> {
    if start < end {
        Ok(())
    } else {
        Err(CollectorError::InvalidWindow { start, end })
    }
}

// ---------------------------------------------------------------------------
// Collector trait
// ---------------------------------------------------------------------------

/// One implementation per external sales channel.
///
/// Implementations must be `Send + Sync`; the orchestrator holds them as
/// `Arc<dyn OrderCollector>` and may call them from any task.
#[async_trait::async_trait]
pub trait OrderCollector: Send + Sync {
    /// Stable channel code (e.g. `"NAVER"`). Registry key.
    fn channel_code(&self) -> &str;

    /// All orders observable in `[start, end)`.
    ///
    /// Overlapping windows are fine: downstream dedup absorbs repeats. The
    /// call bounds its own I/O; the caller logs a failure and moves on.
    async fn collect_orders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CollectedOrder>, CollectorError>;

    /// Point lookup, used for reconciliation.
    async fn get_order(&self, channel_order_no: &str) -> Result<CollectedOrder, CollectorError>;

    /// Liveness check. No side effects.
    async fn test_connection(&self) -> bool;

    /// Diagnostic tag (`"MOCK"`, `"HTTP"`). Never affects behavior.
    fn collector_type(&self) -> &'static str;
}
