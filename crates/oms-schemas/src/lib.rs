//! oms-schemas
//!
//! Shared data model for the order collection pipeline.
//!
//! - [`collected`]: channel-native orders as produced by collectors.
//! - [`raw`]: the durable raw-order checkpoint and its payload envelope.
//! - [`channel`]: sales channel identity and collection bookkeeping.
//! - [`order`]: the canonical order model and status vocabularies.
//!
//! Money in the canonical model is integer micros (see [`MICROS_SCALE`]);
//! channel-native amounts stay decimal strings until normalization.

pub mod channel;
pub mod collected;
pub mod order;
pub mod raw;

pub use channel::SalesChannel;
pub use collected::{CollectedOrder, CollectedOrderItem, MissingField};
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus};
pub use raw::{NewRawOrder, PayloadError, RawOrder, RawPayload, RAW_PAYLOAD_SCHEMA_VERSION};

/// 1 currency unit = 1_000_000 micros.
pub const MICROS_SCALE: i64 = 1_000_000;
