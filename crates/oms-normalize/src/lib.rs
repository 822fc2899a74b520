//! oms-normalize
//!
//! Converts channel-native [`oms_schemas::CollectedOrder`]s into canonical
//! [`oms_schemas::Order`]s.
//!
//! It does **not**:
//! - mint order numbers (the caller assigns one to the returned draft)
//! - read or write storage
//! - decide retry policy (errors go back to the processing loop)

mod normalize;
pub mod phone;
pub mod price;
pub mod product;
pub mod status;

pub use normalize::{normalize, DraftOrder, NormalizeError};
pub use phone::normalize_phone;
pub use price::{price_to_micros, PriceError};
pub use product::{ProductCodeLookup, ProductCodeMap};
pub use status::{map_order_status, map_payment_status};
