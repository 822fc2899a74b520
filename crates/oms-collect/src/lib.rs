//! oms-collect
//!
//! Channel collector abstraction and the built-in collectors.
//!
//! This crate owns the collector contract, the registry keyed by channel
//! code, deterministic mock collectors and a generic HTTP collector. It does
//! **not** store anything; the pipeline hands collected orders to the raw
//! order store.

pub mod collector;
pub mod http;
pub mod mock;
pub mod registry;

pub use collector::{check_window, CollectorError, OrderCollector};
pub use http::HttpCollector;
pub use mock::MockCollector;
pub use registry::{CollectorRegistry, RegistryError};
