//! oms-testkit
//!
//! In-memory doubles for pipeline scenario tests: a [`MemStore`] with the
//! same dedup, claim and commit rules as the Postgres schema, scripted
//! collectors, and order fixtures. No database needed.

pub mod collectors;
pub mod fixtures;
pub mod mem_store;

pub use collectors::ScriptedCollector;
pub use fixtures::{
    collected_order, collected_order_at, pipeline, pipeline_with, test_settings, Pipeline,
};
pub use mem_store::MemStore;
