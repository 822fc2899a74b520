//! oms-pipeline
//!
//! Collection and processing orchestration over the [`OmsStore`] boundary.
//!
//! Data flow: collector -> [`CollectionOrchestrator`] -> [`RawOrderStore`]
//! (durable checkpoint) -> [`ProcessingOrchestrator`] -> normalizer ->
//! canonical order. The scheduler is an external trigger; the orchestrators
//! run to completion on every call.

pub mod calendar;
pub mod collection;
pub mod pg_store;
pub mod processing;
pub mod raw_store;
pub mod scheduler;
pub mod sequence;
pub mod store;

pub use collection::{ChannelCollectReport, CollectionOrchestrator, CollectionReport, CollectorStatus};
pub use pg_store::PgStore;
pub use processing::{
    ChannelStat, ProcessingOrchestrator, ProcessingReport, ProcessingSettings, ProcessingStats,
};
pub use raw_store::{RawOrderStore, SavedRawOrder};
pub use scheduler::{next_daily_jobs, Job, ScheduleConfig, Scheduler};
pub use sequence::{OrderNo, OrderNoError, SequenceGenerator};
pub use store::{OmsStore, StoreCounts};
