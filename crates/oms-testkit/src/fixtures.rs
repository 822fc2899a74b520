use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use oms_collect::{CollectorRegistry, OrderCollector};
use oms_pipeline::{CollectionOrchestrator, OmsStore, ProcessingOrchestrator, ProcessingSettings};
use oms_schemas::{CollectedOrder, CollectedOrderItem};

use crate::mem_store::MemStore;

/// Valid order: one item, qty 2 at 10000, channel status `PAYED`.
pub fn collected_order(channel_code: &str, channel_order_no: &str) -> CollectedOrder {
    let mut o = CollectedOrder::new(channel_code, channel_order_no);
    o.customer_name = Some("Kim Minji".to_string());
    o.customer_phone = Some("01098765432".to_string());
    o.recipient_name = Some("Kim Minji".to_string());
    o.recipient_phone = Some("01012345678".to_string());
    o.postal_code = Some("06236".to_string());
    o.address = Some("123 Teheran-ro, Gangnam-gu, Seoul".to_string());
    o.status = Some("PAYED".to_string());
    o.payment_status = Some("PAID".to_string());
    o.ordered_at = Some(Utc::now());
    o.add_item(CollectedOrderItem::new(
        format!("{channel_code}-PRD-1"),
        "Seamless Leggings",
        2,
        "10000",
    ));
    o
}

/// Same as [`collected_order`] with an explicit order time.
pub fn collected_order_at(
    channel_code: &str,
    channel_order_no: &str,
    ordered_at: DateTime<Utc>,
) -> CollectedOrder {
    let mut o = collected_order(channel_code, channel_order_no);
    o.ordered_at = Some(ordered_at);
    o
}

pub fn test_settings(worker_id: &str) -> ProcessingSettings {
    ProcessingSettings {
        worker_id: worker_id.to_string(),
        claim_ttl_secs: 300,
        tz: chrono_tz::Asia::Seoul,
        product_mappings: Default::default(),
    }
}

/// Collection + processing orchestrators over one [`MemStore`].
pub struct Pipeline {
    pub store: Arc<MemStore>,
    pub registry: Arc<CollectorRegistry>,
    pub collection: CollectionOrchestrator,
    pub processing: ProcessingOrchestrator,
}

pub fn pipeline(
    store: Arc<MemStore>,
    collectors: Vec<Arc<dyn OrderCollector>>,
) -> Result<Pipeline> {
    pipeline_with(store, collectors, test_settings("worker-test"))
}

pub fn pipeline_with(
    store: Arc<MemStore>,
    collectors: Vec<Arc<dyn OrderCollector>>,
    settings: ProcessingSettings,
) -> Result<Pipeline> {
    let mut registry = CollectorRegistry::new();
    for c in collectors {
        registry.register(c)?;
    }
    let registry = Arc::new(registry);
    let dyn_store: Arc<dyn OmsStore> = store.clone();
    Ok(Pipeline {
        collection: CollectionOrchestrator::new(Arc::clone(&dyn_store), Arc::clone(&registry)),
        processing: ProcessingOrchestrator::new(dyn_store, settings),
        store,
        registry,
    })
}
