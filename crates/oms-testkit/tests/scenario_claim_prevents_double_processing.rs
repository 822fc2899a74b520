//! Scenario: Claims Prevent Double Processing
//!
//! # Invariant under test
//! Two processing orchestrators draining the same store never create two
//! canonical orders for one raw order. A raw order held by a live claim is
//! skipped; a claim older than the TTL (crashed worker) is taken over.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_pipeline::{OmsStore, ProcessingOrchestrator, RawOrderStore};
use oms_testkit::{collected_order, test_settings, MemStore};

async fn seed(store: &Arc<MemStore>, n: usize) {
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    for i in 0..n {
        raw.save_raw_order(&collected_order("NAVER", &format!("N-{i}")), Utc::now())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn live_claim_is_skipped_and_stale_claim_is_taken_over() {
    let store = Arc::new(MemStore::with_builtin_channels());
    seed(&store, 2).await;
    let raws = store.raw_orders();

    // Another worker is mid-flight on the first, and crashed long ago on the second.
    store.force_claim(raws[0].id, "worker-other", Utc::now());
    store.force_claim(raws[1].id, "worker-dead", Utc::now() - Duration::hours(1));

    let dyn_store: Arc<dyn OmsStore> = store.clone();
    let p = ProcessingOrchestrator::new(dyn_store, test_settings("worker-me"));
    let report = p.process_unprocessed_orders().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert!(!store.raw_order(raws[0].id).unwrap().processed);
    assert!(store.raw_order(raws[1].id).unwrap().processed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_drains_create_each_order_once() {
    let store = Arc::new(MemStore::with_builtin_channels());
    seed(&store, 30).await;

    let mut handles = Vec::new();
    for w in 0..3 {
        let dyn_store: Arc<dyn OmsStore> = store.clone();
        let p = ProcessingOrchestrator::new(dyn_store, test_settings(&format!("worker-{w}")));
        handles.push(tokio::spawn(async move { p.process_unprocessed_orders().await }));
    }
    let mut succeeded = 0;
    for h in handles {
        let r = h.await.unwrap().unwrap();
        assert_eq!(r.failed, 0);
        succeeded += r.succeeded;
    }
    assert_eq!(succeeded, 30);

    let orders = store.orders();
    assert_eq!(orders.len(), 30);
    let mut raw_ids: Vec<_> = orders.iter().map(|o| o.raw_order_id).collect();
    raw_ids.sort();
    raw_ids.dedup();
    assert_eq!(raw_ids.len(), 30, "one canonical order per raw order");
    let mut nos: Vec<_> = orders.iter().map(|o| o.order_no.clone()).collect();
    nos.sort();
    nos.dedup();
    assert_eq!(nos.len(), 30, "order numbers unique");
    assert!(store.raw_orders().iter().all(|r| r.processed));
}
