//! Scenario: Collection Survives Missing And Failing Collectors
//!
//! # Invariant under test
//! - An active channel with no registered collector is skipped, not fatal.
//! - A collector failure counts as zero orders and does not block the
//!   other channels; `last_collected_at` is still updated.
//! - Inactive channels are not collected.
//! - Targeted collection of a code with no collector is an error.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_collect::{MockCollector, OrderCollector};
use oms_pipeline::CollectionOrchestrator;
use oms_testkit::{collected_order, pipeline, MemStore, ScriptedCollector};

#[tokio::test]
async fn failing_channel_does_not_block_others() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let coupang = Arc::new(ScriptedCollector::failing("COUPANG"));
    let naver: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new(
        "NAVER",
        vec![collected_order("NAVER", "N-1")],
    ));
    let p = pipeline(store.clone(), vec![coupang.clone() as Arc<dyn OrderCollector>, naver]).unwrap();

    let end = Utc::now();
    let report = p
        .collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["11ST".to_string()]);
    let cp = report.channels.iter().find(|c| c.channel_code == "COUPANG").unwrap();
    assert!(cp.collector_failed);
    assert_eq!(cp.collected, 0);
    assert_eq!(report.stored(), 1);
    assert_eq!(coupang.calls(), 1);

    assert!(store.channel("COUPANG").unwrap().last_collected_at.is_some());
    assert!(store.channel("11ST").unwrap().last_collected_at.is_none());
}

#[tokio::test]
async fn order_for_unknown_channel_counts_as_save_failure() {
    let store = Arc::new(MemStore::with_builtin_channels());
    // Collector registered under NAVER but emitting a foreign channel code.
    let naver: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new(
        "NAVER",
        vec![collected_order("GMARKET", "G-1"), collected_order("NAVER", "N-1")],
    ));
    let p = pipeline(store.clone(), vec![naver]).unwrap();

    let end = Utc::now();
    let report = p
        .collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    assert_eq!(report.save_failures(), 1);
    assert_eq!(report.stored(), 1);
}

#[tokio::test]
async fn inactive_channels_are_not_collected() {
    let store = Arc::new(MemStore::with_builtin_channels());
    store.set_active("NAVER", false);
    let naver = Arc::new(ScriptedCollector::new("NAVER", vec![collected_order("NAVER", "N-1")]));
    let p = pipeline(store.clone(), vec![naver.clone() as Arc<dyn OrderCollector>]).unwrap();

    let end = Utc::now();
    p.collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    assert_eq!(naver.calls(), 0);
    assert!(store.raw_orders().is_empty());
}

#[tokio::test]
async fn targeted_collection_requires_a_collector() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let p = pipeline(store.clone(), vec![Arc::new(MockCollector::naver()) as Arc<dyn OrderCollector>]).unwrap();

    let end = Utc::now();
    let err = p
        .collection
        .collect_by_channel("COUPANG", end - Duration::minutes(15), end)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("COUPANG"));

    let (orders, report) = p
        .collection
        .collect_by_channel("NAVER", end - Duration::hours(1), end)
        .await
        .unwrap();
    assert_eq!(report.collected, orders.len());
    assert_eq!(report.stored, orders.len());
    assert!(store.channel("NAVER").unwrap().last_collected_at.is_none());
}

#[tokio::test]
async fn collector_status_reports_type_and_liveness() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let p = pipeline(
        store,
        vec![
            Arc::new(MockCollector::naver()) as Arc<dyn OrderCollector>,
            Arc::new(ScriptedCollector::failing("COUPANG")),
        ],
    )
    .unwrap();

    let mut status = p.collection.collector_status().await;
    status.sort_by(|a, b| a.channel_code.cmp(&b.channel_code));
    assert_eq!(status.len(), 2);
    assert_eq!(status[0].channel_code, "COUPANG");
    assert!(!status[0].connected);
    assert_eq!(status[1].collector_type, "MOCK");
    assert!(status[1].connected);

    // Same answer without a store, as the config-only CLI asks.
    let mut direct = CollectionOrchestrator::registry_status(&p.registry).await;
    direct.sort_by(|a, b| a.channel_code.cmp(&b.channel_code));
    assert_eq!(direct, status);
}
