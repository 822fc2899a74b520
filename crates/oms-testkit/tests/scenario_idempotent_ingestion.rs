//! Scenario: Idempotent Ingestion
//!
//! # Invariant under test
//! Saving the same `(channel, channel_order_no)` twice never creates a
//! second raw order; the second save returns the first record unchanged.
//! Overlapping collection windows therefore only count duplicates.
//!
//! All tests are pure in-process; no DB or network required.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_collect::OrderCollector;
use oms_pipeline::{OmsStore, RawOrderStore};
use oms_testkit::{collected_order, pipeline, MemStore, ScriptedCollector};

#[tokio::test]
async fn second_save_returns_first_record() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    let order = collected_order("NAVER", "N-1");

    let first = raw.save_raw_order(&order, Utc::now()).await.unwrap();
    assert!(first.created);

    let mut changed = order.clone();
    changed.recipient_name = Some("Someone Else".to_string());
    let second = raw
        .save_raw_order(&changed, Utc::now() + Duration::minutes(10))
        .await
        .unwrap();

    assert!(!second.created);
    assert_eq!(second.raw, first.raw, "existing record returned unchanged");
    assert_eq!(store.raw_orders().len(), 1);
}

#[tokio::test]
async fn same_order_no_on_different_channels_are_distinct() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);

    assert!(raw.save_raw_order(&collected_order("NAVER", "X-1"), Utc::now()).await.unwrap().created);
    assert!(raw.save_raw_order(&collected_order("COUPANG", "X-1"), Utc::now()).await.unwrap().created);
    assert_eq!(store.raw_orders().len(), 2);
}

#[tokio::test]
async fn unknown_channel_is_rejected() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);

    let err = raw
        .save_raw_order(&collected_order("GMARKET", "G-1"), Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("GMARKET"));
    assert!(store.raw_orders().is_empty());
}

#[tokio::test]
async fn overlapping_windows_count_duplicates_and_process_once() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let naver = Arc::new(ScriptedCollector::new(
        "NAVER",
        vec![collected_order("NAVER", "N-1"), collected_order("NAVER", "N-2")],
    ));
    let p = pipeline(store.clone(), vec![naver.clone() as Arc<dyn OrderCollector>]).unwrap();

    let end = Utc::now();
    let r1 = p
        .collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    assert_eq!((r1.stored(), r1.duplicates()), (2, 0));

    let first_drain = p.processing.process_unprocessed_orders().await.unwrap();
    assert_eq!(first_drain.succeeded, 2);

    let r2 = p
        .collection
        .collect_all_channels(end - Duration::minutes(5), end + Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!((r2.stored(), r2.duplicates()), (0, 2));

    let second_drain = p.processing.process_unprocessed_orders().await.unwrap();
    assert_eq!(second_drain.succeeded, 0, "duplicates never re-trigger normalization");
    assert_eq!(store.orders().len(), 2);
    assert_eq!(naver.calls(), 2);
}

#[tokio::test]
async fn payload_is_versioned_envelope() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    let mut order = collected_order("NAVER", "N-9");
    order.raw_json = Some(r#"{"orderId":"N-9"}"#.to_string());

    let saved = raw.save_raw_order(&order, Utc::now()).await.unwrap();
    assert_eq!(saved.raw.raw_data["schema_version"], 1);
    assert_eq!(saved.raw.raw_data["order"]["channel_order_no"], "N-9");
    assert_eq!(saved.raw.raw_data["channel_raw"], r#"{"orderId":"N-9"}"#);
}
