//! Scenario: One Bad Raw Order Never Aborts The Drain
//!
//! # Invariant under test
//! With two unprocessed raw orders where the first has an unparseable
//! payload and the second is valid, a drain returns 1 success. The first
//! stays unprocessed with an error message (and is retried on the next
//! drain); the second gets its canonical order.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_pipeline::{OmsStore, RawOrderStore};
use oms_schemas::RawPayload;
use oms_testkit::{collected_order, pipeline, MemStore};
use serde_json::json;

#[tokio::test]
async fn bad_payload_marked_errored_and_valid_one_processed() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let t0 = Utc::now() - Duration::minutes(5);

    let bad = store.insert_raw_payload("NAVER", "N-BAD", json!({"schema_version": 1, "order": 42}), t0);
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    let good = raw
        .save_raw_order(&collected_order("NAVER", "N-GOOD"), Utc::now())
        .await
        .unwrap()
        .raw
        .id;

    let p = pipeline(store.clone(), vec![]).unwrap();
    let report = p.processing.process_unprocessed_orders().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let bad_row = store.raw_order(bad).unwrap();
    assert!(!bad_row.processed);
    let msg = bad_row.error_message.clone().unwrap();
    assert!(msg.contains("payload decode failed"), "{msg}");
    assert!(bad_row.claimed_by.is_none(), "claim released on failure");
    assert_eq!(bad_row.attempts, 1);

    let good_row = store.raw_order(good).unwrap();
    assert!(good_row.processed);
    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].raw_order_id, good);

    // Still eligible: the next drain retries it.
    let again = p.processing.process_unprocessed_orders().await.unwrap();
    assert_eq!((again.succeeded, again.failed), (0, 1));
    assert_eq!(store.raw_order(bad).unwrap().attempts, 2);
}

#[tokio::test]
async fn invalid_order_and_unsupported_version_are_recorded() {
    let store = Arc::new(MemStore::with_builtin_channels());

    let mut no_address = collected_order("COUPANG", "C-1");
    no_address.address = None;
    let payload = RawPayload::wrap(&no_address).to_value().unwrap();
    let missing = store.insert_raw_payload("COUPANG", "C-1", payload, Utc::now());

    let future = store.insert_raw_payload(
        "COUPANG",
        "C-2",
        json!({"schema_version": 7, "order": {}}),
        Utc::now(),
    );

    let p = pipeline(store.clone(), vec![]).unwrap();
    let report = p.processing.process_channel("COUPANG").await.unwrap();
    assert_eq!((report.succeeded, report.failed), (0, 2));

    let m = store.raw_order(missing).unwrap().error_message.unwrap();
    assert!(m.contains("address"), "{m}");
    let f = store.raw_order(future).unwrap().error_message.unwrap();
    assert!(f.contains('7'), "{f}");
    assert!(store.orders().is_empty());
}

#[tokio::test]
async fn failed_normalization_does_not_consume_a_sequence_number() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let t0 = Utc::now() - Duration::minutes(1);
    store.insert_raw_payload("NAVER", "N-BAD", json!([]), t0);
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    raw.save_raw_order(&collected_order("NAVER", "N-1"), Utc::now())
        .await
        .unwrap();

    let p = pipeline(store.clone(), vec![]).unwrap();
    p.processing.process_unprocessed_orders().await.unwrap();

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].order_no.ends_with("-0001"), "{}", orders[0].order_no);
}

#[tokio::test]
async fn legacy_bare_payload_is_still_processed() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let legacy = serde_json::to_value(collected_order("11ST", "E-1")).unwrap();
    let id = store.insert_raw_payload("11ST", "E-1", legacy, Utc::now());

    let p = pipeline(store.clone(), vec![]).unwrap();
    let out = p.processing.process_raw_order(id).await.unwrap();
    assert!(out.is_some());
    assert!(store.raw_order(id).unwrap().processed);
}
