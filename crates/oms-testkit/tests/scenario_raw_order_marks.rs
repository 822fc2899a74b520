//! Scenario: Raw Order State Marks
//!
//! # Invariant under test
//! - `mark_as_processed` never produces a processed raw order without its
//!   canonical order, and never overrides another worker's live claim.
//! - Both marks are idempotent: repeating one leaves the row unchanged.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_pipeline::{OmsStore, RawOrderStore};
use oms_testkit::{collected_order, pipeline, MemStore};
use serde_json::json;

#[tokio::test]
async fn processed_mark_requires_order_and_claim() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    let id = raw
        .save_raw_order(&collected_order("NAVER", "N-1"), Utc::now())
        .await
        .unwrap()
        .raw
        .id;

    // No canonical order yet.
    assert!(!raw.mark_as_processed(id, "worker-a", Utc::now()).await.unwrap());
    assert!(!store.raw_order(id).unwrap().processed);

    let p = pipeline(store.clone(), vec![]).unwrap();
    assert_eq!(p.processing.process_unprocessed_orders().await.unwrap().succeeded, 1);

    // Order exists but the flag was lost; another worker holds the row.
    store.reopen_raw(id);
    store.force_claim(id, "worker-b", Utc::now());
    assert!(!raw.mark_as_processed(id, "worker-a", Utc::now()).await.unwrap());
    assert!(!store.raw_order(id).unwrap().processed);

    let at = Utc::now();
    assert!(raw.mark_as_processed(id, "worker-b", at).await.unwrap());
    let row = store.raw_order(id).unwrap();
    assert!(row.processed);
    assert!(row.claimed_by.is_none());
    assert_eq!(row.processed_at, Some(at));

    assert!(raw
        .mark_as_processed(id, "worker-b", at + Duration::minutes(5))
        .await
        .unwrap());
    assert_eq!(store.raw_order(id).unwrap(), row);
    assert_eq!(store.orders().len(), 1);
}

#[tokio::test]
async fn error_mark_is_idempotent_and_keeps_row_retryable() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let raw = RawOrderStore::new(store.clone() as Arc<dyn OmsStore>);
    let id = store.insert_raw_payload("COUPANG", "C-BAD", json!({"order": 1}), Utc::now());

    assert!(raw.mark_as_error(id, "worker-a", "payload decode failed").await.unwrap());
    let first = store.raw_order(id).unwrap();
    assert!(raw.mark_as_error(id, "worker-a", "payload decode failed").await.unwrap());
    assert_eq!(store.raw_order(id).unwrap(), first);
    assert!(!first.processed);
    assert_eq!(first.error_message.as_deref(), Some("payload decode failed"));

    store.force_claim(id, "worker-b", Utc::now());
    assert!(!raw.mark_as_error(id, "worker-a", "other").await.unwrap());
    assert_eq!(
        store.raw_order(id).unwrap().error_message.as_deref(),
        Some("payload decode failed")
    );

    let unprocessed = raw.list_unprocessed(Some("COUPANG")).await.unwrap();
    assert_eq!(unprocessed.len(), 1);
}
