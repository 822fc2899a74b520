//! Scenario: Collect Then Process, End To End
//!
//! # Invariant under test
//! An active NAVER channel whose collector returns one `PAYED` order
//! (`N-1`, one item, qty 2 at 10000) ends, after one collection and one
//! drain, with exactly one processed raw order and one canonical order:
//! CONFIRMED, item total 20000, number `OMS-<today>-0001`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use oms_collect::OrderCollector;
use oms_pipeline::calendar::business_day;
use oms_schemas::{OrderStatus, PaymentStatus, MICROS_SCALE};
use oms_testkit::{collected_order, pipeline, MemStore, ScriptedCollector};

#[tokio::test]
async fn single_naver_order_becomes_confirmed_canonical_order() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let naver: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new(
        "NAVER",
        vec![collected_order("NAVER", "N-1")],
    ));
    let p = pipeline(store.clone(), vec![naver]).unwrap();

    let end = Utc::now();
    let collected = p
        .collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    assert_eq!(collected.stored(), 1);
    // COUPANG and 11ST are active but have no collector here.
    assert_eq!(collected.skipped, vec!["11ST".to_string(), "COUPANG".to_string()]);

    let report = p.processing.process_unprocessed_orders().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    let raws = store.raw_orders();
    assert_eq!(raws.len(), 1);
    assert!(raws[0].processed);
    assert!(raws[0].processed_at.is_some());
    assert!(raws[0].error_message.is_none());
    assert!(raws[0].claimed_by.is_none());

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    let o = &orders[0];
    assert_eq!(o.order_status, OrderStatus::Confirmed);
    assert_eq!(o.payment_status, PaymentStatus::Paid);
    assert_eq!(o.raw_order_id, raws[0].id);
    assert_eq!(o.channel_order_no, "N-1");
    assert_eq!(o.recipient_phone, "010-1234-5678");
    assert_eq!(o.items.len(), 1);
    assert_eq!(o.items[0].quantity, 2);
    assert_eq!(o.items[0].total_price_micros, 20_000 * MICROS_SCALE);
    assert_eq!(o.total_amount_micros, 20_000 * MICROS_SCALE);

    let today = business_day(chrono_tz::Asia::Seoul, Utc::now());
    assert_eq!(o.order_no, format!("OMS-{}-0001", today.format("%Y%m%d")));
    assert_eq!(report.order_nos, vec![o.order_no.clone()]);

    let naver = store.channel("NAVER").unwrap();
    assert!(naver.last_collected_at.is_some());
    assert!(store.channel("COUPANG").unwrap().last_collected_at.is_none());
}

#[tokio::test]
async fn product_mappings_store_overrides_config_and_unmapped_pass_through() {
    let store = Arc::new(MemStore::with_builtin_channels());
    store.set_product_mapping("NAVER-PRD-1", "PRD-LEGGINGS-BLK");

    let mut order = collected_order("NAVER", "N-2");
    order.add_item(oms_schemas::CollectedOrderItem::new("NAVER-PRD-X", "Socks", 1, "3000"));
    let naver: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new("NAVER", vec![order]));

    let mut settings = oms_testkit::test_settings("worker-map");
    settings.product_mappings.insert("NAVER-PRD-1", "PRD-FROM-CONFIG");
    settings.product_mappings.insert("NAVER-PRD-X", "PRD-SOCKS");
    let p = oms_testkit::fixtures::pipeline_with(store.clone(), vec![naver], settings).unwrap();

    let end = Utc::now();
    p.collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    p.processing.process_unprocessed_orders().await.unwrap();

    let o = &store.orders()[0];
    assert_eq!(o.items[0].product_code, "PRD-LEGGINGS-BLK");
    assert_eq!(o.items[1].product_code, "PRD-SOCKS");
    assert_eq!(o.total_amount_micros, 23_000 * MICROS_SCALE);
}

#[tokio::test]
async fn stats_aggregate_totals_today_and_channels() {
    let store = Arc::new(MemStore::with_builtin_channels());
    let naver: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new(
        "NAVER",
        vec![collected_order("NAVER", "N-1"), collected_order("NAVER", "N-2")],
    ));
    let coupang: Arc<dyn OrderCollector> = Arc::new(ScriptedCollector::new(
        "COUPANG",
        vec![
            collected_order("COUPANG", "C-1"),
            oms_testkit::collected_order_at("COUPANG", "C-OLD", Utc::now() - Duration::days(3)),
        ],
    ));
    let p = pipeline(store.clone(), vec![naver, coupang]).unwrap();

    let end = Utc::now();
    p.collection
        .collect_all_channels(end - Duration::minutes(15), end)
        .await
        .unwrap();
    store.insert_raw_payload("11ST", "E-BAD", serde_json::json!("garbage"), Utc::now());
    p.processing.process_unprocessed_orders().await.unwrap();

    let s = p.processing.stats(Utc::now()).await.unwrap();
    assert_eq!(s.total_orders, 4);
    assert_eq!(s.today_orders, 3);
    assert_eq!(s.unprocessed_orders, 1);
    assert_eq!(s.errored_orders, 1);
    // Tie broken by channel code.
    let by: Vec<_> = s
        .by_channel
        .iter()
        .map(|c| (c.channel_code.as_str(), c.orders))
        .collect();
    assert_eq!(by, vec![("COUPANG", 2), ("NAVER", 2)]);
}
