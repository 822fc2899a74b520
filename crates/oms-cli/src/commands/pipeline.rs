//! Collection, processing and read-side commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use oms_collect::CollectorRegistry;
use oms_config::OmsConfig;
use oms_pipeline::{
    ChannelCollectReport, CollectionOrchestrator, CollectionReport, ProcessingReport,
    ScheduleConfig, Scheduler,
};
use oms_schemas::{Order, MICROS_SCALE};
use uuid::Uuid;

use super::Services;

// ---------------------------------------------------------------------------
// Collect
// ---------------------------------------------------------------------------

pub async fn collect_all(svc: &Services, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    let report = svc.collection.collect_all_channels(start, end).await?;
    print_collection(&report);
    Ok(())
}

/// Fetch and store one channel's orders. Touches nothing on the channel.
pub async fn collect_channel(
    svc: &Services,
    code: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<()> {
    let (orders, report) = svc.collection.collect_by_channel(code, start, end).await?;
    print_channel_collect(&report);
    for o in &orders {
        println!(
            "collected channel={} channel_order_no={} items={}",
            o.channel_code,
            o.channel_order_no,
            o.items.len()
        );
    }
    Ok(())
}

fn print_collection(r: &CollectionReport) {
    for ch in &r.channels {
        print_channel_collect(ch);
    }
    for code in &r.skipped {
        println!("skipped channel={code} reason=no_collector");
    }
    println!(
        "collected={} stored={} duplicates={} save_failures={}",
        r.collected(),
        r.stored(),
        r.duplicates(),
        r.save_failures()
    );
}

fn print_channel_collect(ch: &ChannelCollectReport) {
    println!(
        "channel={} collected={} stored={} duplicates={} save_failures={} collector_failed={}",
        ch.channel_code, ch.collected, ch.stored, ch.duplicates, ch.save_failures, ch.collector_failed
    );
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

pub async fn process_all(svc: &Services) -> Result<()> {
    let r = svc.processing.process_unprocessed_orders().await?;
    print_processing(&r);
    Ok(())
}

pub async fn process_channel(svc: &Services, code: &str) -> Result<()> {
    let r = svc.processing.process_channel(code).await?;
    print_processing(&r);
    Ok(())
}

pub async fn process_one(svc: &Services, raw_id: &str) -> Result<()> {
    let id = Uuid::parse_str(raw_id).with_context(|| format!("invalid raw order id: {raw_id}"))?;
    match svc.processing.process_raw_order(id).await? {
        Some(order) => println!("processed=true order_no={}", order.order_no),
        None => println!("processed=false raw_order_id={id}"),
    }
    Ok(())
}

fn print_processing(r: &ProcessingReport) {
    println!(
        "succeeded={} failed={} skipped={}",
        r.succeeded, r.failed, r.skipped
    );
    for no in &r.order_nos {
        println!("order_no={no}");
    }
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

pub async fn stats(svc: &Services) -> Result<()> {
    let s = svc.processing.stats(Utc::now()).await?;
    println!("total_orders={}", s.total_orders);
    println!("today_orders={}", s.today_orders);
    println!("unprocessed_orders={}", s.unprocessed_orders);
    println!("errored_orders={}", s.errored_orders);
    for c in &s.by_channel {
        println!(
            "channel={} name={} orders={}",
            c.channel_code, c.channel_name, c.orders
        );
    }
    Ok(())
}

pub async fn unprocessed(svc: &Services, channel: Option<&str>) -> Result<()> {
    let rows = svc.processing.raw_store().list_unprocessed(channel).await?;
    for r in &rows {
        println!(
            "raw_order_id={} channel_order_no={} collected_at={} attempts={} error={}",
            r.id,
            r.channel_order_no,
            r.collected_at.to_rfc3339(),
            r.attempts,
            r.error_message.as_deref().unwrap_or("")
        );
    }
    println!("unprocessed={}", rows.len());
    Ok(())
}

pub async fn show_order(svc: &Services, order_no: &str) -> Result<()> {
    let order = svc
        .store
        .find_order_by_no(order_no)
        .await?
        .with_context(|| format!("order not found: {order_no}"))?;
    print_order(&order);
    Ok(())
}

fn money(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let scale = MICROS_SCALE as u64;
    let frac = abs % scale;
    if frac == 0 {
        format!("{sign}{}", abs / scale)
    } else {
        let s = format!("{sign}{}.{:06}", abs / scale, frac);
        s.trim_end_matches('0').to_string()
    }
}

fn print_order(o: &Order) {
    println!("order_no={}", o.order_no);
    println!("channel_order_no={}", o.channel_order_no);
    println!("order_status={}", o.order_status.as_str());
    println!("payment_status={}", o.payment_status.as_str());
    println!("recipient_name={}", o.recipient_name);
    println!("recipient_phone={}", o.recipient_phone);
    println!("address={}", o.address);
    println!("total_amount={}", money(o.total_amount_micros));
    println!("payment_amount={}", money(o.payment_amount_micros));
    println!("ordered_at={}", o.ordered_at.to_rfc3339());
    for (i, it) in o.items.iter().enumerate() {
        println!(
            "item={} product_code={} channel_product_code={} quantity={} unit_price={} total_price={}",
            i + 1,
            it.product_code,
            it.channel_product_code,
            it.quantity,
            money(it.unit_price_micros),
            money(it.total_price_micros)
        );
    }
}

// ---------------------------------------------------------------------------
// Config-only commands
// ---------------------------------------------------------------------------

/// Registered collectors and whether each one answers. Needs no database.
pub async fn collectors(cfg: &OmsConfig) -> Result<()> {
    let registry = CollectorRegistry::from_config(cfg)?;
    let status = CollectionOrchestrator::registry_status(&registry).await;
    for st in &status {
        println!(
            "channel={} type={} connected={}",
            st.channel_code, st.collector_type, st.connected
        );
    }
    println!("collectors={}", status.len());
    Ok(())
}

pub async fn schedule(svc: &Services, cfg: &OmsConfig) -> Result<()> {
    let sched = Scheduler::new(
        svc.collection.clone(),
        svc.processing.clone(),
        ScheduleConfig::from_config(cfg)?,
    );
    sched
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
