//! Canonical orders: atomic commit and read side.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use oms_schemas::{Order, OrderItem, OrderStatus, PaymentStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Order + items inserted and the raw order marked processed.
    Committed,
    /// The raw order is no longer held by this claimant (claim expired and
    /// was taken over, or another worker already committed). Nothing written.
    ClaimLost,
}

/// Persist a normalized order and mark its raw order processed, in one
/// transaction.
///
/// The raw-order update runs first and is conditional on `claimant` still
/// holding the claim. If it matches no row the transaction is rolled back
/// and `ClaimLost` returned, so two workers can never both commit.
pub async fn commit_order(pool: &PgPool, claimant: &str, order: &Order) -> Result<CommitOutcome> {
    let mut tx = pool.begin().await.context("commit_order begin failed")?;

    let marked = sqlx::query(
        r#"
        update raw_orders
        set processed = true,
            processed_at = $3,
            claimed_by = null,
            claimed_at = null
        where id = $1
          and processed = false
          and claimed_by = $2
        "#,
    )
    .bind(order.raw_order_id)
    .bind(claimant)
    .bind(order.created_at)
    .execute(&mut *tx)
    .await
    .context("commit_order mark raw failed")?;

    if marked.rows_affected() != 1 {
        tx.rollback().await.context("commit_order rollback failed")?;
        return Ok(CommitOutcome::ClaimLost);
    }

    let inserted = sqlx::query(
        r#"
        insert into orders (
          id, order_no, raw_order_id, channel_id, channel_order_no,
          customer_name, customer_phone, customer_email,
          recipient_name, recipient_phone, postal_code, address, address_detail, delivery_memo,
          total_amount_micros, payment_amount_micros, shipping_fee_micros, discount_amount_micros,
          order_status, payment_status, ordered_at, paid_at, created_at, updated_at
        ) values (
          $1, $2, $3, $4, $5,
          $6, $7, $8,
          $9, $10, $11, $12, $13, $14,
          $15, $16, $17, $18,
          $19, $20, $21, $22, $23, $24
        )
        "#,
    )
    .bind(order.id)
    .bind(&order.order_no)
    .bind(order.raw_order_id)
    .bind(order.channel_id)
    .bind(&order.channel_order_no)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(&order.recipient_name)
    .bind(&order.recipient_phone)
    .bind(&order.postal_code)
    .bind(&order.address)
    .bind(&order.address_detail)
    .bind(&order.delivery_memo)
    .bind(order.total_amount_micros)
    .bind(order.payment_amount_micros)
    .bind(order.shipping_fee_micros)
    .bind(order.discount_amount_micros)
    .bind(order.order_status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.ordered_at)
    .bind(order.paid_at)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await;

    if let Err(e) = inserted {
        if is_unique_violation(&e, "uq_orders_order_no") {
            return Err(anyhow!("order_no already in use: {}", order.order_no));
        }
        return Err(e).context("commit_order insert order failed");
    }

    for (idx, item) in order.items.iter().enumerate() {
        let line_no = i32::try_from(idx + 1).context("commit_order: too many items")?;
        sqlx::query(
            r#"
            insert into order_items (
              id, order_id, line_no, product_code, channel_product_code, product_name,
              option_name, quantity, unit_price_micros, total_price_micros, created_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id)
        .bind(order.id)
        .bind(line_no)
        .bind(&item.product_code)
        .bind(&item.channel_product_code)
        .bind(&item.product_name)
        .bind(&item.option_name)
        .bind(item.quantity)
        .bind(item.unit_price_micros)
        .bind(item.total_price_micros)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("commit_order insert item line {line_no} failed"))?;
    }

    tx.commit().await.context("commit_order commit failed")?;
    Ok(CommitOutcome::Committed)
}

const ORDER_COLUMNS: &str = r#"
    id, order_no, raw_order_id, channel_id, channel_order_no,
    customer_name, customer_phone, customer_email,
    recipient_name, recipient_phone, postal_code, address, address_detail, delivery_memo,
    total_amount_micros, payment_amount_micros, shipping_fee_micros, discount_amount_micros,
    order_status, payment_status, ordered_at, paid_at, created_at, updated_at
"#;

fn order_from_row(row: &PgRow) -> Result<Order> {
    let order_status: String = row.try_get("order_status")?;
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Order {
        id: row.try_get("id")?,
        order_no: row.try_get("order_no")?,
        raw_order_id: row.try_get("raw_order_id")?,
        channel_id: row.try_get("channel_id")?,
        channel_order_no: row.try_get("channel_order_no")?,
        customer_name: row.try_get("customer_name")?,
        customer_phone: row.try_get("customer_phone")?,
        customer_email: row.try_get("customer_email")?,
        recipient_name: row.try_get("recipient_name")?,
        recipient_phone: row.try_get("recipient_phone")?,
        postal_code: row.try_get("postal_code")?,
        address: row.try_get("address")?,
        address_detail: row.try_get("address_detail")?,
        delivery_memo: row.try_get("delivery_memo")?,
        total_amount_micros: row.try_get("total_amount_micros")?,
        payment_amount_micros: row.try_get("payment_amount_micros")?,
        shipping_fee_micros: row.try_get("shipping_fee_micros")?,
        discount_amount_micros: row.try_get("discount_amount_micros")?,
        order_status: OrderStatus::parse(&order_status)
            .ok_or_else(|| anyhow!("unknown order_status in db: {order_status}"))?,
        payment_status: PaymentStatus::parse(&payment_status)
            .ok_or_else(|| anyhow!("unknown payment_status in db: {payment_status}"))?,
        ordered_at: row.try_get("ordered_at")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        items: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        product_code: row.try_get("product_code")?,
        channel_product_code: row.try_get("channel_product_code")?,
        product_name: row.try_get("product_name")?,
        option_name: row.try_get("option_name")?,
        quantity: row.try_get("quantity")?,
        unit_price_micros: row.try_get("unit_price_micros")?,
        total_price_micros: row.try_get("total_price_micros")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Order with its items in line order.
pub async fn fetch_order_by_no(pool: &PgPool, order_no: &str) -> Result<Option<Order>> {
    let sql = format!("select {ORDER_COLUMNS} from orders where order_no = $1");
    let row = sqlx::query(&sql)
        .bind(order_no)
        .fetch_optional(pool)
        .await
        .context("fetch_order_by_no failed")?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut order = order_from_row(&row)?;

    let items = sqlx::query(
        r#"
        select id, product_code, channel_product_code, product_name, option_name,
               quantity, unit_price_micros, total_price_micros, created_at
        from order_items
        where order_id = $1
        order by line_no asc
        "#,
    )
    .bind(order.id)
    .fetch_all(pool)
    .await
    .context("fetch_order_by_no items failed")?;
    order.items = items.iter().map(item_from_row).collect::<Result<_>>()?;
    Ok(Some(order))
}

pub async fn count_orders(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from orders")
        .fetch_one(pool)
        .await
        .context("count_orders failed")?;
    Ok(n)
}

/// Orders with `from <= ordered_at < to`.
pub async fn count_orders_ordered_between(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from orders where ordered_at >= $1 and ordered_at < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
    .context("count_orders_ordered_between failed")?;
    Ok(n)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOrderCount {
    pub channel_code: String,
    pub channel_name: String,
    pub orders: i64,
}

/// Per-channel order counts for channels with at least one order,
/// busiest first.
pub async fn order_counts_by_channel(pool: &PgPool) -> Result<Vec<ChannelOrderCount>> {
    let rows = sqlx::query(
        r#"
        select c.code, c.name, count(o.id)::bigint as n
        from orders o
        join sales_channels c on c.id = o.channel_id
        group by c.code, c.name
        order by n desc, c.code asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("order_counts_by_channel failed")?;

    rows.iter()
        .map(|row| {
            Ok(ChannelOrderCount {
                channel_code: row.try_get("code")?,
                channel_name: row.try_get("name")?,
                orders: row.try_get("n")?,
            })
        })
        .collect()
}
