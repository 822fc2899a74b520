//! Raw-order checkpoint: dedup insert, claims, processed/error marks.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use oms_schemas::{NewRawOrder, RawOrder};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub(crate) const RAW_COLUMNS: &str = r#"
    id, channel_id, channel_order_no, raw_data, collected_at, processed,
    processed_at, error_message, attempts, claimed_by, claimed_at, created_at
"#;

pub(crate) fn raw_order_from_row(row: &PgRow) -> Result<RawOrder> {
    Ok(RawOrder {
        id: row.try_get("id")?,
        channel_id: row.try_get("channel_id")?,
        channel_order_no: row.try_get("channel_order_no")?,
        raw_data: row.try_get("raw_data")?,
        collected_at: row.try_get("collected_at")?,
        processed: row.try_get("processed")?,
        processed_at: row.try_get("processed_at")?,
        error_message: row.try_get("error_message")?,
        attempts: row.try_get("attempts")?,
        claimed_by: row.try_get("claimed_by")?,
        claimed_at: row.try_get("claimed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert unless `(channel_id, channel_order_no)` already exists.
///
/// Returns the stored row and `true` if this call created it. A concurrent
/// insert of the same pair resolves to the winner's row with `false`.
pub async fn raw_order_insert_deduped(pool: &PgPool, new: &NewRawOrder) -> Result<(RawOrder, bool)> {
    let sql = format!(
        r#"
        insert into raw_orders (id, channel_id, channel_order_no, raw_data, collected_at)
        values ($1, $2, $3, $4, $5)
        on conflict (channel_id, channel_order_no) do nothing
        returning {RAW_COLUMNS}
        "#
    );
    let inserted = sqlx::query(&sql)
        .bind(new.id)
        .bind(new.channel_id)
        .bind(&new.channel_order_no)
        .bind(&new.raw_data)
        .bind(new.collected_at)
        .fetch_optional(pool)
        .await
        .context("raw_order_insert_deduped failed")?;

    if let Some(row) = inserted {
        return Ok((raw_order_from_row(&row)?, true));
    }

    let existing = fetch_raw_order(pool, new.channel_id, &new.channel_order_no)
        .await?
        .context("raw_order_insert_deduped: conflicting row vanished")?;
    Ok((existing, false))
}

pub async fn fetch_raw_order(
    pool: &PgPool,
    channel_id: Uuid,
    channel_order_no: &str,
) -> Result<Option<RawOrder>> {
    let sql = format!(
        "select {RAW_COLUMNS} from raw_orders where channel_id = $1 and channel_order_no = $2"
    );
    let row = sqlx::query(&sql)
        .bind(channel_id)
        .bind(channel_order_no)
        .fetch_optional(pool)
        .await
        .context("fetch_raw_order failed")?;
    row.as_ref().map(raw_order_from_row).transpose()
}

pub async fn fetch_raw_order_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RawOrder>> {
    let sql = format!("select {RAW_COLUMNS} from raw_orders where id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_raw_order_by_id failed")?;
    row.as_ref().map(raw_order_from_row).transpose()
}

/// Unprocessed raw orders (errored included), oldest collection first.
pub async fn list_unprocessed_raw_orders(
    pool: &PgPool,
    channel_id: Option<Uuid>,
) -> Result<Vec<RawOrder>> {
    let sql = format!(
        r#"
        select {RAW_COLUMNS}
        from raw_orders
        where processed = false
          and ($1::uuid is null or channel_id = $1)
        order by collected_at asc, created_at asc, id asc
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(channel_id)
        .fetch_all(pool)
        .await
        .context("list_unprocessed_raw_orders failed")?;
    rows.iter().map(raw_order_from_row).collect()
}

/// Atomically claim an unprocessed raw order for `claimant`.
///
/// Succeeds when the row is unclaimed or its claim is older than `ttl_secs`
/// (abandoned by a crashed worker). Increments `attempts`. Returns `None`
/// when the row is processed or held by a live claim.
pub async fn claim_raw_order(
    pool: &PgPool,
    id: Uuid,
    claimant: &str,
    ttl_secs: i64,
    now: DateTime<Utc>,
) -> Result<Option<RawOrder>> {
    let sql = format!(
        r#"
        update raw_orders
        set claimed_by = $2,
            claimed_at = $3,
            attempts = attempts + 1
        where id = $1
          and processed = false
          and (claimed_by is null or claimed_at < $3 - ($4::bigint * interval '1 second'))
        returning {RAW_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(claimant)
        .bind(now)
        .bind(ttl_secs)
        .fetch_optional(pool)
        .await
        .context("claim_raw_order failed")?;
    row.as_ref().map(raw_order_from_row).transpose()
}

/// Mark processed and release the claim. Idempotent.
///
/// Applies only when a canonical order exists for the raw order and the row
/// is not held by someone else (`claimant` must match the current holder, or
/// the row must be unclaimed). `processed_at` is set once; a previous
/// `error_message` is kept for operator history. Returns whether the row is
/// now marked.
pub async fn mark_raw_processed(
    pool: &PgPool,
    id: Uuid,
    claimant: &str,
    at: DateTime<Utc>,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update raw_orders r
        set processed = true,
            processed_at = coalesce(r.processed_at, $3),
            claimed_by = null,
            claimed_at = null
        where r.id = $1
          and (r.claimed_by is null or r.claimed_by = $2)
          and exists (select 1 from orders o where o.raw_order_id = r.id)
        "#,
    )
    .bind(id)
    .bind(claimant)
    .bind(at)
    .execute(pool)
    .await
    .context("mark_raw_processed failed")?;
    Ok(res.rows_affected() == 1)
}

/// Record a processing failure and release the claim.
///
/// Only applies while the row is unprocessed and not held by someone else
/// (`claimant` must match the current holder, or the row must be unclaimed).
/// Returns whether a row was updated.
pub async fn mark_raw_error(
    pool: &PgPool,
    id: Uuid,
    claimant: &str,
    message: &str,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update raw_orders
        set processed = false,
            error_message = $3,
            claimed_by = null,
            claimed_at = null
        where id = $1
          and processed = false
          and (claimed_by is null or claimed_by = $2)
        "#,
    )
    .bind(id)
    .bind(claimant)
    .bind(message)
    .execute(pool)
    .await
    .context("mark_raw_error failed")?;
    Ok(res.rows_affected() == 1)
}

pub async fn count_unprocessed_raw_orders(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as::<_, (i64,)>("select count(*)::bigint from raw_orders where processed = false")
            .fetch_one(pool)
            .await
            .context("count_unprocessed_raw_orders failed")?;
    Ok(n)
}

pub async fn count_errored_raw_orders(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from raw_orders where processed = false and error_message is not null",
    )
    .fetch_one(pool)
    .await
    .context("count_errored_raw_orders failed")?;
    Ok(n)
}
