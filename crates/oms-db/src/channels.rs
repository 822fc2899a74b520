use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use oms_schemas::SalesChannel;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const CHANNEL_COLUMNS: &str = r#"
    id, code, name, api_type, api_base_url, is_active,
    collection_interval_minutes, last_collected_at, created_at, updated_at
"#;

fn channel_from_row(row: &PgRow) -> Result<SalesChannel> {
    Ok(SalesChannel {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        api_type: row.try_get("api_type")?,
        api_base_url: row.try_get("api_base_url")?,
        is_active: row.try_get("is_active")?,
        collection_interval_minutes: row.try_get("collection_interval_minutes")?,
        last_collected_at: row.try_get("last_collected_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn fetch_channel_by_code(pool: &PgPool, code: &str) -> Result<Option<SalesChannel>> {
    let sql = format!("select {CHANNEL_COLUMNS} from sales_channels where code = $1");
    let row = sqlx::query(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("fetch_channel_by_code failed")?;
    row.as_ref().map(channel_from_row).transpose()
}

pub async fn fetch_channel(pool: &PgPool, id: Uuid) -> Result<Option<SalesChannel>> {
    let sql = format!("select {CHANNEL_COLUMNS} from sales_channels where id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_channel failed")?;
    row.as_ref().map(channel_from_row).transpose()
}

/// Active channels ordered by code.
pub async fn list_active_channels(pool: &PgPool) -> Result<Vec<SalesChannel>> {
    let sql = format!("select {CHANNEL_COLUMNS} from sales_channels where is_active order by code");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("list_active_channels failed")?;
    rows.iter().map(channel_from_row).collect()
}

/// Record a collection attempt.
pub async fn touch_channel_collected(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        r#"
        update sales_channels
        set last_collected_at = $2,
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .bind(at)
    .execute(pool)
    .await
    .context("touch_channel_collected failed")?;
    Ok(())
}

/// Insert a channel (setup and tests; channel management owns edits).
pub async fn insert_channel(pool: &PgPool, ch: &SalesChannel) -> Result<()> {
    sqlx::query(
        r#"
        insert into sales_channels (
          id, code, name, api_type, api_base_url, is_active,
          collection_interval_minutes, last_collected_at, created_at, updated_at
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(ch.id)
    .bind(&ch.code)
    .bind(&ch.name)
    .bind(&ch.api_type)
    .bind(&ch.api_base_url)
    .bind(ch.is_active)
    .bind(ch.collection_interval_minutes)
    .bind(ch.last_collected_at)
    .bind(ch.created_at)
    .bind(ch.updated_at)
    .execute(pool)
    .await
    .context("insert_channel failed")?;
    Ok(())
}
