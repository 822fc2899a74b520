//! oms-db
//!
//! PostgreSQL persistence for the order pipeline.
//!
//! Free functions over a `PgPool`, one module per table family. Every query
//! attaches a `.context(..)` naming the operation that failed.
//!
//! This crate does **not** decide pipeline policy (what to skip, when to
//! retry); it only guarantees the storage invariants: one raw order per
//! `(channel, channel_order_no)`, one canonical order per raw order, atomic
//! claim and commit, and an atomic per-day sequence counter.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod channels;
pub mod orders;
pub mod products;
pub mod raw_orders;
pub mod sequences;

pub use channels::{
    fetch_channel, fetch_channel_by_code, insert_channel, list_active_channels,
    touch_channel_collected,
};
pub use orders::{
    commit_order, count_orders, count_orders_ordered_between, fetch_order_by_no,
    order_counts_by_channel, ChannelOrderCount, CommitOutcome,
};
pub use products::{load_product_mappings, upsert_product_mapping};
pub use raw_orders::{
    claim_raw_order, count_errored_raw_orders, count_unprocessed_raw_orders, fetch_raw_order,
    fetch_raw_order_by_id, list_unprocessed_raw_orders, mark_raw_error, mark_raw_processed,
    raw_order_insert_deduped,
};
pub use sequences::next_order_seq;

pub const ENV_DB_URL: &str = "OMS_DATABASE_URL";

/// Connect to Postgres using OMS_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'raw_orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_raw_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_raw_orders_table: bool,
}

/// Detect a Postgres unique constraint violation by name.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
