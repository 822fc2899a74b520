use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;

/// Atomically take the next per-day order sequence number (1-based).
///
/// The first call for a day seeds the counter from the highest `order_no`
/// already stored for that day, so a counter table created after orders
/// exist never re-issues a number. Concurrent callers serialize on the
/// row lock of `seq_date`.
pub async fn next_order_seq(pool: &PgPool, day: NaiveDate) -> Result<i32> {
    let pattern = format!("OMS-{}-%", day.format("%Y%m%d"));
    let (seq,): (i32,) = sqlx::query_as::<_, (i32,)>(
        r#"
        insert into order_sequences (seq_date, last_seq)
        values (
          $1,
          coalesce(
            (select max(split_part(order_no, '-', 3)::int) from orders where order_no like $2),
            0
          ) + 1
        )
        on conflict (seq_date) do update
          set last_seq = order_sequences.last_seq + 1
        returning last_seq
        "#,
    )
    .bind(day)
    .bind(&pattern)
    .fetch_one(pool)
    .await
    .context("next_order_seq failed")?;
    Ok(seq)
}
