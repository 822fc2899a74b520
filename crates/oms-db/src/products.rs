use anyhow::{Context, Result};
use sqlx::PgPool;

/// All stored `(channel_product_code, product_code)` pairs.
pub async fn load_product_mappings(pool: &PgPool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "select channel_product_code, product_code from product_mappings order by channel_product_code",
    )
    .fetch_all(pool)
    .await
    .context("load_product_mappings failed")?;
    Ok(rows)
}

pub async fn upsert_product_mapping(
    pool: &PgPool,
    channel_product_code: &str,
    product_code: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into product_mappings (channel_product_code, product_code)
        values ($1, $2)
        on conflict (channel_product_code) do update
          set product_code = excluded.product_code,
              updated_at = now()
        "#,
    )
    .bind(channel_product_code)
    .bind(product_code)
    .execute(pool)
    .await
    .context("upsert_product_mapping failed")?;
    Ok(())
}
