//! Authoritative on-hand quantity per (product, shop).
//!
//! Both operations take a `PgConnection` so callers can compose them into
//! their own transaction; the stock-sufficiency check and the debit are a
//! single conditional UPDATE, which is what serializes concurrent
//! movements against the same (product, shop) pair.

use sqlx::{PgConnection, Postgres};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Applies `delta` to the quantity of (product, shop) and returns the new
/// quantity. A missing record counts as quantity zero: credits create it,
/// debits fail with `InsufficientStock`. A debit below zero never commits.
pub async fn adjust(
    conn: &mut PgConnection,
    product_id: Uuid,
    shop_id: Uuid,
    delta: i64,
) -> Result<i64> {
    if delta >= 0 {
        let quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory (product_id, shop_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, shop_id)
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(shop_id)
        .bind(delta)
        .fetch_one(&mut *conn)
        .await?;

        Ok(quantity)
    } else {
        // Guarded decrement: zero rows affected means the stock is not there.
        let quantity: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity = quantity - $3, updated_at = NOW()
            WHERE product_id = $1 AND shop_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(shop_id)
        .bind(-delta)
        .fetch_optional(&mut *conn)
        .await?;

        quantity.ok_or(Error::InsufficientStock {
            product_id,
            shop_id,
        })
    }
}

/// Current quantity, or zero when the pair has never been stocked.
pub async fn get<'e, E>(executor: E, product_id: Uuid, shop_id: Uuid) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let quantity: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = $1 AND shop_id = $2")
            .bind(product_id)
            .bind(shop_id)
            .fetch_optional(executor)
            .await?;

    Ok(quantity.unwrap_or(0))
}
