use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::analytics::{DailySales, SalesAnalytics};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub shop_id: Option<Uuid>,
}

/// Admins may scope to any shop (or all of them); everyone else gets
/// their own shop's numbers.
fn effective_shop(current_user: &CurrentUser, requested: Option<Uuid>) -> Option<Uuid> {
    if current_user.is_admin() {
        requested
    } else {
        current_user.shop_id
    }
}

pub async fn sales_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<SalesAnalytics>> {
    let shop_id = effective_shop(&current_user, params.shop_id);

    let summary: SalesAnalytics = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(total) FILTER (WHERE sale_datetime >= date_trunc('day', NOW())), 0) AS today_sales,
            COALESCE(SUM(total) FILTER (WHERE sale_datetime >= date_trunc('month', NOW())), 0) AS monthly_sales,
            COALESCE(SUM(total) FILTER (WHERE sale_datetime >= date_trunc('year', NOW())), 0) AS yearly_sales,
            COALESCE((
                SELECT SUM(sd.quantity)
                FROM sales_details sd
                JOIN sales_invoices si ON si.id = sd.invoice_id
                WHERE si.lifecycle = 'active'
                  AND si.sale_datetime >= date_trunc('day', NOW())
                  AND ($1::uuid IS NULL OR si.shop_id = $1)
            ), 0)::BIGINT AS products_sold_today
        FROM sales_invoices
        WHERE lifecycle = 'active'
          AND ($1::uuid IS NULL OR shop_id = $1)
        "#,
    )
    .bind(shop_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(summary))
}

pub async fn last_7_days(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Vec<DailySales>>> {
    let shop_id = effective_shop(&current_user, params.shop_id);

    let series: Vec<DailySales> = sqlx::query_as(
        r#"
        SELECT d::date AS date, COALESCE(SUM(si.total), 0) AS total
        FROM generate_series(CURRENT_DATE - 6, CURRENT_DATE, INTERVAL '1 day') AS d
        LEFT JOIN sales_invoices si
            ON si.sale_datetime::date = d::date
           AND si.lifecycle = 'active'
           AND ($1::uuid IS NULL OR si.shop_id = $1)
        GROUP BY d::date
        ORDER BY d::date
        "#,
    )
    .bind(shop_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(series))
}
