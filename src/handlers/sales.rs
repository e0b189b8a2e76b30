use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::CurrentUser;
use crate::models::sale::{CreateSaleRequest, SaleResponse, SalesDetail, SalesInvoice};
use crate::pagination::{order_by, Page, Pagination};
use crate::stock::ledger;
use crate::AppState;

const SORT_FIELDS: &[&str] = &["sale_datetime", "total", "created_at"];

#[derive(Debug, Deserialize)]
pub struct SaleFilter {
    pub shop_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub sales_by_id: Option<Uuid>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut filter): Query<SaleFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<SalesInvoice>>> {
    if !current_user.is_admin() {
        filter.shop_id = current_user.shop_id;
    }

    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "sale_datetime DESC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM sales_invoices WHERE lifecycle = 'active'");
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM sales_invoices WHERE lifecycle = 'active'");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let sales: Vec<SalesInvoice> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(sales, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &SaleFilter) {
    if let Some(shop_id) = filter.shop_id {
        query.push(" AND shop_id = ").push_bind(shop_id);
    }
    if let Some(customer_id) = filter.customer_id {
        query.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(sales_by_id) = filter.sales_by_id {
        query.push(" AND sales_by_id = ").push_bind(sales_by_id);
    }
    if let Some(min_total) = filter.min_total {
        query.push(" AND total >= ").push_bind(min_total);
    }
    if let Some(max_total) = filter.max_total {
        query.push(" AND total <= ").push_bind(max_total);
    }
    if let Some(date_from) = filter.date_from {
        query.push(" AND sale_datetime >= ").push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        query.push(" AND sale_datetime <= ").push_bind(date_to);
    }
}

pub async fn get(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleResponse>> {
    let invoice: Option<SalesInvoice> =
        sqlx::query_as("SELECT * FROM sales_invoices WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    let invoice = invoice.ok_or(Error::NotFound("sales invoice"))?;
    current_user.ensure_shop_access(invoice.shop_id)?;

    let details: Vec<SalesDetail> =
        sqlx::query_as("SELECT * FROM sales_details WHERE invoice_id = $1 ORDER BY created_at")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(SaleResponse { invoice, details }))
}

/// Records a sale and debits the shop's inventory for every line. The
/// guarded debit makes an oversell fail with `InsufficientStock`, rolling
/// back the whole invoice.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>)> {
    current_user.ensure_shop_access(req.shop_id)?;
    req.validate()?;

    let mut tx = state.db.begin().await?;

    if let Some(customer_id) = req.customer_id {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1 AND lifecycle = 'active')",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(Error::NotFound("customer"));
        }
    }

    let invoice: SalesInvoice = sqlx::query_as(
        r#"
        INSERT INTO sales_invoices
            (shop_id, customer_id, sales_by_id, sale_datetime, total, discount, remarks)
        VALUES ($1, $2, $3, NOW(), $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(req.shop_id)
    .bind(req.customer_id)
    .bind(current_user.id)
    .bind(req.total())
    .bind(req.discount)
    .bind(&req.remarks)
    .fetch_one(&mut *tx)
    .await?;

    let mut details = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let subtotal = item.sales_price * Decimal::from(item.quantity);
        let detail: SalesDetail = sqlx::query_as(
            r#"
            INSERT INTO sales_details (invoice_id, product_id, quantity, sales_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.sales_price)
        .bind(subtotal)
        .fetch_one(&mut *tx)
        .await?;

        ledger::adjust(&mut tx, item.product_id, req.shop_id, -item.quantity).await?;
        details.push(detail);
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(SaleResponse { invoice, details })))
}

/// Soft-deletes a sale and returns the sold quantities to the shop's
/// inventory.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    let mut tx = state.db.begin().await?;

    let invoice: Option<SalesInvoice> = sqlx::query_as(
        "SELECT * FROM sales_invoices WHERE id = $1 AND lifecycle = 'active' FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let invoice = invoice.ok_or(Error::NotFound("sales invoice"))?;

    let details: Vec<SalesDetail> =
        sqlx::query_as("SELECT * FROM sales_details WHERE invoice_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

    for detail in &details {
        ledger::adjust(&mut tx, detail.product_id, invoice.shop_id, detail.quantity).await?;
    }

    sqlx::query("UPDATE sales_invoices SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "message": "sale deleted" })))
}
