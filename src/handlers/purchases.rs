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
use crate::models::purchase::{
    CreatePurchaseRequest, PaymentType, PurchaseDetail, PurchaseInvoice, PurchaseResponse,
};
use crate::pagination::{order_by, Page, Pagination};
use crate::stock::ledger;
use crate::AppState;

const SORT_FIELDS: &[&str] = &["purchase_datetime", "total", "created_at"];

#[derive(Debug, Deserialize)]
pub struct PurchaseFilter {
    pub supplier_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub entry_by_id: Option<Uuid>,
    pub payment_type: Option<PaymentType>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut filter): Query<PurchaseFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<PurchaseInvoice>>> {
    if !current_user.is_admin() {
        filter.shop_id = current_user.shop_id;
    }

    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "purchase_datetime DESC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM purchase_invoices WHERE lifecycle = 'active'");
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM purchase_invoices WHERE lifecycle = 'active'");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let purchases: Vec<PurchaseInvoice> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(purchases, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &PurchaseFilter) {
    if let Some(supplier_id) = filter.supplier_id {
        query.push(" AND supplier_id = ").push_bind(supplier_id);
    }
    if let Some(shop_id) = filter.shop_id {
        query.push(" AND shop_id = ").push_bind(shop_id);
    }
    if let Some(entry_by_id) = filter.entry_by_id {
        query.push(" AND entry_by_id = ").push_bind(entry_by_id);
    }
    if let Some(payment_type) = filter.payment_type {
        query
            .push(" AND payment_type = ")
            .push_bind(payment_type.as_str());
    }
    if let Some(min_total) = filter.min_total {
        query.push(" AND total >= ").push_bind(min_total);
    }
    if let Some(max_total) = filter.max_total {
        query.push(" AND total <= ").push_bind(max_total);
    }
    if let Some(date_from) = filter.date_from {
        query.push(" AND purchase_datetime >= ").push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        query.push(" AND purchase_datetime <= ").push_bind(date_to);
    }
}

pub async fn get(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PurchaseResponse>> {
    let invoice: Option<PurchaseInvoice> =
        sqlx::query_as("SELECT * FROM purchase_invoices WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    let invoice = invoice.ok_or(Error::NotFound("purchase invoice"))?;
    current_user.ensure_shop_access(invoice.shop_id)?;

    let details: Vec<PurchaseDetail> = sqlx::query_as(
        "SELECT * FROM purchase_details WHERE purchase_invoice_id = $1 ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PurchaseResponse { invoice, details }))
}

/// Records a purchase and credits the receiving shop's inventory for every
/// line, all in one transaction.
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>)> {
    current_user.ensure_shop_access(req.shop_id)?;
    req.validate()?;

    let mut tx = state.db.begin().await?;

    let supplier_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(req.supplier_id)
    .fetch_one(&mut *tx)
    .await?;
    if !supplier_exists {
        return Err(Error::NotFound("supplier"));
    }

    let invoice: PurchaseInvoice = sqlx::query_as(
        r#"
        INSERT INTO purchase_invoices
            (supplier_id, shop_id, purchase_datetime, total, payment_type, entry_by_id, remarks)
        VALUES ($1, $2, NOW(), $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(req.supplier_id)
    .bind(req.shop_id)
    .bind(req.total())
    .bind(req.payment_type.as_str())
    .bind(current_user.id)
    .bind(&req.remarks)
    .fetch_one(&mut *tx)
    .await?;

    let mut details = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let detail: PurchaseDetail = sqlx::query_as(
            r#"
            INSERT INTO purchase_details (purchase_invoice_id, product_id, quantity, purchase_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.purchase_price)
        .fetch_one(&mut *tx)
        .await?;

        ledger::adjust(&mut tx, item.product_id, req.shop_id, item.quantity).await?;
        details.push(detail);
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(PurchaseResponse { invoice, details })))
}

/// Soft-deletes a purchase and takes the received stock back out of the
/// shop's inventory. Fails with `InsufficientStock` if it was already sold
/// or moved on.
pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    let mut tx = state.db.begin().await?;

    let invoice: Option<PurchaseInvoice> = sqlx::query_as(
        "SELECT * FROM purchase_invoices WHERE id = $1 AND lifecycle = 'active' FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let invoice = invoice.ok_or(Error::NotFound("purchase invoice"))?;

    let details: Vec<PurchaseDetail> =
        sqlx::query_as("SELECT * FROM purchase_details WHERE purchase_invoice_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

    for detail in &details {
        ledger::adjust(&mut tx, detail.product_id, invoice.shop_id, -detail.quantity).await?;
    }

    sqlx::query(
        "UPDATE purchase_invoices SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "message": "purchase deleted" })))
}
