use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::CurrentUser;
use crate::models::supplier::{CreateSupplierRequest, Supplier, UpdateSupplierRequest};
use crate::pagination::{order_by, Page, Pagination};
use crate::AppState;

const SORT_FIELDS: &[&str] = &["name", "created_at"];

#[derive(Debug, Deserialize)]
pub struct SupplierFilter {
    pub name: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<SupplierFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Supplier>>> {
    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "name ASC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM suppliers WHERE lifecycle = 'active'");
    if let Some(name) = &filter.name {
        count_query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM suppliers WHERE lifecycle = 'active'");
    if let Some(name) = &filter.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let suppliers: Vec<Supplier> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(suppliers, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Supplier>> {
    let supplier: Option<Supplier> =
        sqlx::query_as("SELECT * FROM suppliers WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    supplier.map(Json).ok_or(Error::NotFound("supplier"))
}

pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<Supplier>)> {
    current_user.require_manager()?;

    if req.name.is_empty() {
        return Err(Error::Validation("supplier name is required".into()));
    }

    let supplier: Supplier = sqlx::query_as(
        r#"
        INSERT INTO suppliers (name, contact_person, address, phone, email, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.contact_person)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSupplierRequest>,
) -> Result<Json<Supplier>> {
    current_user.require_manager()?;

    let supplier: Option<Supplier> = sqlx::query_as(
        r#"
        UPDATE suppliers
        SET name = COALESCE($2, name),
            contact_person = COALESCE($3, contact_person),
            address = COALESCE($4, address),
            phone = COALESCE($5, phone),
            email = COALESCE($6, email),
            remarks = COALESCE($7, remarks),
            updated_at = NOW()
        WHERE id = $1 AND lifecycle = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.contact_person)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.remarks)
    .fetch_optional(&state.db)
    .await?;

    supplier.map(Json).ok_or(Error::NotFound("supplier"))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    let result = sqlx::query(
        "UPDATE suppliers SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1 AND lifecycle = 'active'",
    )
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("supplier"));
    }

    Ok(Json(serde_json::json!({ "message": "supplier deleted" })))
}
