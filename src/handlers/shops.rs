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
use crate::models::shop::{CreateShopRequest, Shop, UpdateShopRequest};
use crate::pagination::{order_by, Page, Pagination};
use crate::AppState;

const SORT_FIELDS: &[&str] = &["name", "created_at"];

#[derive(Debug, Deserialize)]
pub struct ShopFilter {
    pub company_id: Option<Uuid>,
    pub name: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ShopFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Shop>>> {
    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "name ASC")?;

    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM shops WHERE lifecycle = 'active'");
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM shops WHERE lifecycle = 'active'");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let shops: Vec<Shop> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(shops, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &ShopFilter) {
    if let Some(company_id) = filter.company_id {
        query.push(" AND company_id = ").push_bind(company_id);
    }
    if let Some(name) = &filter.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Shop>> {
    let shop: Option<Shop> =
        sqlx::query_as("SELECT * FROM shops WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    shop.map(Json).ok_or(Error::NotFound("shop"))
}

pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<Shop>)> {
    current_user.require_admin()?;

    if req.name.is_empty() {
        return Err(Error::Validation("shop name is required".into()));
    }

    let company_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(req.company_id)
    .fetch_one(&state.db)
    .await?;
    if !company_exists {
        return Err(Error::NotFound("company"));
    }

    let shop: Shop = sqlx::query_as(
        r#"
        INSERT INTO shops (company_id, name, address, phone, email, manager_name, manager_phone, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(req.company_id)
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.manager_name)
    .bind(&req.manager_phone)
    .bind(&req.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(shop)))
}

pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateShopRequest>,
) -> Result<Json<Shop>> {
    current_user.require_admin()?;

    let shop: Option<Shop> = sqlx::query_as(
        r#"
        UPDATE shops
        SET name = COALESCE($2, name),
            address = COALESCE($3, address),
            phone = COALESCE($4, phone),
            email = COALESCE($5, email),
            manager_name = COALESCE($6, manager_name),
            manager_phone = COALESCE($7, manager_phone),
            remarks = COALESCE($8, remarks),
            updated_at = NOW()
        WHERE id = $1 AND lifecycle = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.manager_name)
    .bind(&req.manager_phone)
    .bind(&req.remarks)
    .fetch_optional(&state.db)
    .await?;

    shop.map(Json).ok_or(Error::NotFound("shop"))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_admin()?;

    let result = sqlx::query(
        "UPDATE shops SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1 AND lifecycle = 'active'",
    )
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("shop"));
    }

    Ok(Json(serde_json::json!({ "message": "shop deleted" })))
}
