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
use crate::models::product::{CreateProductRequest, Product, SalesType, UpdateProductRequest};
use crate::pagination::{order_by, Page, Pagination};
use crate::AppState;

const SORT_FIELDS: &[&str] = &["code", "name", "sales_price", "created_at"];

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    pub shop_id: Option<Uuid>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub master_category: Option<String>,
    pub sub_category: Option<String>,
    pub sales_type: Option<SalesType>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut filter): Query<ProductFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Product>>> {
    // Non-admin users only see their own shop's catalog
    if !current_user.is_admin() {
        filter.shop_id = current_user.shop_id;
    }

    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "code ASC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM products WHERE lifecycle = 'active'");
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM products WHERE lifecycle = 'active'");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let products: Vec<Product> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(products, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &ProductFilter) {
    if let Some(shop_id) = filter.shop_id {
        query.push(" AND shop_id = ").push_bind(shop_id);
    }
    if let Some(code) = &filter.code {
        query.push(" AND code = ").push_bind(code.clone());
    }
    if let Some(name) = &filter.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(master_category) = &filter.master_category {
        query
            .push(" AND master_category = ")
            .push_bind(master_category.clone());
    }
    if let Some(sub_category) = &filter.sub_category {
        query
            .push(" AND sub_category = ")
            .push_bind(sub_category.clone());
    }
    if let Some(sales_type) = filter.sales_type {
        query.push(" AND sales_type = ").push_bind(sales_type.as_str());
    }
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    product.map(Json).ok_or(Error::NotFound("product"))
}

pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    current_user.ensure_shop_access(req.shop_id)?;
    req.validate()?;

    let shop_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM shops WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(req.shop_id)
    .fetch_one(&state.db)
    .await?;
    if !shop_exists {
        return Err(Error::NotFound("shop"));
    }

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products
            (code, name, style, master_category, sub_category, color, size,
             purchase_price, sales_price, sales_type, shop_id, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&req.code)
    .bind(&req.name)
    .bind(&req.style)
    .bind(&req.master_category)
    .bind(&req.sub_category)
    .bind(&req.color)
    .bind(&req.size)
    .bind(req.purchase_price)
    .bind(req.sales_price)
    .bind(req.sales_type.as_str())
    .bind(req.shop_id)
    .bind(&req.remarks)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict("product code"),
        _ => Error::Persistence(e),
    })?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    current_user.require_manager()?;

    let product: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products
        SET name = COALESCE($2, name),
            style = COALESCE($3, style),
            master_category = COALESCE($4, master_category),
            sub_category = COALESCE($5, sub_category),
            color = COALESCE($6, color),
            size = COALESCE($7, size),
            purchase_price = COALESCE($8, purchase_price),
            sales_price = COALESCE($9, sales_price),
            sales_type = COALESCE($10, sales_type),
            remarks = COALESCE($11, remarks),
            updated_at = NOW()
        WHERE id = $1 AND lifecycle = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.style)
    .bind(&req.master_category)
    .bind(&req.sub_category)
    .bind(&req.color)
    .bind(&req.size)
    .bind(req.purchase_price)
    .bind(req.sales_price)
    .bind(req.sales_type.map(|t| t.as_str()))
    .bind(&req.remarks)
    .fetch_optional(&state.db)
    .await?;

    product.map(Json).ok_or(Error::NotFound("product"))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    let result = sqlx::query(
        "UPDATE products SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1 AND lifecycle = 'active'",
    )
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("product"));
    }

    Ok(Json(serde_json::json!({ "message": "product deleted" })))
}
