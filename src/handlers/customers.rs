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
use crate::models::customer::{CreateCustomerRequest, Customer, UpdateCustomerRequest};
use crate::pagination::{order_by, Page, Pagination};
use crate::AppState;

const SORT_FIELDS: &[&str] = &["name", "created_at"];

#[derive(Debug, Deserialize)]
pub struct CustomerFilter {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<CustomerFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Customer>>> {
    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "name ASC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM customers WHERE lifecycle = 'active'");
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM customers WHERE lifecycle = 'active'");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let customers: Vec<Customer> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(customers, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &CustomerFilter) {
    if let Some(name) = &filter.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(phone) = &filter.phone {
        query.push(" AND phone = ").push_bind(phone.clone());
    }
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>> {
    let customer: Option<Customer> =
        sqlx::query_as("SELECT * FROM customers WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    customer.map(Json).ok_or(Error::NotFound("customer"))
}

pub async fn create(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    if req.name.is_empty() {
        return Err(Error::Validation("customer name is required".into()));
    }

    let customer: Customer = sqlx::query_as(
        r#"
        INSERT INTO customers (name, address, phone, email, remarks)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>> {
    let customer: Option<Customer> = sqlx::query_as(
        r#"
        UPDATE customers
        SET name = COALESCE($2, name),
            address = COALESCE($3, address),
            phone = COALESCE($4, phone),
            email = COALESCE($5, email),
            remarks = COALESCE($6, remarks),
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
    .bind(&req.remarks)
    .fetch_optional(&state.db)
    .await?;

    customer.map(Json).ok_or(Error::NotFound("customer"))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    let result = sqlx::query(
        "UPDATE customers SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1 AND lifecycle = 'active'",
    )
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("customer"));
    }

    Ok(Json(serde_json::json!({ "message": "customer deleted" })))
}
