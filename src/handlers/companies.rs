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
use crate::models::company::{Company, CreateCompanyRequest, UpdateCompanyRequest};
use crate::models::shop::Shop;
use crate::pagination::{order_by, Page, Pagination};
use crate::AppState;

const SORT_FIELDS: &[&str] = &["name", "created_at"];

#[derive(Debug, Deserialize)]
pub struct CompanyFilter {
    pub name: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<CompanyFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Company>>> {
    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "name ASC")?;

    let mut count_query =
        QueryBuilder::new("SELECT COUNT(*) FROM companies WHERE lifecycle = 'active'");
    if let Some(name) = &filter.name {
        count_query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new("SELECT * FROM companies WHERE lifecycle = 'active'");
    if let Some(name) = &filter.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    query.push(format!(" ORDER BY {order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let companies: Vec<Company> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(companies, &pagination, total)))
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>> {
    let company: Option<Company> =
        sqlx::query_as("SELECT * FROM companies WHERE id = $1 AND lifecycle = 'active'")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    company.map(Json).ok_or(Error::NotFound("company"))
}

pub async fn shops(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Shop>>> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;
    if !exists {
        return Err(Error::NotFound("company"));
    }

    let shops: Vec<Shop> = sqlx::query_as(
        "SELECT * FROM shops WHERE company_id = $1 AND lifecycle = 'active' ORDER BY name",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(shops))
}

pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>)> {
    current_user.require_admin()?;

    if req.name.is_empty() {
        return Err(Error::Validation("company name is required".into()));
    }

    let company: Company = sqlx::query_as(
        r#"
        INSERT INTO companies (name, address, phone, email, slogan, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.slogan)
    .bind(&req.remarks)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict("company"),
        _ => Error::Persistence(e),
    })?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn update(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>> {
    current_user.require_admin()?;

    let company: Option<Company> = sqlx::query_as(
        r#"
        UPDATE companies
        SET name = COALESCE($2, name),
            address = COALESCE($3, address),
            phone = COALESCE($4, phone),
            email = COALESCE($5, email),
            slogan = COALESCE($6, slogan),
            remarks = COALESCE($7, remarks),
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
    .bind(&req.slogan)
    .bind(&req.remarks)
    .fetch_optional(&state.db)
    .await?;

    company.map(Json).ok_or(Error::NotFound("company"))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_admin()?;

    let result = sqlx::query(
        "UPDATE companies SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1 AND lifecycle = 'active'",
    )
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("company"));
    }

    Ok(Json(serde_json::json!({ "message": "company deleted" })))
}
