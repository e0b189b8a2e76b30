use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::inventory::InventoryListRow;
use crate::pagination::{order_by, Page, Pagination};
use crate::stock::ledger;
use crate::AppState;

const SORT_FIELDS: &[&str] = &["quantity", "updated_at"];

const LIST_SELECT: &str = r#"
    SELECT i.id, i.product_id, i.shop_id, i.quantity, i.updated_at,
           p.code AS product_code, p.name AS product_name, s.name AS shop_name
    FROM inventory i
    JOIN products p ON p.id = i.product_id
    JOIN shops s ON s.id = i.shop_id
"#;

#[derive(Debug, Deserialize)]
pub struct InventoryFilter {
    pub shop_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut filter): Query<InventoryFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<InventoryListRow>>> {
    if !current_user.is_admin() {
        filter.shop_id = current_user.shop_id;
    }

    let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "quantity ASC")?;

    let mut count_query = QueryBuilder::new(
        r#"
        SELECT COUNT(*)
        FROM inventory i
        JOIN products p ON p.id = i.product_id
        JOIN shops s ON s.id = i.shop_id
        WHERE 1 = 1
        "#,
    );
    push_filters(&mut count_query, &filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(&state.db).await?;

    let mut query = QueryBuilder::new(LIST_SELECT);
    query.push(" WHERE 1 = 1");
    push_filters(&mut query, &filter);
    query.push(format!(" ORDER BY i.{order}"));
    query.push(" LIMIT ").push_bind(pagination.page_size());
    query.push(" OFFSET ").push_bind(pagination.offset());

    let rows: Vec<InventoryListRow> = query.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(Page::new(rows, &pagination, total)))
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &InventoryFilter) {
    if let Some(shop_id) = filter.shop_id {
        query.push(" AND i.shop_id = ").push_bind(shop_id);
    }
    if let Some(product_id) = filter.product_id {
        query.push(" AND i.product_id = ").push_bind(product_id);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.code ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn by_shop(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<InventoryListRow>>> {
    current_user.ensure_shop_access(shop_id)?;

    let rows: Vec<InventoryListRow> =
        sqlx::query_as(&format!("{LIST_SELECT} WHERE i.shop_id = $1 ORDER BY p.name"))
            .bind(shop_id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub shop_id: Uuid,
    pub threshold: Option<i64>,
}

pub async fn low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<LowStockQuery>,
) -> Result<Json<Vec<InventoryListRow>>> {
    current_user.ensure_shop_access(params.shop_id)?;

    let threshold = params.threshold.unwrap_or(10).max(0);

    let rows: Vec<InventoryListRow> = sqlx::query_as(&format!(
        "{LIST_SELECT} WHERE i.shop_id = $1 AND i.quantity <= $2 ORDER BY i.quantity"
    ))
    .bind(params.shop_id)
    .bind(threshold)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub product_id: Uuid,
    pub shop_id: Uuid,
}

/// Current on-hand quantity for one (product, shop) pair; zero when the
/// pair has never been stocked.
pub async fn quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<QuantityQuery>,
) -> Result<Json<serde_json::Value>> {
    current_user.ensure_shop_access(params.shop_id)?;

    let quantity = ledger::get(&state.db, params.product_id, params.shop_id).await?;

    Ok(Json(serde_json::json!({
        "product_id": params.product_id,
        "shop_id": params.shop_id,
        "quantity": quantity,
    })))
}
