use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::transfer::{
    CreateTransferRequest, StockTransferHistory, TransferResponse, UpdateTransferQuantityRequest,
    UpdateTransferStatusRequest,
};
use crate::pagination::{Page, Pagination};
use crate::stock::TransferFilter;
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut filter): Query<TransferFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<TransferResponse>>> {
    // Non-admin users only see transfers touching their own shop
    if !current_user.is_admin() {
        filter.shop_id = current_user.shop_id;
    }

    let page = state.transfers.list(&filter, &pagination).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TransferResponse>> {
    let transfer = state.transfers.get(id).await?;
    Ok(Json(transfer))
}

pub async fn history(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StockTransferHistory>>> {
    let rows = state.transfers.history(id).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>)> {
    // Moving stock out of a shop needs access to that shop; issuing from
    // central stock is a manager-level action.
    match req.from_shop_id {
        Some(from_shop_id) => current_user.ensure_shop_access(from_shop_id)?,
        None => current_user.require_manager()?,
    }

    let transfer = state.transfers.create(&req, current_user.id).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn update_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTransferStatusRequest>,
) -> Result<Json<TransferResponse>> {
    current_user.require_manager()?;

    let transfer = state
        .transfers
        .update_status(id, req.status, current_user.id, req.reason.as_deref())
        .await?;
    Ok(Json(transfer))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTransferQuantityRequest>,
) -> Result<Json<TransferResponse>> {
    current_user.require_manager()?;

    let transfer = state
        .transfers
        .update_quantity(id, req.quantity, current_user.id)
        .await?;
    Ok(Json(transfer))
}

pub async fn delete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    current_user.require_manager()?;

    state.transfers.delete(id).await?;
    Ok(Json(serde_json::json!({ "message": "stock transfer deleted" })))
}
