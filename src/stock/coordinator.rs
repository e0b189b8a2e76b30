//! Transfer orchestration: state machine enforcement plus ledger
//! consistency. Every public operation is one transaction; any ledger or
//! persistence failure rolls the whole unit back, so a partially applied
//! transfer is never visible.
//!
//! Policy: a transfer moves stock when it is created — a PENDING transfer
//! has already debited its source and credited its destination. Cancelling
//! or rejecting it reverses that movement in the same transaction as the
//! status change.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ledger;
use super::status::TransferStatus;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::models::transfer::{
    CreateTransferRequest, StockTransfer, StockTransferHistory, TransferJoinRow, TransferResponse,
};
use crate::pagination::{order_by, Page, Pagination};

const SORT_FIELDS: &[&str] = &["transfer_datetime", "quantity", "status", "created_at"];

const JOINED_SELECT: &str = r#"
    SELECT t.*,
           p.code AS product_code,
           p.name AS product_name,
           fs.name AS from_shop_name,
           ts.name AS to_shop_name,
           u.username AS transferred_by_username
    FROM stock_transfers t
    LEFT JOIN products p ON p.id = t.product_id
    LEFT JOIN shops fs ON fs.id = t.from_shop_id
    LEFT JOIN shops ts ON ts.id = t.to_shop_id
    LEFT JOIN users u ON u.id = t.transferred_by
"#;

#[derive(Debug, Default, Deserialize)]
pub struct TransferFilter {
    pub product_id: Option<Uuid>,
    /// Transfers touching this shop on either endpoint.
    pub shop_id: Option<Uuid>,
    pub from_shop_id: Option<Uuid>,
    pub to_shop_id: Option<Uuid>,
    pub status: Option<TransferStatus>,
    pub transferred_by: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort: Option<String>,
}

#[derive(Clone)]
pub struct StockTransferCoordinator {
    db: Database,
}

impl StockTransferCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a transfer and moves the stock, all in one unit: guarded
    /// debit of the source (skipped for the central source), credit of the
    /// destination, the PENDING transfer row, and its first history row.
    pub async fn create(
        &self,
        req: &CreateTransferRequest,
        actor: Uuid,
    ) -> Result<TransferResponse> {
        validate_request(req)?;

        let mut tx = self.db.begin().await?;

        ensure_product_exists(&mut tx, req.product_id).await?;
        ensure_shop_exists(&mut tx, req.to_shop_id).await?;
        if let Some(from_shop_id) = req.from_shop_id {
            ensure_shop_exists(&mut tx, from_shop_id).await?;
            ledger::adjust(&mut tx, req.product_id, from_shop_id, -req.quantity).await?;
        }
        ledger::adjust(&mut tx, req.product_id, req.to_shop_id, req.quantity).await?;

        let transfer: StockTransfer = sqlx::query_as(
            r#"
            INSERT INTO stock_transfers
                (from_shop_id, to_shop_id, product_id, quantity, status,
                 transfer_datetime, transferred_by, remarks)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6, $7)
            RETURNING *
            "#,
        )
        .bind(req.from_shop_id)
        .bind(req.to_shop_id)
        .bind(req.product_id)
        .bind(req.quantity)
        .bind(TransferStatus::Pending.as_str())
        .bind(actor)
        .bind(&req.remarks)
        .fetch_one(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            transfer.id,
            TransferStatus::Pending,
            actor,
            req.remarks.as_deref(),
        )
        .await?;

        tx.commit().await?;

        self.get(transfer.id).await
    }

    /// Applies a status transition, reversing the ledger movement when the
    /// transfer leaves the live path (cancelled or rejected).
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: TransferStatus,
        actor: Uuid,
        reason: Option<&str>,
    ) -> Result<TransferResponse> {
        let mut tx = self.db.begin().await?;

        let current = fetch_for_update(&mut tx, id).await?;
        if !current.status.can_transition(new_status) {
            return Err(Error::InvalidStateTransition {
                from: current.status,
                to: new_status,
            });
        }

        if new_status.reverses_ledger() {
            reverse_ledger_effect(&mut tx, &current).await?;
        }

        let _updated: StockTransfer = match new_status {
            TransferStatus::Approved => {
                sqlx::query_as(
                    r#"
                    UPDATE stock_transfers
                    SET status = $2, approved_by = $3, approved_at = NOW(), updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(new_status.as_str())
                .bind(actor)
                .fetch_one(&mut *tx)
                .await?
            }
            TransferStatus::Completed => {
                sqlx::query_as(
                    r#"
                    UPDATE stock_transfers
                    SET status = $2, completed_by = $3, completed_at = NOW(), updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(new_status.as_str())
                .bind(actor)
                .fetch_one(&mut *tx)
                .await?
            }
            TransferStatus::Rejected => {
                sqlx::query_as(
                    r#"
                    UPDATE stock_transfers
                    SET status = $2, rejected_by = $3, rejected_at = NOW(),
                        rejection_reason = $4, updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(new_status.as_str())
                .bind(actor)
                .bind(reason)
                .fetch_one(&mut *tx)
                .await?
            }
            _ => {
                sqlx::query_as(
                    "UPDATE stock_transfers SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(new_status.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        append_history(&mut tx, id, new_status, actor, reason).await?;

        tx.commit().await?;

        self.get(id).await
    }

    /// Changes the quantity of a transfer that is still PENDING. The
    /// difference to the recorded quantity is applied to both endpoints
    /// atomically with the update.
    pub async fn update_quantity(
        &self,
        id: Uuid,
        new_quantity: i64,
        actor: Uuid,
    ) -> Result<TransferResponse> {
        if new_quantity <= 0 {
            return Err(Error::InvalidTransfer("quantity must be positive".into()));
        }

        let mut tx = self.db.begin().await?;

        let current = fetch_for_update(&mut tx, id).await?;
        if current.status != TransferStatus::Pending {
            return Err(Error::InvalidTransfer(
                "only a pending transfer can be edited".into(),
            ));
        }

        let delta = new_quantity - current.quantity;
        if delta != 0 {
            if let Some(from_shop_id) = current.from_shop_id {
                ledger::adjust(&mut tx, current.product_id, from_shop_id, -delta).await?;
            }
            ledger::adjust(&mut tx, current.product_id, current.to_shop_id, delta).await?;
        }

        sqlx::query("UPDATE stock_transfers SET quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(new_quantity)
            .execute(&mut *tx)
            .await?;

        let remark = format!(
            "quantity changed from {} to {}",
            current.quantity, new_quantity
        );
        append_history(&mut tx, id, current.status, actor, Some(&remark)).await?;

        tx.commit().await?;

        self.get(id).await
    }

    /// Soft-deletes a transfer. Live transfers have their ledger movement
    /// reversed first; cancelled and rejected transfers were already
    /// reversed; completed transfers cannot be deleted.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let current = fetch_for_update(&mut tx, id).await?;
        match current.status {
            TransferStatus::Completed => {
                return Err(Error::InvalidTransfer(
                    "a completed transfer cannot be deleted".into(),
                ));
            }
            TransferStatus::Cancelled | TransferStatus::Rejected => {}
            _ => reverse_ledger_effect(&mut tx, &current).await?,
        }

        sqlx::query(
            "UPDATE stock_transfers SET lifecycle = 'deleted', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<TransferResponse> {
        let row: Option<TransferJoinRow> =
            sqlx::query_as(&format!("{JOINED_SELECT} WHERE t.id = $1 AND t.lifecycle = 'active'"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        row.map(TransferResponse::from)
            .ok_or(Error::NotFound("stock transfer"))
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<StockTransferHistory>> {
        // 404 for unknown transfers, empty history is impossible otherwise
        self.get(id).await?;

        let rows = sqlx::query_as(
            "SELECT * FROM stock_transfer_history WHERE stock_transfer_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn list(
        &self,
        filter: &TransferFilter,
        pagination: &Pagination,
    ) -> Result<Page<TransferResponse>> {
        let order = order_by(filter.sort.as_deref(), SORT_FIELDS, "transfer_datetime DESC")?;

        let mut count_query = QueryBuilder::new(
            "SELECT COUNT(*) FROM stock_transfers t WHERE t.lifecycle = 'active'",
        );
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut query = QueryBuilder::new(JOINED_SELECT);
        query.push(" WHERE t.lifecycle = 'active'");
        push_filters(&mut query, filter);
        query.push(format!(" ORDER BY t.{order}"));
        query.push(" LIMIT ");
        query.push_bind(pagination.page_size());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let rows: Vec<TransferJoinRow> = query.build_query_as().fetch_all(&self.db).await?;
        let data = rows.into_iter().map(TransferResponse::from).collect();

        Ok(Page::new(data, pagination, total))
    }
}

fn validate_request(req: &CreateTransferRequest) -> Result<()> {
    if req.quantity <= 0 {
        return Err(Error::InvalidTransfer("quantity must be positive".into()));
    }
    if req.from_shop_id == Some(req.to_shop_id) {
        return Err(Error::InvalidTransfer(
            "source and destination shop are the same".into(),
        ));
    }
    Ok(())
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &TransferFilter) {
    if let Some(product_id) = filter.product_id {
        query.push(" AND t.product_id = ").push_bind(product_id);
    }
    if let Some(shop_id) = filter.shop_id {
        query
            .push(" AND (t.from_shop_id = ")
            .push_bind(shop_id)
            .push(" OR t.to_shop_id = ")
            .push_bind(shop_id)
            .push(")");
    }
    if let Some(from_shop_id) = filter.from_shop_id {
        query.push(" AND t.from_shop_id = ").push_bind(from_shop_id);
    }
    if let Some(to_shop_id) = filter.to_shop_id {
        query.push(" AND t.to_shop_id = ").push_bind(to_shop_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(transferred_by) = filter.transferred_by {
        query
            .push(" AND t.transferred_by = ")
            .push_bind(transferred_by);
    }
    if let Some(date_from) = filter.date_from {
        query
            .push(" AND t.transfer_datetime >= ")
            .push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        query.push(" AND t.transfer_datetime <= ").push_bind(date_to);
    }
}

/// Locks the transfer row for the rest of the transaction so concurrent
/// status changes and deletes serialize.
async fn fetch_for_update(conn: &mut PgConnection, id: Uuid) -> Result<StockTransfer> {
    let transfer: Option<StockTransfer> =
        sqlx::query_as("SELECT * FROM stock_transfers WHERE id = $1 AND lifecycle = 'active' FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    transfer.ok_or(Error::NotFound("stock transfer"))
}

/// Gives the moved stock back: credit the source (when there is one),
/// guarded debit of the destination. Fails with `InsufficientStock` if the
/// destination has already consumed the stock.
async fn reverse_ledger_effect(conn: &mut PgConnection, transfer: &StockTransfer) -> Result<()> {
    ledger::adjust(
        &mut *conn,
        transfer.product_id,
        transfer.to_shop_id,
        -transfer.quantity,
    )
    .await?;
    if let Some(from_shop_id) = transfer.from_shop_id {
        ledger::adjust(&mut *conn, transfer.product_id, from_shop_id, transfer.quantity).await?;
    }
    Ok(())
}

async fn append_history(
    conn: &mut PgConnection,
    transfer_id: Uuid,
    status: TransferStatus,
    changed_by: Uuid,
    remarks: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_transfer_history (stock_transfer_id, status, changed_by, remarks)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(transfer_id)
    .bind(status.as_str())
    .bind(changed_by)
    .bind(remarks)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn ensure_product_exists(conn: &mut PgConnection, product_id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(Error::NotFound("product"))
    }
}

async fn ensure_shop_exists(conn: &mut PgConnection, shop_id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM shops WHERE id = $1 AND lifecycle = 'active')",
    )
    .bind(shop_id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(Error::NotFound("shop"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: Option<Uuid>, to: Uuid, quantity: i64) -> CreateTransferRequest {
        CreateTransferRequest {
            from_shop_id: from,
            to_shop_id: to,
            product_id: Uuid::new_v4(),
            quantity,
            remarks: None,
        }
    }

    #[test]
    fn self_transfer_is_invalid() {
        let shop = Uuid::new_v4();
        let err = validate_request(&request(Some(shop), shop, 5)).unwrap_err();
        assert!(matches!(err, Error::InvalidTransfer(_)));
    }

    #[test]
    fn non_positive_quantity_is_invalid() {
        let to = Uuid::new_v4();
        assert!(validate_request(&request(None, to, 0)).is_err());
        assert!(validate_request(&request(None, to, -4)).is_err());
    }

    #[test]
    fn central_source_transfer_is_valid() {
        let to = Uuid::new_v4();
        assert!(validate_request(&request(None, to, 1)).is_ok());
    }

    #[test]
    fn shop_to_shop_transfer_is_valid() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        assert!(validate_request(&request(Some(from), to, 20)).is_ok());
    }
}
