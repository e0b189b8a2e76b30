use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::product::ProductSummary;
use super::shop::ShopSummary;
use super::Lifecycle;
use crate::stock::TransferStatus;

/// A movement of a fixed quantity of one product between shops. A null
/// `from_shop_id` denotes the central/virtual source, which carries no
/// ledger entry. Immutable once terminal, except for the audit trail.
#[derive(Debug, Serialize, FromRow)]
pub struct StockTransfer {
    pub id: Uuid,
    pub from_shop_id: Option<Uuid>,
    pub to_shop_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    #[sqlx(try_from = "String")]
    pub status: TransferStatus,
    pub transfer_datetime: DateTime<Utc>,
    pub transferred_by: Uuid,
    pub remarks: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[sqlx(try_from = "String")]
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit row, one per status transition.
#[derive(Debug, Serialize, FromRow)]
pub struct StockTransferHistory {
    pub id: Uuid,
    pub stock_transfer_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: TransferStatus,
    pub changed_by: Uuid,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Transfer row joined with the summaries the listing and detail
/// responses nest.
#[derive(Debug, FromRow)]
pub struct TransferJoinRow {
    #[sqlx(flatten)]
    pub transfer: StockTransfer,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub from_shop_name: Option<String>,
    pub to_shop_name: Option<String>,
    pub transferred_by_username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    #[serde(flatten)]
    pub transfer: StockTransfer,
    pub product: Option<ProductSummary>,
    pub from_shop: Option<ShopSummary>,
    pub to_shop: Option<ShopSummary>,
    pub transferred_by_user: Option<UserSummary>,
}

impl From<TransferJoinRow> for TransferResponse {
    fn from(row: TransferJoinRow) -> Self {
        let product = match (row.product_code, row.product_name) {
            (Some(code), Some(name)) => Some(ProductSummary {
                id: row.transfer.product_id,
                code,
                name,
            }),
            _ => None,
        };
        let from_shop = row
            .transfer
            .from_shop_id
            .zip(row.from_shop_name)
            .map(|(id, name)| ShopSummary { id, name });
        let to_shop = row.to_shop_name.map(|name| ShopSummary {
            id: row.transfer.to_shop_id,
            name,
        });
        let transferred_by_user = row.transferred_by_username.map(|username| UserSummary {
            id: row.transfer.transferred_by,
            username,
        });

        Self {
            transfer: row.transfer,
            product,
            from_shop,
            to_shop,
            transferred_by_user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub from_shop_id: Option<Uuid>,
    pub to_shop_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransferStatusRequest {
    pub status: TransferStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransferQuantityRequest {
    pub quantity: i64,
}
