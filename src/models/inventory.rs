use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// On-hand quantity for one (product, shop) pair. Rows are created on the
/// first stock movement into a shop and never deleted; zero is a valid
/// committed quantity, negative is not.
#[derive(Debug, Serialize, FromRow)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inventory listing row with the joined product/shop names the UI needs.
#[derive(Debug, Serialize, FromRow)]
pub struct InventoryListRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub quantity: i64,
    pub product_code: String,
    pub product_name: String,
    pub shop_name: String,
    pub updated_at: DateTime<Utc>,
}
