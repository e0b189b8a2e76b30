use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Lifecycle;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Cash,
    Credit,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "CASH",
            PaymentType::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PaymentType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        match value.as_str() {
            "CASH" => Ok(PaymentType::Cash),
            "CREDIT" => Ok(PaymentType::Credit),
            other => Err(format!("unknown payment type: {other}")),
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct PurchaseInvoice {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub shop_id: Uuid,
    pub purchase_datetime: DateTime<Utc>,
    pub total: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_type: PaymentType,
    pub entry_by_id: Uuid,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct PurchaseDetail {
    pub id: Uuid,
    pub purchase_invoice_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub purchase_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    #[serde(flatten)]
    pub invoice: PurchaseInvoice,
    pub details: Vec<PurchaseDetail>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub purchase_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub supplier_id: Uuid,
    /// Shop receiving the purchased stock.
    pub shop_id: Uuid,
    pub payment_type: PaymentType,
    pub remarks: Option<String>,
    pub items: Vec<PurchaseItemRequest>,
}

impl CreatePurchaseRequest {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::Validation(
                "a purchase needs at least one item".into(),
            ));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(Error::Validation("item quantity must be positive".into()));
            }
            if item.purchase_price < Decimal::ZERO {
                return Err(Error::Validation("item price must not be negative".into()));
            }
        }
        Ok(())
    }

    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.purchase_price * Decimal::from(item.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_sums_line_amounts() {
        let req = CreatePurchaseRequest {
            supplier_id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            payment_type: PaymentType::Cash,
            remarks: None,
            items: vec![
                PurchaseItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 10,
                    purchase_price: dec!(450.00),
                },
                PurchaseItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 3,
                    purchase_price: dec!(90.50),
                },
            ],
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.total(), dec!(4771.50));
    }
}
