use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Lifecycle;
use crate::error::{Error, Result};

#[derive(Debug, Serialize, FromRow)]
pub struct SalesInvoice {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub sales_by_id: Uuid,
    pub sale_datetime: DateTime<Utc>,
    pub total: Decimal,
    pub discount: Decimal,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SalesDetail {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub sales_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub invoice: SalesInvoice,
    pub details: Vec<SalesDetail>,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub sales_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub shop_id: Uuid,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub discount: Decimal,
    pub remarks: Option<String>,
    pub items: Vec<SaleItemRequest>,
}

impl CreateSaleRequest {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::Validation("a sale needs at least one item".into()));
        }
        if self.discount < Decimal::ZERO {
            return Err(Error::Validation("discount must not be negative".into()));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(Error::Validation("item quantity must be positive".into()));
            }
            if item.sales_price < Decimal::ZERO {
                return Err(Error::Validation("item price must not be negative".into()));
            }
        }
        Ok(())
    }

    /// Invoice total: sum of line subtotals minus the invoice discount.
    pub fn total(&self) -> Decimal {
        let gross: Decimal = self
            .items
            .iter()
            .map(|item| item.sales_price * Decimal::from(item.quantity))
            .sum();
        gross - self.discount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreateSaleRequest {
        CreateSaleRequest {
            shop_id: Uuid::new_v4(),
            customer_id: None,
            discount: dec!(50),
            remarks: None,
            items: vec![
                SaleItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 2,
                    sales_price: dec!(795.00),
                },
                SaleItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    sales_price: dec!(1200.00),
                },
            ],
        }
    }

    #[test]
    fn total_is_gross_minus_discount() {
        assert_eq!(request().total(), dec!(2740.00));
    }

    #[test]
    fn sale_validation() {
        assert!(request().validate().is_ok());

        let mut empty = request();
        empty.items.clear();
        assert!(empty.validate().is_err());

        let mut bad_qty = request();
        bad_qty.items[0].quantity = 0;
        assert!(bad_qty.validate().is_err());

        let mut bad_discount = request();
        bad_discount.discount = dec!(-1);
        assert!(bad_discount.validate().is_err());
    }
}
