use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Lifecycle;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesType {
    Retail,
    Wholesale,
}

impl SalesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesType::Retail => "retail",
            SalesType::Wholesale => "wholesale",
        }
    }
}

impl fmt::Display for SalesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SalesType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        match value.as_str() {
            "retail" => Ok(SalesType::Retail),
            "wholesale" => Ok(SalesType::Wholesale),
            other => Err(format!("unknown sales type: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub style: String,
    pub master_category: String,
    pub sub_category: String,
    pub color: String,
    pub size: String,
    pub purchase_price: Decimal,
    pub sales_price: Decimal,
    #[sqlx(try_from = "String")]
    pub sales_type: SalesType,
    pub shop_id: Uuid,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact product reference nested in other responses.
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub style: String,
    pub master_category: String,
    pub sub_category: String,
    pub color: String,
    pub size: String,
    pub purchase_price: Decimal,
    pub sales_price: Decimal,
    pub sales_type: SalesType,
    pub shop_id: Uuid,
    pub remarks: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<()> {
        if self.code.len() < 3 {
            return Err(Error::Validation(
                "product code must be at least 3 characters".into(),
            ));
        }
        if self.name.is_empty() {
            return Err(Error::Validation("product name is required".into()));
        }
        if self.purchase_price < Decimal::ZERO || self.sales_price < Decimal::ZERO {
            return Err(Error::Validation("prices must not be negative".into()));
        }
        if self.sales_price < self.purchase_price {
            return Err(Error::Validation(
                "sales price must not be below purchase price".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub style: Option<String>,
    pub master_category: Option<String>,
    pub sub_category: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub sales_price: Option<Decimal>,
    pub sales_type: Option<SalesType>,
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreateProductRequest {
        CreateProductRequest {
            code: "SHIRT-001".into(),
            name: "Oxford Shirt".into(),
            style: "slim".into(),
            master_category: "apparel".into(),
            sub_category: "shirts".into(),
            color: "white".into(),
            size: "M".into(),
            purchase_price: dec!(450.00),
            sales_price: dec!(795.00),
            sales_type: SalesType::Retail,
            shop_id: Uuid::new_v4(),
            remarks: None,
        }
    }

    #[test]
    fn create_product_validation() {
        assert!(request().validate().is_ok());

        let mut short_code = request();
        short_code.code = "ab".into();
        assert!(short_code.validate().is_err());

        let mut underwater = request();
        underwater.sales_price = dec!(100.00);
        assert!(underwater.validate().is_err());
    }
}
