use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
pub struct SalesAnalytics {
    pub today_sales: Decimal,
    pub monthly_sales: Decimal,
    pub yearly_sales: Decimal,
    pub products_sold_today: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Decimal,
}
