pub mod analytics;
pub mod auth;
pub mod companies;
pub mod customers;
pub mod inventory;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod shops;
pub mod suppliers;
pub mod transfers;
pub mod users;
