pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod stock;
pub mod utils;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use database::Database;
use stock::StockTransferCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub transfers: StockTransferCoordinator,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            transfers: StockTransferCoordinator::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Public routes (no authentication required)
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/refresh", post(handlers::auth::refresh))
        // Users
        .route(
            "/api/users/me",
            get(handlers::users::me).put(handlers::users::update_me),
        )
        .route("/api/users/change-password", put(handlers::users::change_password))
        // Companies
        .route(
            "/api/companies",
            get(handlers::companies::list).post(handlers::companies::create),
        )
        .route(
            "/api/companies/:id",
            get(handlers::companies::get)
                .put(handlers::companies::update)
                .delete(handlers::companies::delete),
        )
        .route("/api/companies/:id/shops", get(handlers::companies::shops))
        // Shops
        .route(
            "/api/shops",
            get(handlers::shops::list).post(handlers::shops::create),
        )
        .route(
            "/api/shops/:id",
            get(handlers::shops::get)
                .put(handlers::shops::update)
                .delete(handlers::shops::delete),
        )
        // Products
        .route(
            "/api/products",
            get(handlers::products::list).post(handlers::products::create),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get)
                .put(handlers::products::update)
                .delete(handlers::products::delete),
        )
        // Customers
        .route(
            "/api/customers",
            get(handlers::customers::list).post(handlers::customers::create),
        )
        .route(
            "/api/customers/:id",
            get(handlers::customers::get)
                .put(handlers::customers::update)
                .delete(handlers::customers::delete),
        )
        // Suppliers
        .route(
            "/api/suppliers",
            get(handlers::suppliers::list).post(handlers::suppliers::create),
        )
        .route(
            "/api/suppliers/:id",
            get(handlers::suppliers::get)
                .put(handlers::suppliers::update)
                .delete(handlers::suppliers::delete),
        )
        // Purchases
        .route(
            "/api/purchases",
            get(handlers::purchases::list).post(handlers::purchases::create),
        )
        .route(
            "/api/purchases/:id",
            get(handlers::purchases::get).delete(handlers::purchases::delete),
        )
        // Sales and analytics
        .route(
            "/api/sales",
            get(handlers::sales::list).post(handlers::sales::create),
        )
        .route("/api/sales/analytics", get(handlers::analytics::sales_summary))
        .route(
            "/api/sales/analytics/last-7-days",
            get(handlers::analytics::last_7_days),
        )
        .route(
            "/api/sales/:id",
            get(handlers::sales::get).delete(handlers::sales::delete),
        )
        // Inventory
        .route("/api/inventory", get(handlers::inventory::list))
        .route("/api/inventory/quantity", get(handlers::inventory::quantity))
        .route("/api/inventory/low-stock", get(handlers::inventory::low_stock))
        .route("/api/inventory/shop/:shop_id", get(handlers::inventory::by_shop))
        // Stock transfers
        .route(
            "/api/stock-transfers",
            get(handlers::transfers::list).post(handlers::transfers::create),
        )
        .route(
            "/api/stock-transfers/:id",
            get(handlers::transfers::get).delete(handlers::transfers::delete),
        )
        .route(
            "/api/stock-transfers/:id/status",
            put(handlers::transfers::update_status),
        )
        .route(
            "/api/stock-transfers/:id/quantity",
            put(handlers::transfers::update_quantity),
        )
        .route(
            "/api/stock-transfers/:id/history",
            get(handlers::transfers::history),
        )
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
