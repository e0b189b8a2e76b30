//! Ledger coupling of purchases and sales against a real Postgres
//! database: a purchase credits the receiving shop, a sale takes a guarded
//! debit, and deleting either reverses its movement.
//!
//! Needs `DATABASE_URL` with the migrations applied; `#[ignore]`d by
//! default, run with `cargo test -- --ignored`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use stockroom::config::Config;
use stockroom::error::Error;
use stockroom::handlers::{purchases, sales};
use stockroom::middleware::CurrentUser;
use stockroom::models::purchase::{CreatePurchaseRequest, PaymentType, PurchaseItemRequest};
use stockroom::models::sale::{CreateSaleRequest, SaleItemRequest};
use stockroom::models::user::UserRole;
use stockroom::stock::ledger;
use stockroom::AppState;

struct Fixture {
    state: AppState,
    user: CurrentUser,
    product_id: Uuid,
    shop_id: Uuid,
    supplier_id: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("database connection");
        let tag = Uuid::new_v4().simple().to_string();

        let company_id: Uuid =
            sqlx::query_scalar("INSERT INTO companies (name) VALUES ($1) RETURNING id")
                .bind(format!("test-co-{tag}"))
                .fetch_one(&pool)
                .await
                .unwrap();
        let shop_id: Uuid =
            sqlx::query_scalar("INSERT INTO shops (company_id, name) VALUES ($1, $2) RETURNING id")
                .bind(company_id)
                .bind(format!("shop-{tag}"))
                .fetch_one(&pool)
                .await
                .unwrap();
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password_hash, email, first_name, last_name, role, shop_id)
            VALUES ($1, 'x', $2, 'Test', 'User', 'manager', $3)
            RETURNING id
            "#,
        )
        .bind(format!("clerk-{tag}"))
        .bind(format!("clerk-{tag}@example.com"))
        .bind(shop_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let product_id: Uuid = sqlx::query_scalar(
            "INSERT INTO products (code, name, shop_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(format!("SKU-{tag}"))
        .bind("Test Product")
        .bind(shop_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let supplier_id: Uuid =
            sqlx::query_scalar("INSERT INTO suppliers (name) VALUES ($1) RETURNING id")
                .bind(format!("supplier-{tag}"))
                .fetch_one(&pool)
                .await
                .unwrap();

        let config = Config {
            database_url: url,
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_expires_in_hours: 24,
            refresh_expires_in_days: 7,
        };
        let user = CurrentUser {
            id: user_id,
            username: format!("clerk-{tag}"),
            role: UserRole::Manager,
            shop_id: Some(shop_id),
        };

        Self {
            state: AppState::new(pool, config),
            user,
            product_id,
            shop_id,
            supplier_id,
        }
    }

    async fn seed(&self, quantity: i64) {
        let mut conn = self.state.db.acquire().await.unwrap();
        ledger::adjust(&mut conn, self.product_id, self.shop_id, quantity)
            .await
            .unwrap();
    }

    async fn quantity(&self) -> i64 {
        ledger::get(&self.state.db, self.product_id, self.shop_id)
            .await
            .unwrap()
    }

    fn sale(&self, quantity: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            shop_id: self.shop_id,
            customer_id: None,
            discount: dec!(0),
            remarks: None,
            items: vec![SaleItemRequest {
                product_id: self.product_id,
                quantity,
                sales_price: dec!(25.00),
            }],
        }
    }

    fn purchase(&self, quantity: i64) -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            supplier_id: self.supplier_id,
            shop_id: self.shop_id,
            payment_type: PaymentType::Cash,
            remarks: None,
            items: vec![PurchaseItemRequest {
                product_id: self.product_id,
                quantity,
                purchase_price: dec!(10.00),
            }],
        }
    }
}

#[tokio::test]
#[ignore]
async fn sale_debits_ledger_and_oversell_rolls_back() {
    let fx = Fixture::new().await;
    fx.seed(10).await;

    let (status, Json(sale)) =
        sales::create(State(fx.state.clone()), fx.user.clone(), Json(fx.sale(4)))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale.details.len(), 1);
    assert_eq!(sale.invoice.total, dec!(100.00));
    assert_eq!(fx.quantity().await, 6);

    // Overselling fails and leaves no trace of the invoice
    let err = sales::create(State(fx.state.clone()), fx.user.clone(), Json(fx.sale(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));
    assert_eq!(fx.quantity().await, 6);

    let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_invoices WHERE shop_id = $1")
        .bind(fx.shop_id)
        .fetch_one(&fx.state.db)
        .await
        .unwrap();
    assert_eq!(invoices, 1);

    let details: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM sales_details sd
        JOIN sales_invoices si ON si.id = sd.invoice_id
        WHERE si.shop_id = $1
        "#,
    )
    .bind(fx.shop_id)
    .fetch_one(&fx.state.db)
    .await
    .unwrap();
    assert_eq!(details, 1);
}

#[tokio::test]
#[ignore]
async fn purchase_credits_ledger_and_delete_is_guarded() {
    let fx = Fixture::new().await;

    let (status, Json(purchase)) = purchases::create(
        State(fx.state.clone()),
        fx.user.clone(),
        Json(fx.purchase(20)),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(fx.quantity().await, 20);

    // Most of the received stock gets sold on
    sales::create(State(fx.state.clone()), fx.user.clone(), Json(fx.sale(15)))
        .await
        .unwrap();
    assert_eq!(fx.quantity().await, 5);

    // Taking back 20 units when only 5 remain must fail and change nothing
    let err = purchases::delete(
        State(fx.state.clone()),
        fx.user.clone(),
        Path(purchase.invoice.id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));
    assert_eq!(fx.quantity().await, 5);

    let lifecycle: String =
        sqlx::query_scalar("SELECT lifecycle FROM purchase_invoices WHERE id = $1")
            .bind(purchase.invoice.id)
            .fetch_one(&fx.state.db)
            .await
            .unwrap();
    assert_eq!(lifecycle, "active");

    // A purchase whose stock is still on hand deletes cleanly
    let (_, Json(second)) = purchases::create(
        State(fx.state.clone()),
        fx.user.clone(),
        Json(fx.purchase(10)),
    )
    .await
    .unwrap();
    assert_eq!(fx.quantity().await, 15);

    purchases::delete(
        State(fx.state.clone()),
        fx.user.clone(),
        Path(second.invoice.id),
    )
    .await
    .unwrap();
    assert_eq!(fx.quantity().await, 5);
}
