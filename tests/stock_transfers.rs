//! End-to-end tests for stock transfers against a real Postgres database.
//!
//! They need `DATABASE_URL` pointing at a database with the migrations
//! applied, so they are `#[ignore]`d by default:
//!
//! ```sh
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```

use sqlx::PgPool;
use uuid::Uuid;

use stockroom::error::Error;
use stockroom::models::transfer::CreateTransferRequest;
use stockroom::pagination::Pagination;
use stockroom::stock::{ledger, StockTransferCoordinator, TransferFilter, TransferStatus};

struct Fixture {
    pool: PgPool,
    transfers: StockTransferCoordinator,
    user_id: Uuid,
    product_id: Uuid,
    shop_a: Uuid,
    shop_b: Uuid,
}

impl Fixture {
    /// Creates an isolated company/shops/user/product slice so tests can
    /// share one database.
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

        let shop_a: Uuid =
            sqlx::query_scalar("INSERT INTO shops (company_id, name) VALUES ($1, $2) RETURNING id")
                .bind(company_id)
                .bind(format!("shop-a-{tag}"))
                .fetch_one(&pool)
                .await
                .unwrap();
        let shop_b: Uuid =
            sqlx::query_scalar("INSERT INTO shops (company_id, name) VALUES ($1, $2) RETURNING id")
                .bind(company_id)
                .bind(format!("shop-b-{tag}"))
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
        .bind(format!("tester-{tag}"))
        .bind(format!("tester-{tag}@example.com"))
        .bind(shop_a)
        .fetch_one(&pool)
        .await
        .unwrap();

        let product_id: Uuid = sqlx::query_scalar(
            "INSERT INTO products (code, name, shop_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(format!("SKU-{tag}"))
        .bind("Test Product")
        .bind(shop_a)
        .fetch_one(&pool)
        .await
        .unwrap();

        Self {
            transfers: StockTransferCoordinator::new(pool.clone()),
            pool,
            user_id,
            product_id,
            shop_a,
            shop_b,
        }
    }

    async fn seed(&self, shop_id: Uuid, quantity: i64) {
        let mut conn = self.pool.acquire().await.unwrap();
        ledger::adjust(&mut conn, self.product_id, shop_id, quantity)
            .await
            .unwrap();
    }

    async fn quantity(&self, shop_id: Uuid) -> i64 {
        ledger::get(&self.pool, self.product_id, shop_id)
            .await
            .unwrap()
    }

    fn request(&self, from: Option<Uuid>, quantity: i64) -> CreateTransferRequest {
        CreateTransferRequest {
            from_shop_id: from,
            to_shop_id: self.shop_b,
            product_id: self.product_id,
            quantity,
            remarks: None,
        }
    }
}

#[tokio::test]
#[ignore]
async fn transfer_moves_stock_at_creation() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let transfer = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap();

    assert_eq!(transfer.transfer.status, TransferStatus::Pending);
    assert_eq!(fx.quantity(fx.shop_a).await, 30);
    assert_eq!(fx.quantity(fx.shop_b).await, 20);

    let history = fx.transfers.history(transfer.transfer.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TransferStatus::Pending);
}

#[tokio::test]
#[ignore]
async fn insufficient_stock_leaves_everything_unchanged() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 5).await;

    let err = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 10), fx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));

    assert_eq!(fx.quantity(fx.shop_a).await, 5);
    assert_eq!(fx.quantity(fx.shop_b).await, 0);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM stock_transfers WHERE product_id = $1")
            .bind(fx.product_id)
            .fetch_one(&fx.pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn cancel_restores_both_ledgers() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let transfer = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap();

    let cancelled = fx
        .transfers
        .update_status(transfer.transfer.id, TransferStatus::Cancelled, fx.user_id, None)
        .await
        .unwrap();

    assert_eq!(cancelled.transfer.status, TransferStatus::Cancelled);
    assert_eq!(fx.quantity(fx.shop_a).await, 50);
    assert_eq!(fx.quantity(fx.shop_b).await, 0);

    let history = fx.transfers.history(transfer.transfer.id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
#[ignore]
async fn reject_restores_ledgers_and_records_reason() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let transfer = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap();

    let rejected = fx
        .transfers
        .update_status(
            transfer.transfer.id,
            TransferStatus::Rejected,
            fx.user_id,
            Some("wrong shop"),
        )
        .await
        .unwrap();

    assert_eq!(rejected.transfer.status, TransferStatus::Rejected);
    assert_eq!(rejected.transfer.rejection_reason.as_deref(), Some("wrong shop"));
    assert!(rejected.transfer.rejected_at.is_some());
    assert_eq!(fx.quantity(fx.shop_a).await, 50);
    assert_eq!(fx.quantity(fx.shop_b).await, 0);
}

#[tokio::test]
#[ignore]
async fn full_lifecycle_keeps_moved_stock() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let id = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap()
        .transfer
        .id;

    for status in [
        TransferStatus::Approved,
        TransferStatus::InTransit,
        TransferStatus::Completed,
    ] {
        let updated = fx
            .transfers
            .update_status(id, status, fx.user_id, None)
            .await
            .unwrap();
        assert_eq!(updated.transfer.status, status);
    }

    // The movement happened at creation; the lifecycle only confirms it.
    assert_eq!(fx.quantity(fx.shop_a).await, 30);
    assert_eq!(fx.quantity(fx.shop_b).await, 20);

    // Completed is terminal.
    let err = fx
        .transfers
        .update_status(id, TransferStatus::Cancelled, fx.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));

    let history = fx.transfers.history(id).await.unwrap();
    assert_eq!(history.len(), 4);
}

#[tokio::test]
#[ignore]
async fn illegal_transition_changes_nothing() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let transfer = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap();

    let err = fx
        .transfers
        .update_status(transfer.transfer.id, TransferStatus::Completed, fx.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            from: TransferStatus::Pending,
            to: TransferStatus::Completed,
        }
    ));

    let current = fx.transfers.get(transfer.transfer.id).await.unwrap();
    assert_eq!(current.transfer.status, TransferStatus::Pending);
    assert_eq!(fx.quantity(fx.shop_a).await, 30);
    assert_eq!(fx.quantity(fx.shop_b).await, 20);
}

#[tokio::test]
#[ignore]
async fn concurrent_transfers_never_overdraw_the_source() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 30).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let transfers = fx.transfers.clone();
        let req = fx.request(Some(fx.shop_a), 5);
        let actor = fx.user_id;
        tasks.push(tokio::spawn(
            async move { transfers.create(&req, actor).await },
        ));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(Error::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 6);
    assert_eq!(fx.quantity(fx.shop_a).await, 0);
    assert_eq!(fx.quantity(fx.shop_b).await, 30);
}

#[tokio::test]
#[ignore]
async fn quantity_update_applies_the_difference() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let id = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap()
        .transfer
        .id;

    let updated = fx.transfers.update_quantity(id, 5, fx.user_id).await.unwrap();
    assert_eq!(updated.transfer.quantity, 5);
    assert_eq!(fx.quantity(fx.shop_a).await, 45);
    assert_eq!(fx.quantity(fx.shop_b).await, 5);

    // Only pending transfers can be edited.
    fx.transfers
        .update_status(id, TransferStatus::Approved, fx.user_id, None)
        .await
        .unwrap();
    let err = fx.transfers.update_quantity(id, 10, fx.user_id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransfer(_)));
}

#[tokio::test]
#[ignore]
async fn central_source_credits_without_a_debit() {
    let fx = Fixture::new().await;

    let transfer = fx
        .transfers
        .create(&fx.request(None, 15), fx.user_id)
        .await
        .unwrap();

    assert!(transfer.transfer.from_shop_id.is_none());
    assert!(transfer.from_shop.is_none());
    assert_eq!(fx.quantity(fx.shop_b).await, 15);

    fx.transfers
        .update_status(transfer.transfer.id, TransferStatus::Cancelled, fx.user_id, None)
        .await
        .unwrap();
    assert_eq!(fx.quantity(fx.shop_b).await, 0);
}

#[tokio::test]
#[ignore]
async fn shop_filter_matches_either_endpoint() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    // One transfer out of shop A, one central intake into shop B
    fx.transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap();
    fx.transfers
        .create(&fx.request(None, 15), fx.user_id)
        .await
        .unwrap();

    let pagination = Pagination {
        page: None,
        page_size: None,
    };
    let filter = |shop_id| TransferFilter {
        product_id: Some(fx.product_id),
        shop_id: Some(shop_id),
        ..TransferFilter::default()
    };

    let from_a = fx.transfers.list(&filter(fx.shop_a), &pagination).await.unwrap();
    assert_eq!(from_a.meta.total, 1);
    assert_eq!(from_a.data[0].transfer.from_shop_id, Some(fx.shop_a));

    let touching_b = fx.transfers.list(&filter(fx.shop_b), &pagination).await.unwrap();
    assert_eq!(touching_b.meta.total, 2);
}

#[tokio::test]
#[ignore]
async fn delete_reverses_live_transfers_only() {
    let fx = Fixture::new().await;
    fx.seed(fx.shop_a, 50).await;

    let pending = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 20), fx.user_id)
        .await
        .unwrap()
        .transfer
        .id;
    fx.transfers.delete(pending).await.unwrap();
    assert_eq!(fx.quantity(fx.shop_a).await, 50);
    assert_eq!(fx.quantity(fx.shop_b).await, 0);
    assert!(matches!(
        fx.transfers.get(pending).await.unwrap_err(),
        Error::NotFound(_)
    ));

    // A completed transfer is part of the books and cannot be deleted.
    let completed = fx
        .transfers
        .create(&fx.request(Some(fx.shop_a), 10), fx.user_id)
        .await
        .unwrap()
        .transfer
        .id;
    for status in [
        TransferStatus::Approved,
        TransferStatus::InTransit,
        TransferStatus::Completed,
    ] {
        fx.transfers
            .update_status(completed, status, fx.user_id, None)
            .await
            .unwrap();
    }
    let err = fx.transfers.delete(completed).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransfer(_)));
}
