use dotenvy::dotenv;
use log::info;

use stockroom::config::Config;
use stockroom::database::create_database_pool;
use stockroom::{create_router, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env().expect("invalid configuration");

    let db = create_database_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    info!("database connection established");

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(db, config));

    info!("stockroom listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
