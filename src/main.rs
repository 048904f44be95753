use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockrec_backend::{
    AppState,
    handlers::{backtest, recommendations},
    jobs::price_update_sync::start_price_update_job,
    services::market_data::MarketDataService,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stockrec_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://data/stockrec.db?mode=rwc".to_string());
    if database_url.starts_with("sqlite:") {
        std::fs::create_dir_all("data").ok();
    }
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(db, MarketDataService::from_env());

    // Periodic price updates + auto-close sweeps
    start_price_update_job(state.clone()).await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/", get(backtest::health_check))
        .route(
            "/api/recommendations",
            post(recommendations::ingest_recommendations),
        )
        .route("/api/backtest/records", get(backtest::get_records))
        .route("/api/backtest/summary", get(backtest::get_summary))
        .route("/api/backtest/performance", get(backtest::get_performance))
        .route("/api/backtest/close/{id}", post(backtest::close_position))
        .route(
            "/api/backtest/stop-config",
            get(backtest::get_stop_config).post(backtest::set_stop_config),
        )
        .route(
            "/api/backtest/check-auto-close",
            post(backtest::check_auto_close),
        )
        .route("/api/backtest/update-prices", post(backtest::update_prices))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
