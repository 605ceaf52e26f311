use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use settlement_rs::{
    config::Config,
    db::init_pool,
    health::health,
    routes::credits::{
        associate_orders, create_credit, get_credit, recompute_credit, remove_order,
    },
    routes::deliveries::{
        cancel_delivery, confirm_delivery, create_delivery, delete_delivery, get_delivery,
        list_deliveries, list_settleable, verify_delivery,
    },
    routes::expenses::{
        approve_expense, create_expense, delete_expense, expense_total, list_expenses,
        list_unattached, reject_expense, update_expense,
    },
    routes::payments::{create_payment, delete_payment, list_payments, update_payment},
    routes::refunds::{
        create_purchase_refund, create_sale_refund, delete_purchase_refund, delete_sale_refund,
        get_purchase_refund, get_sale_refund, list_purchase_refunds, list_sale_refunds,
        process_purchase_refund, process_sale_refund, void_purchase_refund, void_sale_refund,
    },
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting settlement service...");

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}",
        config.host,
        config.port
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Build the application router
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/credits", post(create_credit))
        .route("/api/credits/{credit_id}", get(get_credit))
        .route("/api/credits/{credit_id}/recompute", post(recompute_credit))
        .route("/api/credits/{credit_id}/orders", post(associate_orders))
        .route(
            "/api/credits/{credit_id}/orders/{order_id}",
            delete(remove_order),
        )
        .route(
            "/api/credits/{credit_id}/payments",
            get(list_payments).post(create_payment),
        )
        .route(
            "/api/credits/{credit_id}/payments/{payment_id}",
            put(update_payment).delete(delete_payment),
        )
        .route("/api/deliveries/settleable", get(list_settleable))
        .route(
            "/api/deliveries",
            get(list_deliveries).post(create_delivery),
        )
        .route(
            "/api/deliveries/{delivery_id}",
            get(get_delivery).delete(delete_delivery),
        )
        .route(
            "/api/deliveries/{delivery_id}/confirm",
            post(confirm_delivery),
        )
        .route(
            "/api/deliveries/{delivery_id}/cancel",
            post(cancel_delivery),
        )
        .route(
            "/api/deliveries/{delivery_id}/verify",
            post(verify_delivery),
        )
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/unattached", get(list_unattached))
        .route("/api/expenses/total", get(expense_total))
        .route(
            "/api/expenses/{expense_id}",
            put(update_expense).delete(delete_expense),
        )
        .route("/api/expenses/{expense_id}/approve", post(approve_expense))
        .route("/api/expenses/{expense_id}/reject", post(reject_expense))
        .route(
            "/api/refunds/sales",
            get(list_sale_refunds).post(create_sale_refund),
        )
        .route(
            "/api/refunds/sales/{refund_id}",
            get(get_sale_refund).delete(delete_sale_refund),
        )
        .route(
            "/api/refunds/sales/{refund_id}/process",
            post(process_sale_refund),
        )
        .route("/api/refunds/sales/{refund_id}/void", post(void_sale_refund))
        .route(
            "/api/refunds/purchases",
            get(list_purchase_refunds).post(create_purchase_refund),
        )
        .route(
            "/api/refunds/purchases/{refund_id}",
            get(get_purchase_refund).delete(delete_purchase_refund),
        )
        .route(
            "/api/refunds/purchases/{refund_id}/process",
            post(process_purchase_refund),
        )
        .route(
            "/api/refunds/purchases/{refund_id}/void",
            post(void_purchase_refund),
        )
        .with_state(Arc::new(pool.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Settlement service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
