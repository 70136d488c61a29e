//! Card Ledger - Main Application Entry Point
//!
//! This is a REST API server for bank cards and card-to-card transfers. Users manage and spend from their own cards; administrators issue cards, override statuses and inspect the whole ledger.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, row locks for transfers)
//! - **Authentication**: API key with SHA-256 hashing, user and admin roles
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{access, cards, health, transfers},
    state::AppState,
    store::PgLedger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(
        port = config.server_port,
        max_transfer_amount = config.max_transfer_amount,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState::new(
        pool.clone(),
        Arc::new(PgLedger::new(pool)),
        config.transfer_policy(),
    );

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes, with API key authentication on everything but `/health`.
fn build_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Own cards
        .route("/api/v1/cards/my", get(cards::list_my_cards))
        .route("/api/v1/cards/my/expired", get(cards::list_my_expired_cards))
        .route("/api/v1/cards/my/balance", get(cards::get_my_balance))
        .route("/api/v1/cards/my/{id}", get(cards::get_my_card))
        .route("/api/v1/cards/my/{id}/block", patch(cards::block_my_card))
        // Card administration
        .route(
            "/api/v1/cards",
            post(cards::create_card).get(cards::list_all_cards),
        )
        .route(
            "/api/v1/cards/{id}",
            get(cards::get_card).delete(cards::delete_card),
        )
        .route("/api/v1/cards/user/{user_id}", get(cards::list_user_cards))
        .route("/api/v1/cards/{id}/status", patch(cards::update_card_status))
        // Own transfers
        .route(
            "/api/v1/transfers",
            post(transfers::create_transfer).get(transfers::list_all_transfers),
        )
        .route("/api/v1/transfers/my", get(transfers::list_my_transfers))
        .route("/api/v1/transfers/my/outgoing", get(transfers::list_my_outgoing))
        .route("/api/v1/transfers/my/incoming", get(transfers::list_my_incoming))
        .route("/api/v1/transfers/my/{id}", get(transfers::get_my_transfer))
        .route(
            "/api/v1/transfers/my/statistics/outgoing",
            get(transfers::my_outgoing_total),
        )
        // Transfer administration
        .route(
            "/api/v1/transfers/status/{status}",
            get(transfers::list_by_status),
        )
        .route("/api/v1/transfers/period", get(transfers::list_by_period))
        .route(
            "/api/v1/transfers/{id}/status",
            patch(transfers::update_transfer_status),
        )
        .route(
            "/api/v1/transfers/{id}",
            delete(transfers::cancel_transfer),
        )
        // Access checks
        .route("/api/v1/access/cards/{id}", get(access::card_access))
        .route("/api/v1/access/transfers/{id}", get(access::transfer_access))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(health::health_check))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
