//! # Route Configuration
//!
//! Three surfaces: `/payments` for buyers, `/webhooks` for gateway
//! callbacks (no auth beyond the signature itself), and `/admin`
//! behind the shared-token middleware.

use crate::auth::require_admin_token;
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let payment_routes = Router::new()
        .route("/create-order", post(handlers::create_order))
        .route("/process-transaction", post(handlers::process_transaction));

    let webhook_routes = Router::new().route(
        "/payment-status/{gateway_name}",
        post(handlers::payment_status_webhook),
    );

    let admin_routes = Router::new()
        .route("/payments/verify", post(handlers::verify_payment))
        .route("/payments/pending", get(handlers::list_pending_payments))
        .route("/payments/all", get(handlers::list_all_payments))
        .route("/payments/{payment_id}", get(handlers::get_payment))
        .route(
            "/gateways",
            get(handlers::list_gateways).post(handlers::upsert_gateway),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/payments", payment_routes)
        .nest("/webhooks", webhook_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
