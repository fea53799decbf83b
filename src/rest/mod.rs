// rest/mod.rs — Public REST API server.
//
// Axum HTTP server bridging the dashboard frontend to the engine,
// notifier, and payment webhook handlers.
//
// Endpoints:
//   GET  /health
//   POST /api/v1/query
//   POST /api/v1/auto-terminate
//   POST /api/v1/notify
//   POST /webhooks/stripe
//   POST /webhooks/razorpay

pub mod error;
pub mod routes;
pub mod webhooks;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/health", get(routes::health::health))
        // OPTIC — natural-language cost queries
        .route("/api/v1/query", post(routes::query::natural_language_query))
        // ABACUS — autonomous termination evaluation
        .route("/api/v1/auto-terminate", post(routes::terminate::auto_terminate))
        // Notifications
        .route("/api/v1/notify", post(routes::notify::send_notification))
        // Payment webhooks
        .route("/webhooks/stripe", post(webhooks::stripe::stripe_webhook))
        .route("/webhooks/razorpay", post(webhooks::razorpay::razorpay_webhook))
        // The dashboard frontend is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
