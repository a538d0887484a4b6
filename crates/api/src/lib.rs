//! `api` crate — HTTP surface of the leave approval service.
//!
//! Exposes:
//!   POST   /approve-leave
//!   POST   /evaluate/{workflow}/{rule_set}
//!   POST   /admin/reload
//!   GET    /health

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use error::ApiError;
pub use handlers::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::admin::health))
        .route("/approve-leave", post(handlers::leave_requests::approve))
        .route("/evaluate/:workflow/:rule_set", post(handlers::rules::evaluate))
        .route("/admin/reload", post(handlers::admin::reload))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
