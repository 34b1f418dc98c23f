//! HTTP adapters - REST API over the application handlers.
//!
//! - `storefront` - customer browsing, customization, checkout and payment
//! - `admin` - catalog, quota ledger, order and payment administration
//! - `webhooks` - signed gateway callbacks
//!
//! Identity comes from upstream headers; see [`middleware`].

pub mod admin;
mod dto;
mod error;
pub mod middleware;
mod state;
pub mod storefront;
pub mod webhooks;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use admin::admin_routes;
use middleware::identity_middleware;
use storefront::storefront_routes;
use webhooks::webhook_routes;

/// Complete application router.
///
/// ```text
/// GET  /health
///      /api/...           storefront
///      /api/admin/...     admin (X-User-Role: admin)
///      /api/webhooks/...  gateway callbacks
/// ```
pub fn router(state: AppState) -> Router {
    let api = storefront_routes()
        .nest("/admin", admin_routes())
        .nest("/webhooks", webhook_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(axum::middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
