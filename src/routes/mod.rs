//! API route handlers.

pub mod admin;

use crate::auth::middleware::AppState;
use crate::middleware::security_headers;
use axum::{routing::get, routing::post, Router};
use tower_http::cors::CorsLayer;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/me", get(admin::me))
        .route("/api/admin/session", get(admin::session_status))
}

/// API router with the cross-cutting layers applied and state attached.
pub fn app(state: AppState) -> Router {
    // Explicit CORS: deny all cross-origin requests (single-origin deployment).
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    api_router()
        .layer(CorsLayer::new())
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
