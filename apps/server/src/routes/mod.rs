//! HTTP route composition.
//!
//! Each resource contributes its own `Router` which gets merged under
//! the `/api` prefix, mirroring how the SPA addresses the backend.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod products;
pub mod transactions;
pub mod vouchers;

/// Build a router with all routes registered (no middleware, no state).
pub fn build_router() -> Router<AppState> {
    let api = Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(vouchers::router())
        .merge(transactions::router());

    Router::new().nest("/api", api)
}

/// Build a fully configured application with middleware and state.
///
/// Used by both the HTTP server and the router-level tests.
pub fn build_app(state: AppState) -> Router {
    build_router()
        // CORS - the SPA dev server runs on a different origin
        .layer(CorsLayer::permissive())
        // Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
