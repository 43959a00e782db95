//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /r/{code}`          - Resolve a short link (public)
//! - `POST /r/{code}`          - Resolve with a password in the body (public)
//! - `GET  /health`            - Database, cache and click queue checks (public)
//! - `POST /api/guest/links`   - Anonymous guest links (public)
//! - `/api/*`                  - Link management and analytics (Bearer token)
//!
//! # Middleware
//!
//! - **Tracing** - one span per request
//! - **Rate limiting** - per client IP, stricter on authenticated routes
//! - **Authentication** - Bearer token on `/api/*` except guest creation
//! - **Path normalization** - trailing slashes are trimmed

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler, redirect_with_password_handler};
use crate::api::middleware::{auth, rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the application router.
///
/// The client IP used for rate limiting follows `state.behind_proxy`.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let behind_proxy = state.behind_proxy;

    let protected = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer))
        .layer(rate_limit::secure_layer(behind_proxy));

    let api_public = api::routes::public_routes().layer(rate_limit::layer(behind_proxy));

    let public = Router::new()
        .route(
            "/r/{code}",
            get(redirect_handler).post(redirect_with_password_handler),
        )
        .route("/health", get(health_handler))
        .layer(rate_limit::layer(behind_proxy));

    let router = Router::new()
        .merge(public)
        .nest("/api", protected.merge(api_public))
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
