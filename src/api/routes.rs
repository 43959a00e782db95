//! API route configuration.

use crate::api::handlers::{
    claim_link_handler, create_guest_link_handler, create_link_handler, delete_link_handler,
    get_link_handler, list_links_handler, stats_handler, update_link_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes that require Bearer token authentication.
///
/// # Endpoints
///
/// - `GET    /links`          - List links (paginated)
/// - `POST   /links`          - Create a link
/// - `POST   /links/claim`    - Claim a guest link
/// - `GET    /links/{code}`   - Fetch a link
/// - `PATCH  /links/{code}`   - Partially update a link
/// - `DELETE /links/{code}`   - Soft-delete a link
/// - `GET    /stats/{code}`   - Click analytics of a link
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/links", get(list_links_handler).post(create_link_handler))
        .route("/links/claim", post(claim_link_handler))
        .route(
            "/links/{code}",
            get(get_link_handler)
                .patch(update_link_handler)
                .delete(delete_link_handler),
        )
        .route("/stats/{code}", get(stats_handler))
}

/// API routes open to anonymous callers.
///
/// - `POST /guest/links` - Create a guest link with a claim token
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/guest/links", post(create_guest_link_handler))
}
