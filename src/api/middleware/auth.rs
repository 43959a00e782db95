//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::{error::AppError, state::AppState};

/// Authenticates requests with `Authorization: Bearer <token>`.
///
/// On success the matching [`crate::domain::repositories::ApiToken`] is
/// inserted into the request extensions, so handlers can take
/// `Extension<ApiToken>` to learn the caller.
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` when the header
/// is missing or malformed, or the token is unknown or revoked.
///
/// # Example
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/links", post(create_link_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                serde_json::json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let api_token = st.auth_service.authenticate(&token).await?;
    tracing::debug!(token_id = api_token.id, "Request authenticated");
    parts.extensions.insert(api_token);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
