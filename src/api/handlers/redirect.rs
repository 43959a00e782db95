//! Handlers for the public short-link endpoint.

use axum::{
    Json,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;
use std::net::SocketAddr;

use crate::api::dto::redirect::{LINK_PASSWORD_HEADER, PasswordSubmission, RedirectQuery};
use crate::domain::redirect::{Outcome, RequestContext};
use crate::error::{AppError, error_response};
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Resolves a short code.
///
/// # Endpoint
///
/// `GET /r/{code}`
///
/// A password may be supplied in the `X-Link-Password` header. UTM
/// parameters in the query string are recorded with the click; repeated
/// keys keep their first value and never fail the request.
///
/// # Responses
///
/// - `307` with `Location` on success
/// - `404 not_found` for unknown or deleted codes
/// - `410 link_expired` / `410 click_limit_reached`
/// - `401 password_required` when the password is missing or wrong
/// - `503` with `Retry-After` when the link store does not answer
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let password = header_str(&headers, LINK_PASSWORD_HEADER).map(str::to_string);
    let ctx = request_context(&state, &headers, addr, query, password);

    let outcome = state.redirect_service.resolve(&code, ctx).await?;
    Ok(outcome_response(outcome))
}

/// Retries a password-protected link with a password from the body.
///
/// # Endpoint
///
/// `POST /r/{code}` with `{"password": "..."}`
///
/// Responds exactly like [`redirect_handler`].
pub async fn redirect_with_password_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<PasswordSubmission>,
) -> Result<Response, AppError> {
    let ctx = request_context(&state, &headers, addr, query, Some(body.password));

    let outcome = state.redirect_service.resolve(&code, ctx).await?;
    Ok(outcome_response(outcome))
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn request_context(
    state: &AppState,
    headers: &HeaderMap,
    peer: SocketAddr,
    query: Vec<(String, String)>,
    password: Option<String>,
) -> RequestContext {
    let ip = client_ip(headers, peer, state.behind_proxy);

    let mut ctx = RequestContext::at(Utc::now())
        .with_user_agent(header_str(headers, header::USER_AGENT).unwrap_or_default())
        .with_referrer(header_str(headers, header::REFERER).unwrap_or_default())
        .with_ip(ip.to_string())
        .with_utm(RedirectQuery::from_pairs(query).into());

    if let Some(password) = password {
        ctx = ctx.with_password(password);
    }

    ctx
}

/// Maps a resolver outcome to its HTTP response.
pub fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Redirect { url, .. } => Redirect::temporary(&url).into_response(),
        Outcome::NotFound => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            "Short link not found",
            json!({}),
        ),
        Outcome::Expired => error_response(
            StatusCode::GONE,
            "link_expired",
            "This link is no longer active",
            json!({}),
        ),
        Outcome::LimitReached => error_response(
            StatusCode::GONE,
            "click_limit_reached",
            "This link has reached its click limit",
            json!({}),
        ),
        Outcome::PasswordRequired => error_response(
            StatusCode::UNAUTHORIZED,
            "password_required",
            "This link is password protected",
            json!({
                "header": "X-Link-Password",
                "method": "POST",
                "body": { "password": "string" },
            }),
        ),
    }
}
