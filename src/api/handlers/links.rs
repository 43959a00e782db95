//! Handlers for link management endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use crate::api::dto::guest::{ClaimLinkRequest, GuestLinkResponse};
use crate::api::dto::link::{CreateLinkRequest, LinkListResponse, LinkResponse};
use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::update_link::UpdateLinkRequest;
use crate::domain::entities::Link;
use crate::domain::repositories::ApiToken;
use crate::error::AppError;
use crate::state::AppState;

/// Query parameters of `GET /api/links`.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct ListLinksQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    /// Only links owned by the calling token.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub mine: Option<bool>,
}

fn to_response(state: &AppState, headers: &HeaderMap, link: Link) -> LinkResponse {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let short_url = state.short_url(host, &link.code);
    LinkResponse::from_link(link, short_url)
}

/// Creates a link owned by the calling token.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// {
///   "original_url": "https://example.com/landing",
///   "custom_code": "spring-sale",
///   "smart_redirects": { "ios": "https://apps.apple.com/app/id1" },
///   "geo_redirects": { "DE": "https://example.de" },
///   "ab_test": { "enabled": true, "variants": [
///     { "id": "a", "url": "https://example.com/a", "weight": 50 },
///     { "id": "b", "url": "https://example.com/b", "weight": 50 }
///   ]},
///   "expiration_date": "2026-12-31T23:59:59Z",
///   "max_clicks": 1000,
///   "password": "hunter2"
/// }
/// ```
///
/// # Errors
///
/// - `400` if a URL, code or rule is invalid
/// - `409` if the custom code is taken
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(token): Extension<ApiToken>,
    headers: HeaderMap,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .create_link(payload.into(), Some(token.id))
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(&state, &headers, link))))
}

/// Lists active links, newest first.
///
/// # Endpoint
///
/// `GET /api/links?page=1&page_size=25&mine=true`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(token): Extension<ApiToken>,
    headers: HeaderMap,
    Query(query): Query<ListLinksQuery>,
) -> Result<Json<LinkListResponse>, AppError> {
    let (page, page_size) = query
        .pagination
        .resolve()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let owner_id = query.mine.unwrap_or(false).then_some(token.id);
    let (page, page_size) = (i64::from(page), i64::from(page_size));

    let links = state
        .link_service
        .list_links(page, page_size, owner_id)
        .await?;
    let total = state.link_service.count_links(owner_id).await?;

    Ok(Json(LinkListResponse {
        page,
        page_size,
        total,
        items: links
            .into_iter()
            .map(|link| to_response(&state, &headers, link))
            .collect(),
    }))
}

/// Returns one active link.
///
/// # Endpoint
///
/// `GET /api/links/{code}`
pub async fn get_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.get_link(&code).await?;
    Ok(Json(to_response(&state, &headers, link)))
}

/// Partially updates a link.
///
/// # Endpoint
///
/// `PATCH /api/links/{code}`
///
/// Absent fields are kept, `null` clears a field, `"password": ""` removes
/// the password. The cached copy of the link is invalidated.
pub async fn update_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state.link_service.update_link(&code, payload.into()).await?;
    Ok(Json(to_response(&state, &headers, link)))
}

/// Soft-deletes a link.
///
/// # Endpoint
///
/// `DELETE /api/links/{code}`
///
/// Returns `204 No Content`; the code answers `404` afterwards.
pub async fn delete_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete_link(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates an anonymous guest link.
///
/// # Endpoint
///
/// `POST /api/guest/links` (no authentication)
///
/// The response carries a one-time `claim_token`. The link stops resolving
/// after `GUEST_LINK_TTL_HOURS` unless it is claimed.
pub async fn create_guest_link_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<GuestLinkResponse>), AppError> {
    payload.validate()?;

    let guest = state
        .link_service
        .create_guest_link(payload.into(), Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GuestLinkResponse {
            link: to_response(&state, &headers, guest.link),
            claim_token: guest.claim_token,
        }),
    ))
}

/// Claims a guest link for the calling token.
///
/// # Endpoint
///
/// `POST /api/links/claim` with `{"claim_token": "..."}`
///
/// # Errors
///
/// Returns `404` if the token is unknown, already used or its link expired.
pub async fn claim_link_handler(
    State(state): State<AppState>,
    Extension(token): Extension<ApiToken>,
    headers: HeaderMap,
    Json(payload): Json<ClaimLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .claim_link(&payload.claim_token, token.id, Utc::now())
        .await?;

    Ok(Json(to_response(&state, &headers, link)))
}
