//! Handler for per-link analytics.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;

use crate::api::dto::pagination::{PaginationMeta, StatsQueryParams};
use crate::api::dto::stats::{ClickInfo, StatsResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Returns click analytics for one link.
///
/// # Endpoint
///
/// `GET /api/stats/{code}`
///
/// # Query Parameters
///
/// - `from`, `to` (optional): RFC 3339 bounds, inclusive
/// - `page` (default 1), `page_size` (default 25, max 100): page of `recent`
///
/// Breakdowns always cover the whole range; `truncated` is set when the
/// range holds more clicks than a single report aggregates.
///
/// # Errors
///
/// - `404` if the code does not name an active link
/// - `400` if the range is inverted or pagination is out of bounds
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<StatsQueryParams>,
) -> Result<Json<StatsResponse>, AppError> {
    let (page, page_size) = params
        .pagination
        .resolve()
        .map_err(|e| AppError::bad_request(e, json!({})))?;
    let (offset, limit) = params
        .pagination
        .offset_limit()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let report = state
        .stats_service
        .link_stats(
            &code,
            params.date_filter.from,
            params.date_filter.to,
            offset,
            limit,
        )
        .await?;

    Ok(Json(StatsResponse {
        code: report.link.code,
        original_url: report.link.original_url,
        created_at: report.link.created_at,
        total_clicks: report.total_clicks,
        clicks_in_range: report.clicks_in_range,
        breakdowns: report.breakdowns,
        truncated: report.truncated,
        pagination: PaginationMeta::new(page, page_size, report.clicks_in_range),
        recent: report.recent.into_iter().map(ClickInfo::from).collect(),
    }))
}
