//! DTOs for per-link analytics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::pagination::PaginationMeta;
use crate::application::services::stats_service::Breakdowns;
use crate::domain::entities::{Click, UtmParams};

/// Response of `GET /api/stats/{code}`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    /// Stored click counter of the link.
    pub total_clicks: i64,
    /// Recorded click events inside `from`/`to`.
    pub clicks_in_range: i64,
    pub breakdowns: Breakdowns,
    /// `true` when breakdowns were computed over a capped sample.
    pub truncated: bool,
    pub pagination: PaginationMeta,
    pub recent: Vec<ClickInfo>,
}

/// One recorded click. The visitor IP is only ever exposed as a hash.
#[derive(Debug, Serialize)]
pub struct ClickInfo {
    pub clicked_at: DateTime<Utc>,
    pub device: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,

    #[serde(skip_serializing_if = "UtmParams::is_empty")]
    pub utm: UtmParams,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
}

impl From<Click> for ClickInfo {
    fn from(c: Click) -> Self {
        Self {
            clicked_at: c.clicked_at,
            device: c.device,
            os: c.os,
            browser: c.browser,
            country_code: c.country_code,
            city: c.city,
            referrer: c.referrer,
            variant_id: c.variant_id,
            utm: c.utm,
            ip_hash: c.ip_hash,
        }
    }
}
