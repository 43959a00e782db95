//! DTOs for link creation and link responses.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::link_service::CreateLink;
use crate::domain::entities::{AbTestConfig, GeoRedirects, Link, SmartRedirects};

/// Characters allowed in a custom code. Edge and reserved-word rules are
/// checked by the service.
static CUSTOM_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Request body for `POST /api/links`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Default destination (must be http/https).
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub original_url: String,

    /// Optional custom short code.
    #[validate(
        length(min = 4, max = 32),
        regex(path = *CUSTOM_CODE_REGEX, message = "Only letters, digits, '-' and '_' are allowed")
    )]
    pub custom_code: Option<String>,

    pub smart_redirects: Option<SmartRedirects>,

    /// Country code (ISO 3166-1 alpha-2) to destination URL.
    pub geo_redirects: Option<GeoRedirects>,

    pub ab_test: Option<AbTestConfig>,

    pub start_date: Option<DateTime<Utc>>,

    /// After this instant the link answers `410 Gone`.
    pub expiration_date: Option<DateTime<Utc>>,

    #[validate(range(min = 1, message = "max_clicks must be at least 1"))]
    pub max_clicks: Option<i64>,

    #[validate(length(max = 128))]
    pub password: Option<String>,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(req: CreateLinkRequest) -> Self {
        CreateLink {
            original_url: req.original_url,
            custom_code: req.custom_code,
            smart_redirects: req.smart_redirects,
            geo_redirects: req.geo_redirects,
            ab_test: req.ab_test,
            start_date: req.start_date,
            expiration_date: req.expiration_date,
            max_clicks: req.max_clicks,
            password: req.password,
        }
    }
}

/// Public view of a link. Secrets (password hash, claim token hash) never
/// leave the service.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub short_url: String,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_redirects: Option<SmartRedirects>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_redirects: Option<GeoRedirects>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ab_test: Option<AbTestConfig>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password_protected: bool,
    pub clicks: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub is_guest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_link(link: Link, short_url: String) -> Self {
        Self {
            password_protected: link.is_password_protected(),
            code: link.code,
            short_url,
            original_url: link.original_url,
            smart_redirects: link.smart_redirects,
            geo_redirects: link.geo_redirects,
            ab_test: link.ab_test,
            start_date: link.start_date,
            expiration_date: link.expiration_date,
            max_clicks: link.max_clicks,
            clicks: link.clicks,
            last_clicked_at: link.last_clicked_at,
            is_guest: link.is_guest,
            expires_at: link.expires_at,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

/// Paginated link listing.
#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub items: Vec<LinkResponse>,
}
